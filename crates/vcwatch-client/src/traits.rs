//! Remote service seams consumed by the collector
//!
//! The collector only sees these traits; production wiring plugs in the real
//! API clients, tests plug in [`crate::sim::SimClient`].

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Category, EntityKind, InventoryObject, Mor, ObjectTags, PerfInterval, PerfSample, TagModel,
};

/// Creates scoped, recursive container views over inventory kinds
#[async_trait]
pub trait ViewManager: Send + Sync {
    /// Reference of the inventory root folder, the starting point for
    /// datacenter discovery
    fn root_folder(&self) -> Mor;

    /// Create a container view rooted at `root`, enumerating the given kinds
    ///
    /// # Errors
    /// Returns an error if the remote view manager rejects the request.
    async fn create_container_view(
        &self,
        root: &Mor,
        kinds: &[EntityKind],
        recursive: bool,
    ) -> Result<Box<dyn ContainerView>>;
}

/// A live server-side container view
///
/// Views hold server-side resources; callers must `destroy` every view they
/// create, on every exit path.
#[async_trait]
pub trait ContainerView: Send + Sync {
    /// Retrieve the named properties for all objects of the given kinds
    /// visible through this view
    ///
    /// # Errors
    /// Returns an error if the property retrieval fails.
    async fn retrieve(
        &self,
        kinds: &[EntityKind],
        properties: &[&str],
    ) -> Result<Vec<InventoryObject>>;

    /// Release the server-side view
    ///
    /// # Errors
    /// Returns an error if the remote destroy call fails; callers log and
    /// continue.
    async fn destroy(&self) -> Result<()>;
}

/// Tagging service: categories, tags, and batch attachment queries
#[async_trait]
pub trait TaggingService: Send + Sync {
    /// List all category identifiers and names
    ///
    /// # Errors
    /// Returns an error if the listing request fails.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// List all tag identifiers, names, and owning categories
    ///
    /// # Errors
    /// Returns an error if the listing request fails.
    async fn list_tags(&self) -> Result<Vec<TagModel>>;

    /// Batch query: tags attached to each of the given objects
    ///
    /// # Errors
    /// Returns an error if the batch query fails.
    async fn attached_tags_on_objects(&self, objects: &[Mor]) -> Result<Vec<ObjectTags>>;
}

/// Performance counter provider
///
/// Retrieval internals (counter id resolution, query batching) live behind
/// this seam; the collector only hands over refs, counter names, and an
/// interval.
#[async_trait]
pub trait PerfProvider: Send + Sync {
    /// Sample the named counters for the given objects at the given interval
    ///
    /// # Errors
    /// Returns an error if the query fails; callers log and continue without
    /// samples for the batch.
    async fn collect(
        &self,
        objects: &[Mor],
        counters: &[String],
        interval: PerfInterval,
    ) -> Result<Vec<PerfSample>>;
}
