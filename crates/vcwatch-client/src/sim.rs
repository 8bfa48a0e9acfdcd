//! In-memory inventory simulator
//!
//! Implements every remote seam over seeded in-memory data so the collector
//! and tag cache can be exercised without a live endpoint. Failure injection
//! covers the per-(datacenter, kind) view errors and tagging outages the
//! error taxonomy distinguishes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::traits::{ContainerView, PerfProvider, TaggingService, ViewManager};
use crate::types::{
    Category, ClusterRecord, DatacenterInfo, DatastoreRecord, EntityKind, HostRecord,
    InventoryObject, Mor, NetworkRecord, ObjectTags, PerfInterval, PerfSample, ResourcePoolRecord,
    TagModel, VmRecord,
};

/// One seeded datacenter and its child objects
#[derive(Debug, Clone)]
pub struct SimDatacenter {
    /// Datacenter descriptor
    pub info: DatacenterInfo,
    /// Seeded hosts
    pub hosts: Vec<HostRecord>,
    /// Seeded clusters
    pub clusters: Vec<ClusterRecord>,
    /// Seeded resource pools
    pub resource_pools: Vec<ResourcePoolRecord>,
    /// Seeded datastores
    pub datastores: Vec<DatastoreRecord>,
    /// Seeded networks
    pub networks: Vec<NetworkRecord>,
    /// Seeded virtual machines
    pub vms: Vec<VmRecord>,
}

impl SimDatacenter {
    /// Create an empty datacenter with the given reference value and name
    pub fn new(value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            info: DatacenterInfo {
                mor: Mor::new(EntityKind::Datacenter, value),
                name: name.into(),
            },
            hosts: Vec::new(),
            clusters: Vec::new(),
            resource_pools: Vec::new(),
            datastores: Vec::new(),
            networks: Vec::new(),
            vms: Vec::new(),
        }
    }

    fn objects_of_kind(&self, kind: EntityKind) -> Vec<InventoryObject> {
        match kind {
            EntityKind::Datacenter => vec![InventoryObject::Datacenter(self.info.clone())],
            EntityKind::HostSystem => self
                .hosts
                .iter()
                .cloned()
                .map(InventoryObject::Host)
                .collect(),
            EntityKind::ClusterComputeResource => self
                .clusters
                .iter()
                .cloned()
                .map(InventoryObject::Cluster)
                .collect(),
            EntityKind::ResourcePool => self
                .resource_pools
                .iter()
                .cloned()
                .map(InventoryObject::ResourcePool)
                .collect(),
            EntityKind::Datastore => self
                .datastores
                .iter()
                .cloned()
                .map(InventoryObject::Datastore)
                .collect(),
            EntityKind::Network => self
                .networks
                .iter()
                .cloned()
                .map(InventoryObject::Network)
                .collect(),
            EntityKind::VirtualMachine => self
                .vms
                .iter()
                .cloned()
                .map(InventoryObject::VirtualMachine)
                .collect(),
            EntityKind::Folder => Vec::new(),
        }
    }
}

/// Simulated remote endpoint
///
/// Seed it with [`SimDatacenter`]s, categories, tags, and attachments, then
/// hand it to the collector as `Arc<SimClient>` for each of the seams.
pub struct SimClient {
    datacenters: Vec<SimDatacenter>,
    categories: Vec<Category>,
    tags: Vec<TagModel>,
    attachments: HashMap<Mor, Vec<String>>,
    failing_views: HashSet<(Mor, EntityKind)>,
    failing_retrievals: HashSet<(Mor, EntityKind)>,
    tagging_down: bool,
    views_created: AtomicUsize,
    views_destroyed: Arc<AtomicUsize>,
}

impl SimClient {
    /// Create an empty simulator
    #[must_use]
    pub fn new() -> Self {
        Self {
            datacenters: Vec::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            attachments: HashMap::new(),
            failing_views: HashSet::new(),
            failing_retrievals: HashSet::new(),
            tagging_down: false,
            views_created: AtomicUsize::new(0),
            views_destroyed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Seed a datacenter
    #[must_use]
    pub fn with_datacenter(mut self, dc: SimDatacenter) -> Self {
        self.datacenters.push(dc);
        self
    }

    /// Seed a tag category
    #[must_use]
    pub fn with_category(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.categories.push(Category {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    /// Seed a tag in an existing category
    #[must_use]
    pub fn with_tag(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        category_id: impl Into<String>,
    ) -> Self {
        self.tags.push(TagModel {
            id: id.into(),
            name: name.into(),
            category_id: category_id.into(),
        });
        self
    }

    /// Attach a seeded tag to an object
    #[must_use]
    pub fn with_attachment(mut self, object: Mor, tag_id: impl Into<String>) -> Self {
        self.attachments.entry(object).or_default().push(tag_id.into());
        self
    }

    /// Make view creation fail for one (datacenter, kind) pair
    #[must_use]
    pub fn with_failing_view(mut self, datacenter: Mor, kind: EntityKind) -> Self {
        self.failing_views.insert((datacenter, kind));
        self
    }

    /// Make property retrieval fail for one (datacenter, kind) pair; view
    /// creation still succeeds
    #[must_use]
    pub fn with_failing_retrieval(mut self, datacenter: Mor, kind: EntityKind) -> Self {
        self.failing_retrievals.insert((datacenter, kind));
        self
    }

    /// Make every tagging call fail
    #[must_use]
    pub fn with_tagging_down(mut self) -> Self {
        self.tagging_down = true;
        self
    }

    /// Number of container views created so far
    #[must_use]
    pub fn views_created(&self) -> usize {
        self.views_created.load(Ordering::SeqCst)
    }

    /// Number of container views destroyed so far
    #[must_use]
    pub fn views_destroyed(&self) -> usize {
        self.views_destroyed.load(Ordering::SeqCst)
    }
}

impl Default for SimClient {
    fn default() -> Self {
        Self::new()
    }
}

/// A simulated container view over a snapshot of objects
struct SimView {
    objects: Vec<InventoryObject>,
    failing_kinds: HashSet<EntityKind>,
    destroyed: Arc<AtomicUsize>,
}

#[async_trait]
impl ContainerView for SimView {
    async fn retrieve(
        &self,
        kinds: &[EntityKind],
        _properties: &[&str],
    ) -> Result<Vec<InventoryObject>> {
        if let Some(kind) = kinds.iter().find(|k| self.failing_kinds.contains(k)) {
            return Err(ClientError::Retrieval(format!(
                "simulated retrieval failure for {kind}"
            )));
        }
        Ok(self
            .objects
            .iter()
            .filter(|o| kinds.contains(&o.kind()))
            .cloned()
            .collect())
    }

    async fn destroy(&self) -> Result<()> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ViewManager for SimClient {
    fn root_folder(&self) -> Mor {
        Mor::new(EntityKind::Folder, "group-d1")
    }

    async fn create_container_view(
        &self,
        root: &Mor,
        kinds: &[EntityKind],
        _recursive: bool,
    ) -> Result<Box<dyn ContainerView>> {
        for kind in kinds {
            if self.failing_views.contains(&(root.clone(), *kind)) {
                return Err(ClientError::ViewCreation(format!(
                    "simulated failure for {kind} view under {root}"
                )));
            }
        }

        let objects = if *root == self.root_folder() {
            // Root-scoped view sees every datacenter's objects.
            self.datacenters
                .iter()
                .flat_map(|dc| kinds.iter().flat_map(|k| dc.objects_of_kind(*k)))
                .collect()
        } else {
            let Some(dc) = self.datacenters.iter().find(|dc| dc.info.mor == *root) else {
                return Err(ClientError::ViewCreation(format!("unknown root {root}")));
            };
            kinds.iter().flat_map(|k| dc.objects_of_kind(*k)).collect()
        };

        let failing_kinds = self
            .failing_retrievals
            .iter()
            .filter(|(dc, _)| dc == root)
            .map(|(_, kind)| *kind)
            .collect();

        self.views_created.fetch_add(1, Ordering::SeqCst);
        debug!(root = %root, "simulated view created");

        Ok(Box::new(SimView {
            objects,
            failing_kinds,
            destroyed: Arc::clone(&self.views_destroyed),
        }))
    }
}

#[async_trait]
impl TaggingService for SimClient {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        if self.tagging_down {
            return Err(ClientError::Api {
                status: 503,
                message: "simulated tagging outage".to_string(),
            });
        }
        Ok(self.categories.clone())
    }

    async fn list_tags(&self) -> Result<Vec<TagModel>> {
        if self.tagging_down {
            return Err(ClientError::Api {
                status: 503,
                message: "simulated tagging outage".to_string(),
            });
        }
        Ok(self.tags.clone())
    }

    async fn attached_tags_on_objects(&self, objects: &[Mor]) -> Result<Vec<ObjectTags>> {
        if self.tagging_down {
            return Err(ClientError::Api {
                status: 503,
                message: "simulated tagging outage".to_string(),
            });
        }
        Ok(objects
            .iter()
            .filter_map(|mor| {
                self.attachments.get(mor).map(|ids| ObjectTags {
                    object: mor.clone(),
                    tag_ids: ids.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl PerfProvider for SimClient {
    async fn collect(
        &self,
        objects: &[Mor],
        counters: &[String],
        _interval: PerfInterval,
    ) -> Result<Vec<PerfSample>> {
        let now = Utc::now();
        Ok(objects
            .iter()
            .flat_map(|mor| {
                counters.iter().map(move |counter| PerfSample {
                    object: mor.clone(),
                    counter: counter.clone(),
                    instance: String::new(),
                    value: 42.0,
                    timestamp: now,
                })
            })
            .collect())
    }
}
