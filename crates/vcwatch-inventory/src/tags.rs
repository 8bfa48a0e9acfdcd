//! Per-cycle tag cache and filter
//!
//! Built fully (categories, tags, id lookup) before any entity is tested
//! against the filter. The per-object index is refreshed batch-by-batch as
//! the per-kind tasks retrieve objects, so it sits behind an `RwLock`; the
//! id lookup is only written during the build and stays plain.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use vcwatch_client::{Mor, TaggingService};

use crate::error::InventoryError;

/// A resolved user tag: category name plus tag name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    /// Owning category name
    pub category: String,
    /// Tag name
    pub name: String,
}

impl Tag {
    /// Create a tag value
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

/// Category/tag metadata and per-object assignments for one collection cycle
pub struct TagCache {
    service: Arc<dyn TaggingService>,
    tags_by_id: HashMap<String, Tag>,
    tags_by_object: RwLock<HashMap<Mor, Vec<Tag>>>,
    filter_tags: Vec<Tag>,
}

impl TagCache {
    /// Create an empty cache over the given tagging service
    pub fn new(service: Arc<dyn TaggingService>) -> Self {
        Self {
            service,
            tags_by_id: HashMap::new(),
            tags_by_object: RwLock::new(HashMap::new()),
            filter_tags: Vec::new(),
        }
    }

    /// Fetch all categories and tags and build the id lookup
    ///
    /// Failure is non-fatal to the cycle: the caller reports it and proceeds
    /// without tag enrichment or filtering.
    ///
    /// # Errors
    /// Returns an error if either listing call fails.
    pub async fn build_cache(&mut self) -> Result<(), InventoryError> {
        let categories = self.service.list_categories().await?;
        let category_names: HashMap<String, String> =
            categories.into_iter().map(|c| (c.id, c.name)).collect();

        let tags = self.service.list_tags().await?;
        let mut tags_by_id = HashMap::with_capacity(tags.len());
        for tag in tags {
            let category = category_names
                .get(&tag.category_id)
                .cloned()
                .unwrap_or_default();
            tags_by_id.insert(
                tag.id,
                Tag {
                    category,
                    name: tag.name,
                },
            );
        }

        debug!(tags = tags_by_id.len(), "tag cache built");

        self.tags_by_id = tags_by_id;
        Ok(())
    }

    /// Fetch attached tags for one retrieval batch and store the resolved
    /// lists per object reference
    ///
    /// Returns the number of objects that had tags attached. Callers treat
    /// failure as "no tags available for this batch" and proceed.
    ///
    /// # Errors
    /// Returns an error if the batch query fails.
    pub async fn fetch_tags_for_objects(&self, objects: &[Mor]) -> Result<usize, InventoryError> {
        if objects.is_empty() {
            return Ok(0);
        }

        let attached = self.service.attached_tags_on_objects(objects).await?;

        let mut resolved: HashMap<Mor, Vec<Tag>> = HashMap::with_capacity(attached.len());
        for entry in attached {
            let tags = entry
                .tag_ids
                .iter()
                .map(|id| self.tag_by_id(id))
                .collect::<Vec<_>>();
            resolved.insert(entry.object, tags);
        }

        let count = resolved.len();
        self.cache_tags(resolved).await;

        Ok(count)
    }

    /// Store resolved tag lists, overwriting prior entries for the same
    /// objects
    async fn cache_tags(&self, resolved: HashMap<Mor, Vec<Tag>>) {
        let mut index = self.tags_by_object.write().await;
        index.extend(resolved);
    }

    /// Look up a tag by id; unknown ids yield an empty tag value
    #[must_use]
    pub fn tag_by_id(&self, id: &str) -> Tag {
        self.tags_by_id.get(id).cloned().unwrap_or_default()
    }

    /// Tag names attached to `mor`, grouped by category name
    ///
    /// Each value is the tag names of that category sorted lexicographically
    /// and joined with `|`, so downstream attribute values are stable across
    /// cycles regardless of assignment-response ordering.
    pub async fn tags_by_categories(&self, mor: &Mor) -> HashMap<String, String> {
        let index = self.tags_by_object.read().await;
        let Some(tags) = index.get(mor) else {
            return HashMap::new();
        };

        let mut grouped: HashMap<String, Vec<&str>> = HashMap::new();
        for tag in tags {
            grouped
                .entry(tag.category.clone())
                .or_default()
                .push(&tag.name);
        }

        grouped
            .into_iter()
            .map(|(category, mut names)| {
                names.sort_unstable();
                (category, names.join("|"))
            })
            .collect()
    }

    /// Parse a filter expression, replacing any previous filter
    ///
    /// Tokens are whitespace-separated `category=name` pairs; tokens not
    /// matching that shape are silently dropped.
    pub fn parse_filter_expression(&mut self, expr: &str) {
        self.filter_tags = expr
            .split_whitespace()
            .filter_map(|token| {
                let parts: Vec<&str> = token.split('=').collect();
                match parts.as_slice() {
                    [category, name] => Some(Tag::new(*category, *name)),
                    _ => None,
                }
            })
            .collect();
    }

    /// Whether any filter terms are active
    ///
    /// An empty filter means "filtering disabled"; callers check this before
    /// consulting [`TagCache::match_object_tags`].
    #[must_use]
    pub fn has_filter(&self) -> bool {
        !self.filter_tags.is_empty()
    }

    /// Whether the object's cached tags satisfy every filter term
    pub async fn match_object_tags(&self, mor: &Mor) -> bool {
        let index = self.tags_by_object.read().await;
        match index.get(mor) {
            Some(tags) => self.match_tags(tags),
            None => self.match_tags(&[]),
        }
    }

    /// AND-match: true iff every filter term is present among `tags`
    #[must_use]
    pub fn match_tags(&self, tags: &[Tag]) -> bool {
        if tags.is_empty() && !self.filter_tags.is_empty() {
            return false;
        }
        self.filter_tags.iter().all(|term| tags.contains(term))
    }
}
