//! Collection cycle orchestration
//!
//! Datacenter discovery runs first and sequentially: every later view is
//! rooted at a datacenter. The six per-kind tasks then fan out on a
//! `JoinSet` and the cycle blocks on the join barrier before any downstream
//! consumer sees the model. Per-(datacenter, kind) failures are logged and
//! skipped; there is no retry within a cycle. The next cycle is the retry.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

use vcwatch_client::{EntityKind, InventoryObject, Mor, PerfProvider, ViewManager};

use crate::datacenter::Datacenter;
use crate::error::InventoryError;
use crate::perf::{MetricDefinitions, interval_for};
use crate::tags::TagCache;

/// The six kinds collected beneath each datacenter
pub const COLLECTED_KINDS: [EntityKind; 6] = [
    EntityKind::VirtualMachine,
    EntityKind::Network,
    EntityKind::HostSystem,
    EntityKind::Datastore,
    EntityKind::ClusterComputeResource,
    EntityKind::ResourcePool,
];

/// Fixed, minimal property whitelist per kind; avoids pulling expensive
/// fields the processor never reads
#[must_use]
pub fn properties_for(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Datacenter => &["name"],
        EntityKind::HostSystem => &[
            "summary",
            "overallStatus",
            "config",
            "network",
            "vm",
            "runtime",
            "parent",
            "datastore",
        ],
        EntityKind::VirtualMachine => &[
            "summary",
            "network",
            "config",
            "guest",
            "runtime",
            "resourcePool",
        ],
        EntityKind::ResourcePool => &[
            "summary",
            "owner",
            "parent",
            "runtime",
            "name",
            "overallStatus",
            "vm",
            "resourcePool",
        ],
        EntityKind::Datastore => &["summary", "overallStatus", "vm", "host", "info"],
        EntityKind::Network => &["summary", "overallStatus", "vm", "host", "name"],
        EntityKind::ClusterComputeResource => &[
            "summary",
            "overallStatus",
            "host",
            "datastore",
            "network",
            "name",
            "resourcePool",
        ],
        EntityKind::Folder => &[],
    }
}

/// Service bundle for one collection cycle
///
/// Constructed once per cycle and injected into every task; nothing in the
/// cycle reaches for process-wide state.
pub struct CycleServices {
    /// View manager over the remote inventory
    pub view_manager: Arc<dyn ViewManager>,
    /// Tag cache, present when tag collection is enabled
    pub tags: Option<Arc<TagCache>>,
    /// Performance provider, present when counter collection is enabled
    pub perf: Option<Arc<dyn PerfProvider>>,
    /// Counter names per kind
    pub metrics: MetricDefinitions,
}

impl CycleServices {
    /// Whether tag enrichment runs this cycle
    #[must_use]
    pub fn tag_collection_enabled(&self) -> bool {
        self.tags.is_some()
    }

    /// Whether tag filtering runs this cycle (requires active filter terms)
    #[must_use]
    pub fn tag_filtering_enabled(&self) -> bool {
        self.tags.as_ref().is_some_and(|t| t.has_filter())
    }

    /// Whether performance counters are collected this cycle
    #[must_use]
    pub fn perf_enabled(&self) -> bool {
        self.perf.is_some()
    }
}

/// Result of one collection cycle
pub struct CollectOutcome {
    /// Populated per-datacenter records, in discovery order
    pub datacenters: Vec<Arc<Datacenter>>,
    /// Task-level failures, aggregated at the join barrier
    pub task_errors: Vec<InventoryError>,
}

/// Run one full collection cycle
///
/// # Errors
/// Returns an error if datacenter discovery fails; per-kind task failures
/// are aggregated into the outcome instead.
pub async fn collect_inventory(
    services: Arc<CycleServices>,
) -> Result<CollectOutcome, InventoryError> {
    let datacenters: Arc<Vec<Arc<Datacenter>>> =
        Arc::new(discover_datacenters(services.as_ref()).await?);

    debug!(count = datacenters.len(), "datacenters discovered");

    let mut tasks: JoinSet<Result<(), InventoryError>> = JoinSet::new();
    for kind in COLLECTED_KINDS {
        let services = Arc::clone(&services);
        let datacenters = Arc::clone(&datacenters);
        tasks.spawn(async move { collect_kind(kind, &services, &datacenters).await });
    }

    // Join barrier: downstream consumers never see a partially collected
    // cycle.
    let mut task_errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(error = %e, "collection task failed");
                task_errors.push(e);
            }
            Err(e) => {
                error!(error = %e, "collection task aborted");
                task_errors.push(InventoryError::Join(e.to_string()));
            }
        }
    }

    Ok(CollectOutcome {
        datacenters: datacenters.to_vec(),
        task_errors,
    })
}

/// Discover all datacenters from the inventory root
///
/// # Errors
/// Returns an error if the root view cannot be created or retrieved from;
/// without datacenters the cycle cannot proceed.
pub async fn discover_datacenters(
    services: &CycleServices,
) -> Result<Vec<Arc<Datacenter>>, InventoryError> {
    let root = services.view_manager.root_folder();
    let view = services
        .view_manager
        .create_container_view(&root, &[EntityKind::Datacenter], true)
        .await
        .map_err(|e| InventoryError::Discovery(e.to_string()))?;

    let retrieved = view
        .retrieve(
            &[EntityKind::Datacenter],
            properties_for(EntityKind::Datacenter),
        )
        .await;

    if let Err(e) = view.destroy().await {
        warn!(error = %e, "error while cleaning up datacenter container view");
    }

    let objects = retrieved.map_err(|e| InventoryError::Discovery(e.to_string()))?;

    Ok(objects
        .into_iter()
        .filter_map(|object| match object {
            InventoryObject::Datacenter(info) => Some(Arc::new(Datacenter::new(info))),
            _ => None,
        })
        .collect())
}

/// Collect one entity kind across all datacenters
///
/// Per-datacenter failures are logged with context and skipped; the task
/// carries on with the next datacenter. The task only fails as a whole when
/// every datacenter failed for this kind.
///
/// # Errors
/// Returns a task error when no datacenter could be collected.
#[instrument(skip(services, datacenters), fields(kind = %kind))]
pub async fn collect_kind(
    kind: EntityKind,
    services: &CycleServices,
    datacenters: &[Arc<Datacenter>],
) -> Result<(), InventoryError> {
    let mut failures = 0usize;
    let mut last_error = None;
    for dc in datacenters {
        if let Err(e) = collect_kind_for_datacenter(kind, services, dc).await {
            warn!(
                datacenter = %dc.info.name,
                error = %e,
                "skipping datacenter for this kind"
            );
            failures += 1;
            last_error = Some(e);
        }
    }

    if failures > 0 && failures == datacenters.len() {
        let message = last_error.map(|e| e.to_string()).unwrap_or_default();
        return Err(InventoryError::Task { kind, message });
    }

    debug!("collection task finished");
    Ok(())
}

/// Collect one kind beneath one datacenter
async fn collect_kind_for_datacenter(
    kind: EntityKind,
    services: &CycleServices,
    dc: &Datacenter,
) -> Result<(), InventoryError> {
    let view = services
        .view_manager
        .create_container_view(&dc.info.mor, &[kind], true)
        .await?;

    let retrieved = view.retrieve(&[kind], properties_for(kind)).await;

    // The view is released before any other outcome is handled, so every
    // exit path below leaves no server-side view behind.
    if let Err(e) = view.destroy().await {
        warn!(datacenter = %dc.info.name, error = %e, "error while cleaning up container view");
    }

    let objects = retrieved?;

    let refs: Vec<Mor> = objects.iter().map(|o| o.mor().clone()).collect();

    if let Some(cache) = &services.tags {
        match cache.fetch_tags_for_objects(&refs).await {
            Ok(count) => debug!(datacenter = %dc.info.name, count, "tags collected for batch"),
            Err(e) => {
                warn!(datacenter = %dc.info.name, error = %e, "failed to retrieve tags for batch");
            }
        }
    }

    let filtering = services.tag_filtering_enabled();
    let mut surviving: Vec<Mor> = Vec::with_capacity(objects.len());
    for object in objects {
        if filtering {
            // tag_filtering_enabled implies the cache is present
            let matched = match &services.tags {
                Some(cache) => cache.match_object_tags(object.mor()).await,
                None => true,
            };
            if !matched {
                debug!(
                    name = object.name(),
                    "ignoring object since no tags matched the configured filters"
                );
                continue;
            }
        }
        surviving.push(object.mor().clone());
        dc.insert(object).await;
    }

    if let Some(perf) = &services.perf {
        let counters = services.metrics.counters_for(kind);
        if !counters.is_empty() && !surviving.is_empty() {
            match perf.collect(&surviving, counters, interval_for(kind)).await {
                Ok(samples) => {
                    debug!(
                        datacenter = %dc.info.name,
                        samples = samples.len(),
                        "perf metrics collected"
                    );
                    dc.add_perf_samples(samples).await;
                }
                Err(e) => {
                    warn!(datacenter = %dc.info.name, error = %e, "failed to collect perf metrics");
                }
            }
        }
    }

    Ok(())
}
