//! vcwatch-inventory: concurrent inventory discovery and tag filtering
//!
//! The per-cycle engine: builds the tag cache, discovers datacenters, fans
//! out one collection task per entity kind, and populates the per-datacenter
//! registries the downstream processor consumes.

pub mod collect;
pub mod datacenter;
pub mod error;
pub mod perf;
pub mod tags;

pub use collect::{CollectOutcome, CycleServices, collect_inventory};
pub use datacenter::Datacenter;
pub use error::InventoryError;
pub use perf::MetricDefinitions;
pub use tags::{Tag, TagCache};
