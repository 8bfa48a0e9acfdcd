//! vcwatch-client: vSphere data model and remote service seams
//!
//! Defines the managed-object data model shared across the workspace, the
//! traits the collector consumes (container views, tagging, performance
//! counters), a REST client for the tagging endpoints, and an in-memory
//! simulator used by tests.

pub mod error;
pub mod inventory;
pub mod rest;
pub mod sim;
pub mod traits;
pub mod types;

pub use error::{ClientError, Result};
pub use inventory::RestInventoryClient;
pub use rest::{RestSession, RestTaggingClient};
pub use sim::{SimClient, SimDatacenter};
pub use traits::{ContainerView, PerfProvider, TaggingService, ViewManager};
pub use types::{
    Category, ClusterRecord, DatacenterInfo, DatastoreBacking, DatastoreRecord, EntityKind,
    HostRecord, InventoryObject, Mor, NetworkRecord, ObjectTags, PerfInterval, PerfSample,
    ResourcePoolRecord, TagModel, VmRecord,
};
