//! Managed-object data model
//!
//! Typed records for the seven inventory kinds plus the tagging and
//! performance value types. Every registry and cache in the workspace is
//! keyed by [`Mor`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inventory entity kind
///
/// `as_str` yields the wire names container views are scoped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Top-level datacenter
    Datacenter,
    /// Virtual machine
    VirtualMachine,
    /// Datastore
    Datastore,
    /// Hypervisor host
    HostSystem,
    /// Resource pool
    ResourcePool,
    /// Network
    Network,
    /// Cluster compute resource
    ClusterComputeResource,
    /// Inventory folder (root of the hierarchy)
    Folder,
}

impl EntityKind {
    /// Wire name used in view scoping and reference values
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Datacenter => "Datacenter",
            EntityKind::VirtualMachine => "VirtualMachine",
            EntityKind::Datastore => "Datastore",
            EntityKind::HostSystem => "HostSystem",
            EntityKind::ResourcePool => "ResourcePool",
            EntityKind::Network => "Network",
            EntityKind::ClusterComputeResource => "ClusterComputeResource",
            EntityKind::Folder => "Folder",
        }
    }

    /// Parse a wire name back into a kind
    #[must_use]
    pub fn from_wire(s: &str) -> Option<EntityKind> {
        match s {
            "Datacenter" => Some(EntityKind::Datacenter),
            "VirtualMachine" => Some(EntityKind::VirtualMachine),
            "Datastore" => Some(EntityKind::Datastore),
            "HostSystem" => Some(EntityKind::HostSystem),
            "ResourcePool" => Some(EntityKind::ResourcePool),
            "Network" => Some(EntityKind::Network),
            "ClusterComputeResource" => Some(EntityKind::ClusterComputeResource),
            "Folder" => Some(EntityKind::Folder),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Managed object reference: opaque identifier pairing an entity kind with
/// an opaque value, unique within one inventory domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mor {
    /// Entity kind
    pub kind: EntityKind,
    /// Opaque identifier value
    pub value: String,
}

impl Mor {
    /// Create a new reference
    pub fn new(kind: EntityKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Mor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

// ============================================================================
// Inventory records
// ============================================================================

/// Datacenter descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatacenterInfo {
    /// Object reference
    pub mor: Mor,
    /// Datacenter name
    pub name: String,
}

/// Hypervisor host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    /// Object reference
    pub mor: Mor,
    /// Host name
    pub name: String,
    /// Parent compute resource (cluster or standalone)
    pub parent: Option<Mor>,
    /// Overall status (green, yellow, red, gray)
    pub overall_status: String,
    /// Total CPU capacity in MHz
    pub total_cpu_mhz: i64,
    /// Current CPU usage in MHz
    pub cpu_usage_mhz: i64,
    /// Total memory in bytes
    pub memory_bytes: i64,
    /// Current memory usage in MiB
    pub memory_usage_mib: i64,
    /// Connection state
    pub connection_state: String,
    /// Virtual machines on this host
    pub vms: Vec<Mor>,
    /// Datastores mounted by this host
    pub datastores: Vec<Mor>,
    /// Networks reachable from this host
    pub networks: Vec<Mor>,
}

/// Cluster compute resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Object reference
    pub mor: Mor,
    /// Cluster name
    pub name: String,
    /// Overall status
    pub overall_status: String,
    /// Member hosts
    pub hosts: Vec<Mor>,
    /// Attached datastores
    pub datastores: Vec<Mor>,
    /// Attached networks
    pub networks: Vec<Mor>,
    /// Root resource pool owned by this cluster
    pub resource_pool: Option<Mor>,
    /// Aggregate CPU in MHz
    pub total_cpu_mhz: i64,
    /// Total member host count
    pub num_hosts: u32,
    /// Hosts currently usable for placement
    pub num_effective_hosts: u32,
}

/// Resource pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePoolRecord {
    /// Object reference
    pub mor: Mor,
    /// Configured pool name
    pub name: String,
    /// Owning compute resource (cluster or standalone host wrapper)
    pub owner: Mor,
    /// Parent object; a non-pool parent marks the default (root) pool
    pub parent: Option<Mor>,
    /// Direct child pools
    pub child_pools: Vec<Mor>,
    /// Virtual machines assigned to this pool
    pub vms: Vec<Mor>,
    /// Overall status
    pub overall_status: String,
    /// Current CPU usage in MHz
    pub cpu_usage_mhz: i64,
    /// Current memory usage in bytes
    pub memory_usage_bytes: i64,
}

/// Datastore backing variant
///
/// Discriminated union over the remote API's backing-info types; matched
/// exhaustively wherever backing attributes are emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatastoreBacking {
    /// Network-attached storage
    Nas {
        /// Remote NFS server host
        remote_host: String,
        /// Exported path on the remote host
        remote_path: String,
    },
    /// VMFS volume
    Vmfs {
        /// Whether the volume is on local disks
        local: bool,
    },
    /// Any other backing the API may report
    Other,
}

/// Datastore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreRecord {
    /// Object reference
    pub mor: Mor,
    /// Datastore name
    pub name: String,
    /// Filesystem type (NFS, VMFS, ...)
    pub fs_type: String,
    /// Unique datastore URL
    pub url: String,
    /// Whether the datastore is currently accessible
    pub accessible: bool,
    /// Overall status
    pub overall_status: String,
    /// Capacity in bytes
    pub capacity_bytes: i64,
    /// Free space in bytes
    pub free_bytes: i64,
    /// Provisioned-but-unallocated bytes
    pub uncommitted_bytes: i64,
    /// Virtual machines stored here
    pub vms: Vec<Mor>,
    /// Hosts mounting this datastore
    pub hosts: Vec<Mor>,
    /// Backing info
    pub backing: DatastoreBacking,
}

/// Network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    /// Object reference
    pub mor: Mor,
    /// Network name
    pub name: String,
    /// Whether at least one host can reach the network
    pub accessible: bool,
    /// Overall status
    pub overall_status: String,
    /// Connected virtual machines
    pub vms: Vec<Mor>,
    /// Hosts attached to the network
    pub hosts: Vec<Mor>,
}

/// Virtual machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmRecord {
    /// Object reference
    pub mor: Mor,
    /// VM name
    pub name: String,
    /// Overall status
    pub overall_status: String,
    /// Power state (poweredOn, poweredOff, suspended)
    pub power_state: String,
    /// Resource pool the VM runs in
    pub resource_pool: Option<Mor>,
    /// Host currently running the VM
    pub host: Option<Mor>,
    /// Guest OS full name, when tools report it
    pub guest_full_name: Option<String>,
    /// Guest hostname, when tools report it
    pub guest_hostname: Option<String>,
    /// Primary IP address, when tools report it
    pub ip_address: Option<String>,
    /// Configured virtual CPU count
    pub num_cpu: i32,
    /// Configured memory in MiB
    pub memory_mib: i32,
}

/// A retrieved inventory object of any kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InventoryObject {
    /// Datacenter descriptor
    Datacenter(DatacenterInfo),
    /// Hypervisor host
    Host(HostRecord),
    /// Cluster compute resource
    Cluster(ClusterRecord),
    /// Resource pool
    ResourcePool(ResourcePoolRecord),
    /// Datastore
    Datastore(DatastoreRecord),
    /// Network
    Network(NetworkRecord),
    /// Virtual machine
    VirtualMachine(VmRecord),
}

impl InventoryObject {
    /// Object reference of the wrapped record
    #[must_use]
    pub fn mor(&self) -> &Mor {
        match self {
            InventoryObject::Datacenter(r) => &r.mor,
            InventoryObject::Host(r) => &r.mor,
            InventoryObject::Cluster(r) => &r.mor,
            InventoryObject::ResourcePool(r) => &r.mor,
            InventoryObject::Datastore(r) => &r.mor,
            InventoryObject::Network(r) => &r.mor,
            InventoryObject::VirtualMachine(r) => &r.mor,
        }
    }

    /// Display name of the wrapped record
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            InventoryObject::Datacenter(r) => &r.name,
            InventoryObject::Host(r) => &r.name,
            InventoryObject::Cluster(r) => &r.name,
            InventoryObject::ResourcePool(r) => &r.name,
            InventoryObject::Datastore(r) => &r.name,
            InventoryObject::Network(r) => &r.name,
            InventoryObject::VirtualMachine(r) => &r.name,
        }
    }

    /// Entity kind of the wrapped record
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.mor().kind
    }
}

// ============================================================================
// Tagging
// ============================================================================

/// Tag category as listed by the tagging service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Category identifier
    pub id: String,
    /// Category name
    pub name: String,
}

/// Tag as listed by the tagging service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagModel {
    /// Tag identifier
    pub id: String,
    /// Tag name
    pub name: String,
    /// Identifier of the owning category
    pub category_id: String,
}

/// Tag identifiers attached to one object, as returned by the batch
/// attached-tags query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectTags {
    /// The tagged object
    pub object: Mor,
    /// Identifiers of the attached tags
    pub tag_ids: Vec<String>,
}

// ============================================================================
// Performance counters
// ============================================================================

/// Sampling interval passed to the performance provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerfInterval {
    /// 20-second real-time samples (hosts, virtual machines)
    RealTime,
    /// 5-minute historical rollups (everything else)
    FiveMinutes,
}

impl PerfInterval {
    /// Interval length in seconds
    #[must_use]
    pub fn as_secs(&self) -> u32 {
        match self {
            PerfInterval::RealTime => 20,
            PerfInterval::FiveMinutes => 300,
        }
    }
}

/// One sampled performance counter value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfSample {
    /// Object the counter was sampled on
    pub object: Mor,
    /// Counter name, e.g. `cpu.usage.average`
    pub counter: String,
    /// Counter instance (empty for the aggregate instance)
    pub instance: String,
    /// Sampled value
    pub value: f64,
    /// Sample timestamp
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_wire_names() {
        assert_eq!(EntityKind::HostSystem.as_str(), "HostSystem");
        assert_eq!(
            EntityKind::ClusterComputeResource.as_str(),
            "ClusterComputeResource"
        );
    }

    #[test]
    fn test_mor_equality_is_kind_and_value() {
        let a = Mor::new(EntityKind::VirtualMachine, "vm-42");
        let b = Mor::new(EntityKind::VirtualMachine, "vm-42");
        let c = Mor::new(EntityKind::HostSystem, "vm-42");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_perf_interval_seconds() {
        assert_eq!(PerfInterval::RealTime.as_secs(), 20);
        assert_eq!(PerfInterval::FiveMinutes.as_secs(), 300);
    }
}
