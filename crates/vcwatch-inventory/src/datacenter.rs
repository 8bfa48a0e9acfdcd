//! Per-datacenter registries and relationship queries
//!
//! One `Datacenter` exists per discovered datacenter; every child object
//! belongs to exactly one (the one whose view produced it). Each kind's
//! registry has its own lock because exactly one collection task writes it;
//! perf samples are appended by all six tasks and use a `Mutex`.

use std::collections::HashMap;

use tokio::sync::{Mutex, RwLock};

use vcwatch_client::{
    ClusterRecord, DatacenterInfo, DatastoreRecord, EntityKind, HostRecord, InventoryObject, Mor,
    NetworkRecord, PerfSample, ResourcePoolRecord, VmRecord,
};

/// One datacenter's descriptor, registries, and collected counters
pub struct Datacenter {
    /// Datacenter descriptor
    pub info: DatacenterInfo,
    /// Hosts discovered beneath this datacenter
    pub hosts: RwLock<HashMap<Mor, HostRecord>>,
    /// Clusters discovered beneath this datacenter
    pub clusters: RwLock<HashMap<Mor, ClusterRecord>>,
    /// Resource pools discovered beneath this datacenter
    pub resource_pools: RwLock<HashMap<Mor, ResourcePoolRecord>>,
    /// Datastores discovered beneath this datacenter
    pub datastores: RwLock<HashMap<Mor, DatastoreRecord>>,
    /// Networks discovered beneath this datacenter
    pub networks: RwLock<HashMap<Mor, NetworkRecord>>,
    /// Virtual machines discovered beneath this datacenter
    pub vms: RwLock<HashMap<Mor, VmRecord>>,
    /// Performance samples attached by the per-kind tasks
    pub perf_samples: Mutex<Vec<PerfSample>>,
}

impl Datacenter {
    /// Create an empty datacenter record
    #[must_use]
    pub fn new(info: DatacenterInfo) -> Self {
        Self {
            info,
            hosts: RwLock::new(HashMap::new()),
            clusters: RwLock::new(HashMap::new()),
            resource_pools: RwLock::new(HashMap::new()),
            datastores: RwLock::new(HashMap::new()),
            networks: RwLock::new(HashMap::new()),
            vms: RwLock::new(HashMap::new()),
            perf_samples: Mutex::new(Vec::new()),
        }
    }

    /// Write a retrieved object into the registry for its kind
    ///
    /// Datacenter descriptors are not registry entries and are ignored.
    pub async fn insert(&self, object: InventoryObject) {
        match object {
            InventoryObject::Host(r) => {
                self.hosts.write().await.insert(r.mor.clone(), r);
            }
            InventoryObject::Cluster(r) => {
                self.clusters.write().await.insert(r.mor.clone(), r);
            }
            InventoryObject::ResourcePool(r) => {
                self.resource_pools.write().await.insert(r.mor.clone(), r);
            }
            InventoryObject::Datastore(r) => {
                self.datastores.write().await.insert(r.mor.clone(), r);
            }
            InventoryObject::Network(r) => {
                self.networks.write().await.insert(r.mor.clone(), r);
            }
            InventoryObject::VirtualMachine(r) => {
                self.vms.write().await.insert(r.mor.clone(), r);
            }
            InventoryObject::Datacenter(_) => {}
        }
    }

    /// Append performance samples collected for one entity batch
    pub async fn add_perf_samples(&self, samples: Vec<PerfSample>) {
        self.perf_samples.lock().await.extend(samples);
    }

    /// Non-default resource pools under the cluster: the children of every
    /// pool the cluster owns, excluding the root pool itself
    pub async fn find_resource_pools(&self, cluster: &Mor) -> Vec<ResourcePoolRecord> {
        let pools = self.resource_pools.read().await;
        let mut found = Vec::new();
        for pool in pools.values() {
            if pool.owner == *cluster && !pool.child_pools.is_empty() {
                for child in &pool.child_pools {
                    if let Some(child_pool) = pools.get(child) {
                        found.push(child_pool.clone());
                    }
                }
            }
        }
        found
    }

    /// One host whose parent is the given compute resource
    ///
    /// The registry has no defined iteration order: when several hosts share
    /// the parent, any one of them may be returned.
    pub async fn find_host(&self, compute_resource: &Mor) -> Option<HostRecord> {
        let hosts = self.hosts.read().await;
        hosts
            .values()
            .find(|host| host.parent.as_ref() == Some(compute_resource))
            .cloned()
    }

    /// Configured pool name, or `""` for the default (root) pool
    pub async fn resource_pool_name(&self, pool: &Mor) -> String {
        if self.is_default_resource_pool(pool).await {
            return String::new();
        }
        let pools = self.resource_pools.read().await;
        pools
            .get(pool)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    /// A pool is default iff its parent reference's kind is not ResourcePool
    /// (its parent is the compute resource itself, not another pool)
    pub async fn is_default_resource_pool(&self, pool: &Mor) -> bool {
        let pools = self.resource_pools.read().await;
        match pools.get(pool) {
            Some(p) => p
                .parent
                .as_ref()
                .is_none_or(|parent| parent.kind != EntityKind::ResourcePool),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(
        value: &str,
        name: &str,
        owner: &Mor,
        parent: Option<Mor>,
        children: Vec<Mor>,
    ) -> ResourcePoolRecord {
        ResourcePoolRecord {
            mor: Mor::new(EntityKind::ResourcePool, value),
            name: name.to_string(),
            owner: owner.clone(),
            parent,
            child_pools: children,
            vms: Vec::new(),
            overall_status: "green".to_string(),
            cpu_usage_mhz: 0,
            memory_usage_bytes: 0,
        }
    }

    fn host(value: &str, parent: Option<Mor>) -> HostRecord {
        HostRecord {
            mor: Mor::new(EntityKind::HostSystem, value),
            name: value.to_string(),
            parent,
            overall_status: "green".to_string(),
            total_cpu_mhz: 0,
            cpu_usage_mhz: 0,
            memory_bytes: 0,
            memory_usage_mib: 0,
            connection_state: "connected".to_string(),
            vms: Vec::new(),
            datastores: Vec::new(),
            networks: Vec::new(),
        }
    }

    fn dc() -> Datacenter {
        Datacenter::new(DatacenterInfo {
            mor: Mor::new(EntityKind::Datacenter, "datacenter-1"),
            name: "dc-east".to_string(),
        })
    }

    #[tokio::test]
    async fn test_default_pool_has_empty_name() {
        let dc = dc();
        let cluster = Mor::new(EntityKind::ClusterComputeResource, "domain-c1");
        let root = pool("resgroup-1", "Resources", &cluster, Some(cluster.clone()), vec![]);
        let root_mor = root.mor.clone();
        dc.insert(InventoryObject::ResourcePool(root)).await;

        assert!(dc.is_default_resource_pool(&root_mor).await);
        assert_eq!(dc.resource_pool_name(&root_mor).await, "");
    }

    #[tokio::test]
    async fn test_child_pool_keeps_its_name() {
        let dc = dc();
        let cluster = Mor::new(EntityKind::ClusterComputeResource, "domain-c1");
        let root_mor = Mor::new(EntityKind::ResourcePool, "resgroup-1");
        let child = pool("resgroup-2", "batch-workers", &cluster, Some(root_mor.clone()), vec![]);
        let child_mor = child.mor.clone();
        dc.insert(InventoryObject::ResourcePool(child)).await;

        assert!(!dc.is_default_resource_pool(&child_mor).await);
        assert_eq!(dc.resource_pool_name(&child_mor).await, "batch-workers");
    }

    #[tokio::test]
    async fn test_unknown_pool_is_not_default() {
        let dc = dc();
        let unknown = Mor::new(EntityKind::ResourcePool, "resgroup-404");
        assert!(!dc.is_default_resource_pool(&unknown).await);
        assert_eq!(dc.resource_pool_name(&unknown).await, "");
    }

    #[tokio::test]
    async fn test_find_resource_pools_excludes_root() {
        let dc = dc();
        let cluster = Mor::new(EntityKind::ClusterComputeResource, "domain-c1");
        let root_mor = Mor::new(EntityKind::ResourcePool, "resgroup-1");
        let child_a = pool("resgroup-2", "a", &cluster, Some(root_mor.clone()), vec![]);
        let child_b = pool("resgroup-3", "b", &cluster, Some(root_mor.clone()), vec![]);
        let root = pool(
            "resgroup-1",
            "Resources",
            &cluster,
            Some(cluster.clone()),
            vec![child_a.mor.clone(), child_b.mor.clone()],
        );
        dc.insert(InventoryObject::ResourcePool(root)).await;
        dc.insert(InventoryObject::ResourcePool(child_a)).await;
        dc.insert(InventoryObject::ResourcePool(child_b)).await;

        let found = dc.find_resource_pools(&cluster).await;
        let mut names: Vec<String> = found.into_iter().map(|p| p.name).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_find_host_matches_parent() {
        let dc = dc();
        let cluster = Mor::new(EntityKind::ClusterComputeResource, "domain-c1");
        let other = Mor::new(EntityKind::ClusterComputeResource, "domain-c2");
        dc.insert(InventoryObject::Host(host("host-1", Some(cluster.clone()))))
            .await;
        dc.insert(InventoryObject::Host(host("host-2", Some(other.clone()))))
            .await;

        let found = dc.find_host(&cluster).await.unwrap();
        assert_eq!(found.mor.value, "host-1");
        assert!(dc
            .find_host(&Mor::new(EntityKind::ClusterComputeResource, "domain-c9"))
            .await
            .is_none());
    }
}
