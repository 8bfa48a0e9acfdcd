//! REST inventory transport
//!
//! Implements [`ViewManager`] over the Automation API's `/rest/vcenter/*`
//! list endpoints. A "container view" maps to a datacenter-filtered list
//! call per kind; the REST listings are stateless, so `destroy` has nothing
//! to release.
//!
//! The REST summaries expose a subset of the SOAP property whitelists;
//! fields the endpoint does not report (parent/owner references, capacity
//! details on some kinds) are left at their empty defaults.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};
use crate::rest::RestSession;
use crate::traits::{ContainerView, ViewManager};
use crate::types::{
    ClusterRecord, DatacenterInfo, DatastoreBacking, DatastoreRecord, EntityKind, HostRecord,
    InventoryObject, Mor, NetworkRecord, ResourcePoolRecord, VmRecord,
};

#[derive(Debug, Deserialize)]
struct WireDatacenter {
    datacenter: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireCluster {
    cluster: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireHost {
    host: String,
    name: String,
    #[serde(default)]
    connection_state: String,
}

#[derive(Debug, Deserialize)]
struct WireDatastore {
    datastore: String,
    name: String,
    #[serde(rename = "type", default)]
    fs_type: String,
    #[serde(default)]
    free_space: i64,
    #[serde(default)]
    capacity: i64,
}

#[derive(Debug, Deserialize)]
struct WireNetwork {
    network: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireVm {
    vm: String,
    name: String,
    #[serde(default)]
    power_state: String,
    #[serde(default)]
    cpu_count: i32,
    #[serde(rename = "memory_size_MiB", default)]
    memory_size_mib: i32,
}

#[derive(Debug, Deserialize)]
struct WireResourcePool {
    resource_pool: String,
    name: String,
}

/// REST implementation of the inventory view seam
#[derive(Debug, Clone)]
pub struct RestInventoryClient {
    session: Arc<RestSession>,
}

impl RestInventoryClient {
    /// Wrap an established session
    #[must_use]
    pub fn new(session: Arc<RestSession>) -> Self {
        Self { session }
    }

    /// Build a list URL for `kind`, filtered to `datacenter` when scoped
    fn list_url(&self, kind: EntityKind, datacenter: Option<&Mor>) -> Result<Url> {
        let path = match kind {
            EntityKind::Datacenter => "/rest/vcenter/datacenter",
            EntityKind::VirtualMachine => "/rest/vcenter/vm",
            EntityKind::Datastore => "/rest/vcenter/datastore",
            EntityKind::HostSystem => "/rest/vcenter/host",
            EntityKind::ResourcePool => "/rest/vcenter/resource-pool",
            EntityKind::Network => "/rest/vcenter/network",
            EntityKind::ClusterComputeResource => "/rest/vcenter/cluster",
            EntityKind::Folder => {
                return Err(ClientError::ViewCreation(
                    "folders are not enumerable through this transport".to_string(),
                ));
            }
        };
        let mut url = self.session.url(path)?;
        if let Some(dc) = datacenter {
            url.query_pairs_mut()
                .append_pair("filter.datacenters", &dc.value);
        }
        Ok(url)
    }

    async fn list(&self, kind: EntityKind, datacenter: Option<&Mor>) -> Result<Vec<InventoryObject>> {
        let url = self.list_url(kind, datacenter)?;
        let objects = match kind {
            EntityKind::Datacenter => {
                let rows: Vec<WireDatacenter> = self.session.get_url(url).await?;
                rows.into_iter()
                    .map(|r| {
                        InventoryObject::Datacenter(DatacenterInfo {
                            mor: Mor::new(EntityKind::Datacenter, r.datacenter),
                            name: r.name,
                        })
                    })
                    .collect()
            }
            EntityKind::HostSystem => {
                let rows: Vec<WireHost> = self.session.get_url(url).await?;
                rows.into_iter()
                    .map(|r| {
                        InventoryObject::Host(HostRecord {
                            mor: Mor::new(EntityKind::HostSystem, r.host),
                            name: r.name,
                            parent: None,
                            overall_status: String::new(),
                            total_cpu_mhz: 0,
                            cpu_usage_mhz: 0,
                            memory_bytes: 0,
                            memory_usage_mib: 0,
                            connection_state: r.connection_state,
                            vms: Vec::new(),
                            datastores: Vec::new(),
                            networks: Vec::new(),
                        })
                    })
                    .collect()
            }
            EntityKind::ClusterComputeResource => {
                let rows: Vec<WireCluster> = self.session.get_url(url).await?;
                rows.into_iter()
                    .map(|r| {
                        InventoryObject::Cluster(ClusterRecord {
                            mor: Mor::new(EntityKind::ClusterComputeResource, r.cluster),
                            name: r.name,
                            overall_status: String::new(),
                            hosts: Vec::new(),
                            datastores: Vec::new(),
                            networks: Vec::new(),
                            resource_pool: None,
                            total_cpu_mhz: 0,
                            num_hosts: 0,
                            num_effective_hosts: 0,
                        })
                    })
                    .collect()
            }
            EntityKind::ResourcePool => {
                let rows: Vec<WireResourcePool> = self.session.get_url(url).await?;
                rows.into_iter()
                    .map(|r| {
                        InventoryObject::ResourcePool(ResourcePoolRecord {
                            mor: Mor::new(EntityKind::ResourcePool, r.resource_pool),
                            name: r.name,
                            owner: Mor::new(EntityKind::ClusterComputeResource, ""),
                            parent: None,
                            child_pools: Vec::new(),
                            vms: Vec::new(),
                            overall_status: String::new(),
                            cpu_usage_mhz: 0,
                            memory_usage_bytes: 0,
                        })
                    })
                    .collect()
            }
            EntityKind::Datastore => {
                let rows: Vec<WireDatastore> = self.session.get_url(url).await?;
                rows.into_iter()
                    .map(|r| {
                        let backing = if r.fs_type.eq_ignore_ascii_case("nfs") {
                            // The listing does not carry NAS details; they
                            // stay empty until a richer transport fills them.
                            DatastoreBacking::Nas {
                                remote_host: String::new(),
                                remote_path: String::new(),
                            }
                        } else if r.fs_type.eq_ignore_ascii_case("vmfs") {
                            DatastoreBacking::Vmfs { local: false }
                        } else {
                            DatastoreBacking::Other
                        };
                        InventoryObject::Datastore(DatastoreRecord {
                            mor: Mor::new(EntityKind::Datastore, r.datastore),
                            name: r.name,
                            fs_type: r.fs_type,
                            url: String::new(),
                            accessible: true,
                            overall_status: String::new(),
                            capacity_bytes: r.capacity,
                            free_bytes: r.free_space,
                            uncommitted_bytes: 0,
                            vms: Vec::new(),
                            hosts: Vec::new(),
                            backing,
                        })
                    })
                    .collect()
            }
            EntityKind::Network => {
                let rows: Vec<WireNetwork> = self.session.get_url(url).await?;
                rows.into_iter()
                    .map(|r| {
                        InventoryObject::Network(NetworkRecord {
                            mor: Mor::new(EntityKind::Network, r.network),
                            name: r.name,
                            accessible: true,
                            overall_status: String::new(),
                            vms: Vec::new(),
                            hosts: Vec::new(),
                        })
                    })
                    .collect()
            }
            EntityKind::VirtualMachine => {
                let rows: Vec<WireVm> = self.session.get_url(url).await?;
                rows.into_iter()
                    .map(|r| {
                        InventoryObject::VirtualMachine(VmRecord {
                            mor: Mor::new(EntityKind::VirtualMachine, r.vm),
                            name: r.name,
                            overall_status: String::new(),
                            power_state: r.power_state,
                            resource_pool: None,
                            host: None,
                            guest_full_name: None,
                            guest_hostname: None,
                            ip_address: None,
                            num_cpu: r.cpu_count,
                            memory_mib: r.memory_size_mib,
                        })
                    })
                    .collect()
            }
            EntityKind::Folder => Vec::new(),
        };
        Ok(objects)
    }
}

/// A "view" over the REST listings: the scope captured at creation time
struct RestView {
    client: RestInventoryClient,
    datacenter: Option<Mor>,
}

#[async_trait]
impl ContainerView for RestView {
    async fn retrieve(
        &self,
        kinds: &[EntityKind],
        _properties: &[&str],
    ) -> Result<Vec<InventoryObject>> {
        let mut objects = Vec::new();
        for kind in kinds {
            objects.extend(self.client.list(*kind, self.datacenter.as_ref()).await?);
        }
        debug!(count = objects.len(), "objects retrieved");
        Ok(objects)
    }

    async fn destroy(&self) -> Result<()> {
        // REST listings are stateless; nothing to release.
        Ok(())
    }
}

#[async_trait]
impl ViewManager for RestInventoryClient {
    fn root_folder(&self) -> Mor {
        Mor::new(EntityKind::Folder, "group-d1")
    }

    async fn create_container_view(
        &self,
        root: &Mor,
        _kinds: &[EntityKind],
        _recursive: bool,
    ) -> Result<Box<dyn ContainerView>> {
        let datacenter = match root.kind {
            EntityKind::Folder => None,
            EntityKind::Datacenter => Some(root.clone()),
            other => {
                return Err(ClientError::ViewCreation(format!(
                    "views can only be rooted at the root folder or a datacenter, got {other}"
                )));
            }
        };
        Ok(Box::new(RestView {
            client: self.clone(),
            datacenter,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_wire_shape() {
        let raw = r#"{"vm": "vm-12", "name": "web-01", "power_state": "POWERED_ON",
                      "cpu_count": 4, "memory_size_MiB": 8192}"#;
        let wire: WireVm = serde_json::from_str(raw).unwrap();
        assert_eq!(wire.vm, "vm-12");
        assert_eq!(wire.memory_size_mib, 8192);
    }

    #[test]
    fn test_datastore_wire_defaults() {
        let raw = r#"{"datastore": "datastore-5", "name": "nfs-a", "type": "NFS"}"#;
        let wire: WireDatastore = serde_json::from_str(raw).unwrap();
        assert_eq!(wire.capacity, 0);
        assert_eq!(wire.fs_type, "NFS");
    }
}
