//! Turns collected datacenters into published records
//!
//! One JSON object per entity, written as a line to the output sink.
//! Attribute names follow the `VSphere*Sample` event conventions.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use vcwatch_client::{DatastoreBacking, EntityKind, Mor, PerfSample};
use vcwatch_inventory::{CycleServices, Datacenter};

use crate::config::Config;

const MIB: i64 = 1 << 20;
const GIB: f64 = (1u64 << 30) as f64;

/// A single published entity sample
#[derive(Debug, Serialize)]
pub struct Record {
    #[serde(rename = "eventType")]
    pub event_type: &'static str,
    #[serde(rename = "entityName")]
    pub entity_name: String,
    pub timestamp: i64,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

/// Serialize every record for every datacenter as JSON lines
///
/// # Errors
/// Returns error when serialization or the underlying writer fails
pub async fn publish<W: Write>(
    mut out: W,
    config: &Config,
    services: &CycleServices,
    datacenters: &[Arc<Datacenter>],
) -> eyre::Result<()> {
    let timestamp = Utc::now().timestamp();
    let mut count = 0usize;

    for dc in datacenters {
        let records = datacenter_records(config, services, dc, timestamp).await;
        for record in records {
            serde_json::to_writer(&mut out, &record)?;
            out.write_all(b"\n")?;
            count += 1;
        }
    }
    out.flush()?;

    tracing::info!(records = count, "published collection cycle");
    Ok(())
}

async fn datacenter_records(
    config: &Config,
    services: &CycleServices,
    dc: &Datacenter,
    timestamp: i64,
) -> Vec<Record> {
    let perf = perf_index(dc).await;
    let mut records = Vec::new();

    records.push(summary_record(config, dc, timestamp).await);
    records.extend(host_records(config, services, dc, &perf, timestamp).await);
    records.extend(vm_records(config, services, dc, &perf, timestamp).await);
    records.extend(cluster_records(config, services, dc, &perf, timestamp).await);
    records.extend(resource_pool_records(config, services, dc, &perf, timestamp).await);
    records.extend(datastore_records(config, services, dc, &perf, timestamp).await);
    records.extend(network_records(config, services, dc, &perf, timestamp).await);

    records
}

/// Samples collected this cycle, grouped by owning object
async fn perf_index(dc: &Datacenter) -> HashMap<Mor, Vec<PerfSample>> {
    let samples = dc.perf_samples.lock().await;
    let mut index: HashMap<Mor, Vec<PerfSample>> = HashMap::new();
    for sample in samples.iter() {
        index.entry(sample.object.clone()).or_default().push(sample.clone());
    }
    index
}

/// Entity names are prefixed with the configured location and the owning
/// datacenter, lowercased for stable identity across cycles.
fn entity_name(config: &Config, name: &str, dc_name: &str) -> String {
    let label = match &config.datacenter_location {
        Some(location) => format!("{location}:{dc_name}:{name}"),
        None => format!("{dc_name}:{name}"),
    };
    label.to_lowercase()
}

fn base_attributes(config: &Config, dc: &Datacenter) -> BTreeMap<String, Value> {
    let mut attrs = BTreeMap::new();
    attrs.insert("datacenterName".to_string(), json!(dc.info.name));
    if let Some(location) = &config.datacenter_location {
        attrs.insert("datacenterLocation".to_string(), json!(location));
    }
    attrs
}

async fn add_tag_attributes(
    attrs: &mut BTreeMap<String, Value>,
    services: &CycleServices,
    mor: &Mor,
) {
    let Some(tags) = &services.tags else { return };
    for (category, joined) in tags.tags_by_categories(mor).await {
        attrs.insert(format!("label.{category}"), json!(joined));
    }
}

fn add_perf_attributes(
    attrs: &mut BTreeMap<String, Value>,
    perf: &HashMap<Mor, Vec<PerfSample>>,
    mor: &Mor,
) {
    let Some(samples) = perf.get(mor) else { return };
    for sample in samples {
        let key = if sample.instance.is_empty() {
            sample.counter.clone()
        } else {
            format!("{}.{}", sample.counter, sample.instance)
        };
        attrs.insert(key, json!(sample.value));
    }
}

/// One record per datacenter carrying inventory counts
async fn summary_record(config: &Config, dc: &Datacenter, timestamp: i64) -> Record {
    let mut attrs = base_attributes(config, dc);
    attrs.insert("clusters".to_string(), json!(dc.clusters.read().await.len()));
    attrs.insert("hosts".to_string(), json!(dc.hosts.read().await.len()));
    attrs.insert(
        "resourcePools".to_string(),
        json!(dc.resource_pools.read().await.len()),
    );
    attrs.insert("datastores".to_string(), json!(dc.datastores.read().await.len()));
    attrs.insert("networks".to_string(), json!(dc.networks.read().await.len()));
    attrs.insert("vms".to_string(), json!(dc.vms.read().await.len()));

    Record {
        event_type: "VSphereDatacenterSample",
        entity_name: entity_name(config, &dc.info.name, &dc.info.name),
        timestamp,
        attributes: attrs,
    }
}

async fn host_records(
    config: &Config,
    services: &CycleServices,
    dc: &Datacenter,
    perf: &HashMap<Mor, Vec<PerfSample>>,
    timestamp: i64,
) -> Vec<Record> {
    let hosts = dc.hosts.read().await;
    let clusters = dc.clusters.read().await;
    let mut records = Vec::with_capacity(hosts.len());

    for host in hosts.values() {
        let mut attrs = base_attributes(config, dc);
        attrs.insert("hypervisorHostname".to_string(), json!(host.name));
        attrs.insert("overallStatus".to_string(), json!(host.overall_status));
        attrs.insert("connectionState".to_string(), json!(host.connection_state));
        attrs.insert("cpuTotalMHz".to_string(), json!(host.total_cpu_mhz));
        attrs.insert("cpuUsedMHz".to_string(), json!(host.cpu_usage_mhz));
        if host.total_cpu_mhz > 0 {
            let pct = host.cpu_usage_mhz as f64 / host.total_cpu_mhz as f64 * 100.0;
            attrs.insert("cpuPercent".to_string(), json!(pct));
        }
        attrs.insert("memoryTotalMiB".to_string(), json!(host.memory_bytes / MIB));
        attrs.insert("memoryUsedMiB".to_string(), json!(host.memory_usage_mib));
        attrs.insert("vmCount".to_string(), json!(host.vms.len()));
        attrs.insert("datastoreCount".to_string(), json!(host.datastores.len()));
        attrs.insert("networkCount".to_string(), json!(host.networks.len()));

        // Standalone hosts sit under a ComputeResource, not a cluster
        if let Some(parent) = &host.parent
            && parent.kind == EntityKind::ClusterComputeResource
            && let Some(cluster) = clusters.get(parent)
        {
            attrs.insert("clusterName".to_string(), json!(cluster.name));
        }

        add_tag_attributes(&mut attrs, services, &host.mor).await;
        add_perf_attributes(&mut attrs, perf, &host.mor);

        records.push(Record {
            event_type: "VSphereHostSample",
            entity_name: entity_name(config, &host.name, &dc.info.name),
            timestamp,
            attributes: attrs,
        });
    }
    records
}

async fn vm_records(
    config: &Config,
    services: &CycleServices,
    dc: &Datacenter,
    perf: &HashMap<Mor, Vec<PerfSample>>,
    timestamp: i64,
) -> Vec<Record> {
    let vms = dc.vms.read().await;
    let hosts = dc.hosts.read().await;
    let clusters = dc.clusters.read().await;
    let mut records = Vec::with_capacity(vms.len());

    for vm in vms.values() {
        let mut attrs = base_attributes(config, dc);
        attrs.insert("vmDisplayName".to_string(), json!(vm.name));
        attrs.insert("overallStatus".to_string(), json!(vm.overall_status));
        attrs.insert("powerState".to_string(), json!(vm.power_state));
        attrs.insert("coreCount".to_string(), json!(vm.num_cpu));
        attrs.insert("memoryMiB".to_string(), json!(vm.memory_mib));
        if let Some(guest) = &vm.guest_full_name {
            attrs.insert("operatingSystem".to_string(), json!(guest));
        }
        if let Some(hostname) = &vm.guest_hostname {
            attrs.insert("vmHostname".to_string(), json!(hostname));
        }
        if let Some(ip) = &vm.ip_address {
            attrs.insert("ipAddress".to_string(), json!(ip));
        }

        if let Some(host_mor) = &vm.host
            && let Some(host) = hosts.get(host_mor)
        {
            attrs.insert("hypervisorHostname".to_string(), json!(host.name));
            if let Some(parent) = &host.parent
                && parent.kind == EntityKind::ClusterComputeResource
                && let Some(cluster) = clusters.get(parent)
            {
                attrs.insert("clusterName".to_string(), json!(cluster.name));
            }
        }

        // Empty for VMs in the hidden default pool
        if let Some(pool) = &vm.resource_pool {
            let pool_name = dc.resource_pool_name(pool).await;
            if !pool_name.is_empty() {
                attrs.insert("resourcePoolName".to_string(), json!(pool_name));
            }
        }

        add_tag_attributes(&mut attrs, services, &vm.mor).await;
        add_perf_attributes(&mut attrs, perf, &vm.mor);

        records.push(Record {
            event_type: "VSphereVmSample",
            entity_name: entity_name(config, &vm.name, &dc.info.name),
            timestamp,
            attributes: attrs,
        });
    }
    records
}

async fn cluster_records(
    config: &Config,
    services: &CycleServices,
    dc: &Datacenter,
    perf: &HashMap<Mor, Vec<PerfSample>>,
    timestamp: i64,
) -> Vec<Record> {
    let clusters = dc.clusters.read().await;
    let mut records = Vec::with_capacity(clusters.len());

    for cluster in clusters.values() {
        let mut attrs = base_attributes(config, dc);
        attrs.insert("clusterName".to_string(), json!(cluster.name));
        attrs.insert("overallStatus".to_string(), json!(cluster.overall_status));
        attrs.insert("hostCount".to_string(), json!(cluster.num_hosts));
        attrs.insert(
            "effectiveHostCount".to_string(),
            json!(cluster.num_effective_hosts),
        );
        attrs.insert("cpuTotalMHz".to_string(), json!(cluster.total_cpu_mhz));
        attrs.insert("datastoreCount".to_string(), json!(cluster.datastores.len()));
        attrs.insert("networkCount".to_string(), json!(cluster.networks.len()));
        attrs.insert(
            "resourcePoolCount".to_string(),
            json!(dc.find_resource_pools(&cluster.mor).await.len()),
        );

        add_tag_attributes(&mut attrs, services, &cluster.mor).await;
        add_perf_attributes(&mut attrs, perf, &cluster.mor);

        records.push(Record {
            event_type: "VSphereClusterSample",
            entity_name: entity_name(config, &cluster.name, &dc.info.name),
            timestamp,
            attributes: attrs,
        });
    }
    records
}

async fn resource_pool_records(
    config: &Config,
    services: &CycleServices,
    dc: &Datacenter,
    perf: &HashMap<Mor, Vec<PerfSample>>,
    timestamp: i64,
) -> Vec<Record> {
    let pools = dc.resource_pools.read().await;
    let clusters = dc.clusters.read().await;
    let mut records = Vec::new();

    for pool in pools.values() {
        // The implicit root pool of each compute resource is not a
        // user-facing entity
        if dc.is_default_resource_pool(&pool.mor).await {
            continue;
        }

        let mut attrs = base_attributes(config, dc);
        attrs.insert("resourcePoolName".to_string(), json!(pool.name));
        attrs.insert("overallStatus".to_string(), json!(pool.overall_status));
        attrs.insert("cpuUsedMHz".to_string(), json!(pool.cpu_usage_mhz));
        attrs.insert(
            "memoryUsedMiB".to_string(),
            json!(pool.memory_usage_bytes / MIB),
        );
        attrs.insert("vmCount".to_string(), json!(pool.vms.len()));
        if let Some(cluster) = clusters.get(&pool.owner) {
            attrs.insert("clusterName".to_string(), json!(cluster.name));
        } else if let Some(host) = dc.find_host(&pool.owner).await {
            // Pools owned by a standalone compute resource map to its host
            attrs.insert("hypervisorHostname".to_string(), json!(host.name));
        }

        add_tag_attributes(&mut attrs, services, &pool.mor).await;
        add_perf_attributes(&mut attrs, perf, &pool.mor);

        records.push(Record {
            event_type: "VSphereResourcePoolSample",
            entity_name: entity_name(config, &pool.name, &dc.info.name),
            timestamp,
            attributes: attrs,
        });
    }
    records
}

async fn datastore_records(
    config: &Config,
    services: &CycleServices,
    dc: &Datacenter,
    perf: &HashMap<Mor, Vec<PerfSample>>,
    timestamp: i64,
) -> Vec<Record> {
    let datastores = dc.datastores.read().await;
    let mut records = Vec::with_capacity(datastores.len());

    for ds in datastores.values() {
        let mut attrs = base_attributes(config, dc);
        attrs.insert("name".to_string(), json!(ds.name));
        attrs.insert("fileSystemType".to_string(), json!(ds.fs_type));
        attrs.insert("accessible".to_string(), json!(ds.accessible));
        attrs.insert("overallStatus".to_string(), json!(ds.overall_status));
        attrs.insert("url".to_string(), json!(ds.url));
        attrs.insert(
            "capacityGiB".to_string(),
            json!(ds.capacity_bytes as f64 / GIB),
        );
        attrs.insert("freeGiB".to_string(), json!(ds.free_bytes as f64 / GIB));
        attrs.insert(
            "uncommittedGiB".to_string(),
            json!(ds.uncommitted_bytes as f64 / GIB),
        );
        attrs.insert("vmCount".to_string(), json!(ds.vms.len()));
        attrs.insert("hostCount".to_string(), json!(ds.hosts.len()));

        match &ds.backing {
            DatastoreBacking::Nas {
                remote_host,
                remote_path,
            } => {
                attrs.insert("nas.remoteHost".to_string(), json!(remote_host));
                attrs.insert("nas.remotePath".to_string(), json!(remote_path));
            }
            DatastoreBacking::Vmfs { local } => {
                attrs.insert("vmfs.local".to_string(), json!(local));
            }
            DatastoreBacking::Other => {}
        }

        add_tag_attributes(&mut attrs, services, &ds.mor).await;
        add_perf_attributes(&mut attrs, perf, &ds.mor);

        records.push(Record {
            event_type: "VSphereDatastoreSample",
            entity_name: entity_name(config, &ds.name, &dc.info.name),
            timestamp,
            attributes: attrs,
        });
    }
    records
}

async fn network_records(
    config: &Config,
    services: &CycleServices,
    dc: &Datacenter,
    perf: &HashMap<Mor, Vec<PerfSample>>,
    timestamp: i64,
) -> Vec<Record> {
    let networks = dc.networks.read().await;
    let mut records = Vec::with_capacity(networks.len());

    for net in networks.values() {
        let mut attrs = base_attributes(config, dc);
        attrs.insert("name".to_string(), json!(net.name));
        attrs.insert("accessible".to_string(), json!(net.accessible));
        attrs.insert("overallStatus".to_string(), json!(net.overall_status));
        attrs.insert("vmCount".to_string(), json!(net.vms.len()));
        attrs.insert("hostCount".to_string(), json!(net.hosts.len()));

        add_tag_attributes(&mut attrs, services, &net.mor).await;
        add_perf_attributes(&mut attrs, perf, &net.mor);

        records.push(Record {
            event_type: "VSphereNetworkSample",
            entity_name: entity_name(config, &net.name, &dc.info.name),
            timestamp,
            attributes: attrs,
        });
    }
    records
}
