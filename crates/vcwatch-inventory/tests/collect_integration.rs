//! Collection cycle integration tests against the in-memory simulator

use std::collections::BTreeSet;
use std::sync::Arc;

use vcwatch_client::{
    ClusterRecord, DatastoreBacking, DatastoreRecord, EntityKind, HostRecord, Mor, NetworkRecord,
    PerfProvider, ResourcePoolRecord, SimClient, SimDatacenter, TaggingService, ViewManager,
    VmRecord,
};
use vcwatch_inventory::collect::{COLLECTED_KINDS, collect_inventory, collect_kind, discover_datacenters};
use vcwatch_inventory::{CycleServices, Datacenter, MetricDefinitions, TagCache};

fn host(value: &str, parent: &Mor) -> HostRecord {
    HostRecord {
        mor: Mor::new(EntityKind::HostSystem, value),
        name: value.to_string(),
        parent: Some(parent.clone()),
        overall_status: "green".to_string(),
        total_cpu_mhz: 48_000,
        cpu_usage_mhz: 12_000,
        memory_bytes: 256 * (1 << 30),
        memory_usage_mib: 64 * 1024,
        connection_state: "connected".to_string(),
        vms: Vec::new(),
        datastores: Vec::new(),
        networks: Vec::new(),
    }
}

fn vm(value: &str) -> VmRecord {
    VmRecord {
        mor: Mor::new(EntityKind::VirtualMachine, value),
        name: value.to_string(),
        overall_status: "green".to_string(),
        power_state: "poweredOn".to_string(),
        resource_pool: None,
        host: None,
        guest_full_name: None,
        guest_hostname: None,
        ip_address: None,
        num_cpu: 2,
        memory_mib: 4096,
    }
}

fn seeded_dc(i: usize) -> SimDatacenter {
    let mut dc = SimDatacenter::new(format!("datacenter-{i}"), format!("dc-{i}"));
    let cluster_mor = Mor::new(EntityKind::ClusterComputeResource, format!("domain-c{i}"));
    let root_pool_mor = Mor::new(EntityKind::ResourcePool, format!("resgroup-{i}-root"));
    let child_pool_mor = Mor::new(EntityKind::ResourcePool, format!("resgroup-{i}-child"));

    dc.hosts.push(host(&format!("host-{i}-1"), &cluster_mor));
    dc.hosts.push(host(&format!("host-{i}-2"), &cluster_mor));

    dc.clusters.push(ClusterRecord {
        mor: cluster_mor.clone(),
        name: format!("cluster-{i}"),
        overall_status: "green".to_string(),
        hosts: vec![
            Mor::new(EntityKind::HostSystem, format!("host-{i}-1")),
            Mor::new(EntityKind::HostSystem, format!("host-{i}-2")),
        ],
        datastores: Vec::new(),
        networks: Vec::new(),
        resource_pool: Some(root_pool_mor.clone()),
        total_cpu_mhz: 96_000,
        num_hosts: 2,
        num_effective_hosts: 2,
    });

    dc.resource_pools.push(ResourcePoolRecord {
        mor: root_pool_mor.clone(),
        name: "Resources".to_string(),
        owner: cluster_mor.clone(),
        parent: Some(cluster_mor.clone()),
        child_pools: vec![child_pool_mor.clone()],
        vms: Vec::new(),
        overall_status: "green".to_string(),
        cpu_usage_mhz: 0,
        memory_usage_bytes: 0,
    });
    dc.resource_pools.push(ResourcePoolRecord {
        mor: child_pool_mor,
        name: format!("pool-{i}"),
        owner: cluster_mor,
        parent: Some(root_pool_mor),
        child_pools: Vec::new(),
        vms: Vec::new(),
        overall_status: "green".to_string(),
        cpu_usage_mhz: 0,
        memory_usage_bytes: 0,
    });

    dc.datastores.push(DatastoreRecord {
        mor: Mor::new(EntityKind::Datastore, format!("datastore-{i}")),
        name: format!("nfs-{i}"),
        fs_type: "NFS".to_string(),
        url: format!("ds:///vmfs/volumes/{i}/"),
        accessible: true,
        overall_status: "green".to_string(),
        capacity_bytes: 500 * (1 << 30),
        free_bytes: 200 * (1 << 30),
        uncommitted_bytes: 50 * (1 << 30),
        vms: Vec::new(),
        hosts: Vec::new(),
        backing: DatastoreBacking::Nas {
            remote_host: "filer.example".to_string(),
            remote_path: format!("/export/{i}"),
        },
    });

    dc.networks.push(NetworkRecord {
        mor: Mor::new(EntityKind::Network, format!("network-{i}")),
        name: format!("vlan-{i}"),
        accessible: true,
        overall_status: "green".to_string(),
        vms: Vec::new(),
        hosts: Vec::new(),
    });

    dc.vms.push(vm(&format!("vm-{i}-1")));
    dc.vms.push(vm(&format!("vm-{i}-2")));

    dc
}

fn seeded_sim() -> SimClient {
    SimClient::new()
        .with_datacenter(seeded_dc(1))
        .with_datacenter(seeded_dc(2))
        .with_datacenter(seeded_dc(3))
}

fn services(sim: &Arc<SimClient>, tags: Option<Arc<TagCache>>, perf: bool) -> Arc<CycleServices> {
    Arc::new(CycleServices {
        view_manager: Arc::clone(sim) as Arc<dyn ViewManager>,
        tags,
        perf: perf.then(|| Arc::clone(sim) as Arc<dyn PerfProvider>),
        metrics: MetricDefinitions::default(),
    })
}

async fn registry_keys(dc: &Datacenter, kind: EntityKind) -> BTreeSet<String> {
    match kind {
        EntityKind::HostSystem => dc.hosts.read().await.keys().map(|m| m.value.clone()).collect(),
        EntityKind::ClusterComputeResource => {
            dc.clusters.read().await.keys().map(|m| m.value.clone()).collect()
        }
        EntityKind::ResourcePool => dc
            .resource_pools
            .read()
            .await
            .keys()
            .map(|m| m.value.clone())
            .collect(),
        EntityKind::Datastore => dc
            .datastores
            .read()
            .await
            .keys()
            .map(|m| m.value.clone())
            .collect(),
        EntityKind::Network => dc.networks.read().await.keys().map(|m| m.value.clone()).collect(),
        EntityKind::VirtualMachine => {
            dc.vms.read().await.keys().map(|m| m.value.clone()).collect()
        }
        _ => BTreeSet::new(),
    }
}

#[tokio::test]
async fn test_concurrent_matches_sequential() {
    let sim = Arc::new(seeded_sim());

    // Concurrent cycle.
    let outcome = collect_inventory(services(&sim, None, false)).await.unwrap();
    assert!(outcome.task_errors.is_empty());

    // Same backend, one kind at a time.
    let seq_services = services(&sim, None, false);
    let sequential = discover_datacenters(&seq_services).await.unwrap();
    for kind in COLLECTED_KINDS {
        collect_kind(kind, &seq_services, &sequential).await.unwrap();
    }

    assert_eq!(outcome.datacenters.len(), sequential.len());
    for (concurrent_dc, sequential_dc) in outcome.datacenters.iter().zip(sequential.iter()) {
        for kind in COLLECTED_KINDS {
            assert_eq!(
                registry_keys(concurrent_dc, kind).await,
                registry_keys(sequential_dc, kind).await,
                "registry mismatch for {kind} in {}",
                concurrent_dc.info.name
            );
        }
    }
}

#[tokio::test]
async fn test_no_lost_writes_across_tasks() {
    let sim = Arc::new(seeded_sim());
    let outcome = collect_inventory(services(&sim, None, false)).await.unwrap();

    for dc in &outcome.datacenters {
        assert_eq!(dc.hosts.read().await.len(), 2, "{}", dc.info.name);
        assert_eq!(dc.clusters.read().await.len(), 1);
        assert_eq!(dc.resource_pools.read().await.len(), 2);
        assert_eq!(dc.datastores.read().await.len(), 1);
        assert_eq!(dc.networks.read().await.len(), 1);
        assert_eq!(dc.vms.read().await.len(), 2);
    }
}

#[tokio::test]
async fn test_failing_view_skips_only_that_unit() {
    let failing_dc = Mor::new(EntityKind::Datacenter, "datacenter-2");
    let sim = Arc::new(
        seeded_sim().with_failing_view(failing_dc.clone(), EntityKind::HostSystem),
    );

    let outcome = collect_inventory(services(&sim, None, false)).await.unwrap();
    // Per-datacenter failures are skipped inside the task, not surfaced as
    // task errors.
    assert!(outcome.task_errors.is_empty());

    for dc in &outcome.datacenters {
        if dc.info.mor == failing_dc {
            assert!(dc.hosts.read().await.is_empty(), "failed unit must stay empty");
        } else {
            assert_eq!(dc.hosts.read().await.len(), 2, "{}", dc.info.name);
        }
        // Sibling kinds in the failing datacenter are unaffected.
        assert_eq!(dc.vms.read().await.len(), 2);
        assert_eq!(dc.datastores.read().await.len(), 1);
    }
}

#[tokio::test]
async fn test_kind_failing_everywhere_surfaces_a_task_error() {
    let sim = Arc::new(
        seeded_sim()
            .with_failing_view(
                Mor::new(EntityKind::Datacenter, "datacenter-1"),
                EntityKind::Network,
            )
            .with_failing_view(
                Mor::new(EntityKind::Datacenter, "datacenter-2"),
                EntityKind::Network,
            )
            .with_failing_view(
                Mor::new(EntityKind::Datacenter, "datacenter-3"),
                EntityKind::Network,
            ),
    );

    let outcome = collect_inventory(services(&sim, None, false)).await.unwrap();
    assert_eq!(outcome.task_errors.len(), 1);
    assert!(outcome.task_errors[0].to_string().contains("Network"));

    // The other kinds are untouched.
    for dc in &outcome.datacenters {
        assert!(dc.networks.read().await.is_empty());
        assert_eq!(dc.vms.read().await.len(), 2);
    }
}

#[tokio::test]
async fn test_every_created_view_is_destroyed() {
    let sim = Arc::new(
        seeded_sim().with_failing_view(
            Mor::new(EntityKind::Datacenter, "datacenter-1"),
            EntityKind::Network,
        ),
    );

    collect_inventory(services(&sim, None, false)).await.unwrap();

    assert!(sim.views_created() > 0);
    assert_eq!(sim.views_created(), sim.views_destroyed());
}

#[tokio::test]
async fn test_failing_retrieval_still_destroys_its_view() {
    let failing_dc = Mor::new(EntityKind::Datacenter, "datacenter-3");
    let sim = Arc::new(
        seeded_sim().with_failing_retrieval(failing_dc.clone(), EntityKind::VirtualMachine),
    );

    let outcome = collect_inventory(services(&sim, None, false)).await.unwrap();
    assert_eq!(sim.views_created(), sim.views_destroyed());

    for dc in &outcome.datacenters {
        if dc.info.mor == failing_dc {
            assert!(dc.vms.read().await.is_empty());
        } else {
            assert_eq!(dc.vms.read().await.len(), 2, "{}", dc.info.name);
        }
    }
}

#[tokio::test]
async fn test_tag_filter_drops_unmatched_objects() {
    let kept = Mor::new(EntityKind::VirtualMachine, "vm-1-1");
    let sim = Arc::new(
        seeded_sim()
            .with_category("urn:c1", "env")
            .with_tag("urn:t1", "prod", "urn:c1")
            .with_attachment(kept.clone(), "urn:t1"),
    );

    let mut cache = TagCache::new(Arc::clone(&sim) as Arc<dyn TaggingService>);
    cache.build_cache().await.unwrap();
    cache.parse_filter_expression("env=prod");

    let outcome = collect_inventory(services(&sim, Some(Arc::new(cache)), false))
        .await
        .unwrap();

    for dc in &outcome.datacenters {
        let vms = dc.vms.read().await;
        if dc.info.mor.value == "datacenter-1" {
            assert_eq!(vms.len(), 1);
            assert!(vms.contains_key(&kept));
        } else {
            assert!(vms.is_empty(), "untagged VMs must be filtered out");
        }
        // Untagged kinds are filtered too when filtering is on.
        assert!(dc.hosts.read().await.is_empty());
    }
}

#[tokio::test]
async fn test_tagging_outage_does_not_block_collection() {
    let sim = Arc::new(seeded_sim().with_tagging_down());

    // Cache build fails; the cycle proceeds without enrichment, the way the
    // caller wires it when build_cache errors.
    let mut cache = TagCache::new(Arc::clone(&sim) as Arc<dyn TaggingService>);
    assert!(cache.build_cache().await.is_err());

    let outcome = collect_inventory(services(&sim, None, false)).await.unwrap();
    for dc in &outcome.datacenters {
        assert_eq!(dc.vms.read().await.len(), 2);
    }
}

#[tokio::test]
async fn test_perf_samples_attached_per_datacenter() {
    let sim = Arc::new(seeded_sim());
    let outcome = collect_inventory(services(&sim, None, true)).await.unwrap();

    for dc in &outcome.datacenters {
        let samples = dc.perf_samples.lock().await;
        assert!(!samples.is_empty(), "{}", dc.info.name);
        // Samples only reference objects that live in this datacenter's
        // registries.
        for sample in samples.iter() {
            assert!(
                sample.object.value.contains(&dc.info.mor.value["datacenter-".len()..]),
                "sample for {} in {}",
                sample.object,
                dc.info.name
            );
        }
    }
}
