//! Per-kind performance counter configuration
//!
//! Hosts and virtual machines sample at the 20-second real-time interval;
//! every other kind uses the five-minute historical rollup.

use serde::{Deserialize, Serialize};

use vcwatch_client::{EntityKind, PerfInterval};

/// Counter names to request per entity kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDefinitions {
    /// Host counters
    #[serde(default)]
    pub host: Vec<String>,
    /// Virtual machine counters
    #[serde(default)]
    pub vm: Vec<String>,
    /// Cluster counters
    #[serde(default)]
    pub cluster: Vec<String>,
    /// Resource pool counters
    #[serde(default)]
    pub resource_pool: Vec<String>,
    /// Datastore counters
    #[serde(default)]
    pub datastore: Vec<String>,
    /// Network counters
    #[serde(default)]
    pub network: Vec<String>,
}

impl Default for MetricDefinitions {
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| (*s).to_string()).collect()
        }
        Self {
            host: names(&[
                "cpu.usage.average",
                "mem.usage.average",
                "net.usage.average",
                "disk.usage.average",
            ]),
            vm: names(&[
                "cpu.usage.average",
                "cpu.ready.summation",
                "mem.usage.average",
                "net.usage.average",
            ]),
            cluster: names(&["cpu.usagemhz.average", "mem.usage.average"]),
            resource_pool: names(&["cpu.usagemhz.average", "mem.usage.average"]),
            datastore: names(&["disk.used.latest", "disk.provisioned.latest"]),
            network: Vec::new(),
        }
    }
}

impl MetricDefinitions {
    /// Counter names configured for the given kind
    #[must_use]
    pub fn counters_for(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::HostSystem => &self.host,
            EntityKind::VirtualMachine => &self.vm,
            EntityKind::ClusterComputeResource => &self.cluster,
            EntityKind::ResourcePool => &self.resource_pool,
            EntityKind::Datastore => &self.datastore,
            EntityKind::Network => &self.network,
            EntityKind::Datacenter | EntityKind::Folder => &[],
        }
    }
}

/// Sampling interval appropriate for the kind
#[must_use]
pub fn interval_for(kind: EntityKind) -> PerfInterval {
    match kind {
        EntityKind::HostSystem | EntityKind::VirtualMachine => PerfInterval::RealTime,
        _ => PerfInterval::FiveMinutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_per_kind() {
        assert_eq!(interval_for(EntityKind::HostSystem), PerfInterval::RealTime);
        assert_eq!(
            interval_for(EntityKind::VirtualMachine),
            PerfInterval::RealTime
        );
        assert_eq!(
            interval_for(EntityKind::ResourcePool),
            PerfInterval::FiveMinutes
        );
        assert_eq!(interval_for(EntityKind::Datastore), PerfInterval::FiveMinutes);
    }

    #[test]
    fn test_defaults_cover_kinds_with_counters() {
        let defs = MetricDefinitions::default();
        assert!(!defs.counters_for(EntityKind::HostSystem).is_empty());
        assert!(!defs.counters_for(EntityKind::VirtualMachine).is_empty());
        assert!(defs.counters_for(EntityKind::Datacenter).is_empty());
    }
}
