//! Configuration loading and CLI arguments
//!
//! Settings come from three layers: CLI flags, environment variables,
//! and an optional TOML file. Flags win over the file.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use eyre::bail;
use serde::{Deserialize, Serialize};
use vcwatch_inventory::MetricDefinitions;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "vcwatch", version)]
#[command(about = "vSphere inventory and performance collector", long_about = None)]
pub struct Args {
    /// vCenter endpoint, e.g. https://vcenter.example.com
    #[arg(long, env = "VCWATCH_URL")]
    pub url: Option<String>,

    /// vCenter username
    #[arg(long, env = "VCWATCH_USER")]
    pub user: Option<String>,

    /// vCenter password
    #[arg(long, env = "VCWATCH_PASS", hide_env_values = true)]
    pub pass: Option<String>,

    /// Verify the vCenter TLS certificate
    #[arg(long)]
    pub validate_ssl: bool,

    /// Collect tag categories and tags attached to inventory objects
    #[arg(long)]
    pub enable_tags: bool,

    /// Tag filter expression, e.g. "region=eu env=prod"
    ///
    /// Only objects carrying every listed tag are reported. Implies
    /// --enable-tags.
    #[arg(long)]
    pub tag_filter: Option<String>,

    /// Collect performance counters alongside inventory
    #[arg(long)]
    pub enable_perf: bool,

    /// Location label stamped on every reported entity
    #[arg(long)]
    pub datacenter_location: Option<String>,

    /// Seconds between collection cycles (default 60)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Run a single collection cycle and exit
    #[arg(long)]
    pub run_once: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a TOML config file
    #[arg(long, env = "VCWATCH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Optional TOML file mirroring the CLI flags, plus the per-kind
/// performance counter lists which have no flag equivalent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    #[serde(default)]
    pub validate_ssl: bool,
    #[serde(default)]
    pub enable_tags: bool,
    pub tag_filter: Option<String>,
    #[serde(default)]
    pub enable_perf: bool,
    pub datacenter_location: Option<String>,
    pub interval: Option<u64>,
    #[serde(default)]
    pub metrics: MetricDefinitions,
}

impl FileConfig {
    /// Load from an explicit path
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &PathBuf) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Probe the usual locations when no path was given
    fn load_default() -> eyre::Result<Self> {
        let paths = [
            PathBuf::from("vcwatch.toml"),
            PathBuf::from("/etc/vcwatch/vcwatch.toml"),
            dirs::config_dir()
                .map(|p| p.join("vcwatch/vcwatch.toml"))
                .unwrap_or_default(),
        ];

        for path in paths {
            if path.exists() {
                return Self::load(&path);
            }
        }

        Ok(FileConfig::default())
    }
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub user: String,
    pub pass: String,
    pub validate_ssl: bool,
    pub enable_tags: bool,
    pub tag_filter: Option<String>,
    pub enable_perf: bool,
    pub datacenter_location: Option<String>,
    pub interval: Duration,
    pub run_once: bool,
    pub verbose: bool,
    pub metrics: MetricDefinitions,
}

impl Config {
    /// Merge CLI arguments over the config file and validate
    ///
    /// # Errors
    /// Returns error when the file is unreadable or when url, user or
    /// pass end up unset after merging
    pub fn resolve(args: Args) -> eyre::Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::load_default()?,
        };

        let Some(url) = args.url.or(file.url) else {
            bail!("vCenter URL is required (--url or VCWATCH_URL)");
        };
        let Some(user) = args.user.or(file.user) else {
            bail!("vCenter username is required (--user or VCWATCH_USER)");
        };
        let Some(pass) = args.pass.or(file.pass) else {
            bail!("vCenter password is required (--pass or VCWATCH_PASS)");
        };

        let tag_filter = args.tag_filter.or(file.tag_filter);

        Ok(Config {
            url,
            user,
            pass,
            validate_ssl: args.validate_ssl || file.validate_ssl,
            // A filter expression is useless without tag collection
            enable_tags: args.enable_tags || file.enable_tags || tag_filter.is_some(),
            tag_filter,
            enable_perf: args.enable_perf || file.enable_perf,
            datacenter_location: args
                .datacenter_location
                .or(file.datacenter_location)
                .map(|l| l.to_lowercase()),
            // tokio's interval rejects a zero period
            interval: Duration::from_secs(args.interval.or(file.interval).unwrap_or(60).max(1)),
            run_once: args.run_once,
            verbose: args.verbose,
            metrics: file.metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An explicit empty config file keeps resolve() away from the default
    /// path probing, which would otherwise pick up whatever vcwatch.toml
    /// exists on the machine running the tests.
    fn empty_config_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir()
            .join(format!("vcwatch-test-{}-{name}.toml", std::process::id()));
        std::fs::write(&path, "").unwrap();
        path
    }

    fn base_args() -> Args {
        Args {
            url: Some("https://vc.example.com".to_string()),
            user: Some("admin".to_string()),
            pass: Some("secret".to_string()),
            validate_ssl: false,
            enable_tags: false,
            tag_filter: None,
            enable_perf: false,
            datacenter_location: None,
            interval: None,
            run_once: false,
            verbose: false,
            config: None,
        }
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        let mut args = base_args();
        args.config = Some(empty_config_file("missing-credentials"));
        args.pass = None;
        let res = Config::resolve(args);
        assert!(res.is_err());
    }

    #[test]
    fn test_tag_filter_implies_tag_collection() {
        let mut args = base_args();
        args.config = Some(empty_config_file("tag-filter"));
        args.tag_filter = Some("env=prod".to_string());
        let config = Config::resolve(args).unwrap();
        assert!(config.enable_tags);
    }

    #[test]
    fn test_location_is_lowercased() {
        let mut args = base_args();
        args.config = Some(empty_config_file("location"));
        args.datacenter_location = Some("EU-Central".to_string());
        let config = Config::resolve(args).unwrap();
        assert_eq!(config.datacenter_location.as_deref(), Some("eu-central"));
    }

    #[test]
    fn test_file_config_parses_metrics_table() {
        let raw = r#"
            url = "https://vc.example.com"
            enable_perf = true

            [metrics]
            host = ["cpu.usage.average"]
        "#;
        let file: FileConfig = toml::from_str(raw).unwrap();
        assert!(file.enable_perf);
        assert_eq!(file.metrics.host, vec!["cpu.usage.average".to_string()]);
    }
}
