//! vcwatch
//!
//! Polls a vCenter for its inventory, tags and performance counters and
//! publishes one JSON record per entity to stdout.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vcwatch_client::{RestInventoryClient, RestSession, RestTaggingClient, TaggingService};
use vcwatch_inventory::{CycleServices, TagCache, collect_inventory};

mod config;
mod process;

use config::{Args, Config};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = Config::resolve(Args::parse())?;

    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        // Stdout carries the published records
        .with_writer(std::io::stderr)
        .init();

    if config.enable_perf {
        warn!(
            "performance counters need the PerformanceManager endpoint, \
             which the Automation API does not expose; continuing without counters"
        );
    }

    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        run_cycle(&config).await?;
        if config.run_once {
            break;
        }
    }

    Ok(())
}

/// One full collection cycle: connect, discover, enrich, publish
async fn run_cycle(config: &Config) -> Result<()> {
    let session = Arc::new(
        RestSession::login(&config.url, &config.user, &config.pass, config.validate_ssl).await?,
    );

    let services = Arc::new(CycleServices {
        view_manager: Arc::new(RestInventoryClient::new(Arc::clone(&session))),
        tags: build_tag_cache(config, &session).await,
        perf: None,
        metrics: config.metrics.clone(),
    });

    // A failed discovery skips the cycle; the next tick retries
    match collect_inventory(Arc::clone(&services)).await {
        Ok(outcome) => {
            for task_error in &outcome.task_errors {
                error!(error = %task_error, "collection task failed");
            }
            info!(datacenters = outcome.datacenters.len(), "inventory collected");

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            process::publish(&mut out, config, &services, &outcome.datacenters).await?;
            out.flush()?;
        }
        Err(e) => error!(error = %e, "datacenter discovery failed, skipping cycle"),
    }

    if let Err(e) = session.logout().await {
        warn!(error = %e, "failed to release session");
    }

    Ok(())
}

/// Build and populate the tag cache when tag collection is enabled.
/// A tagging outage degrades the cycle to plain inventory.
async fn build_tag_cache(config: &Config, session: &Arc<RestSession>) -> Option<Arc<TagCache>> {
    if !config.enable_tags {
        return None;
    }

    let service =
        Arc::new(RestTaggingClient::new(Arc::clone(session))) as Arc<dyn TaggingService>;
    let mut cache = TagCache::new(service);

    match cache.build_cache().await {
        Ok(()) => {
            if let Some(expr) = &config.tag_filter {
                cache.parse_filter_expression(expr);
            }
            Some(Arc::new(cache))
        }
        Err(e) => {
            error!(error = %e, "failed to build tag cache, collecting without tags");
            None
        }
    }
}
