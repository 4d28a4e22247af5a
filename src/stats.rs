//! Ledger statistics and health overview.
//!
//! Per-provider status counts, the most recent tracking entry, and entries
//! stuck in `processing`. Used by `loader stats` to confirm scans are
//! landing and to spot files that need `loader release`.

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::models::{Provider, StatusCounts, TrackingEntry};
use crate::store::Store;

/// Ledger summary for one provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderReport {
    pub provider: Provider,
    pub counts: StatusCounts,
    pub latest: Option<TrackingEntry>,
    /// `processing` entries older than the stuck threshold.
    pub stuck: Vec<TrackingEntry>,
}

pub async fn provider_report(
    store: &dyn Store,
    provider: Provider,
    stuck_after_secs: u64,
) -> Result<ProviderReport> {
    let counts = store.statistics(provider).await?;
    let latest = store.latest(provider).await?;
    let cutoff = stuck_cutoff(Utc::now(), stuck_after_secs)?;
    let stuck = store.stale_processing(provider, cutoff).await?;

    Ok(ProviderReport {
        provider,
        counts,
        latest,
        stuck,
    })
}

/// The instant before which a `processing` entry counts as stuck.
fn stuck_cutoff(now: DateTime<Utc>, stuck_after_secs: u64) -> Result<DateTime<Utc>> {
    i64::try_from(stuck_after_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| anyhow!("stuck threshold of {}s is out of range", stuck_after_secs))
}

/// One report per provider, in the order given.
pub async fn report(
    store: &dyn Store,
    providers: &[Provider],
    stuck_after_secs: u64,
) -> Result<Vec<ProviderReport>> {
    let mut reports = Vec::with_capacity(providers.len());
    for provider in providers {
        reports.push(provider_report(store, *provider, stuck_after_secs).await?);
    }
    Ok(reports)
}

/// Run the stats command: query the ledger and print a summary.
pub async fn run_stats(
    config: &Config,
    store: &dyn Store,
    provider: Option<Provider>,
    json: bool,
) -> Result<()> {
    let providers = match provider {
        Some(p) => vec![p],
        None => config.intake.enabled_providers(),
    };
    let reports = report(store, &providers, config.loader.stuck_after_secs).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("Snapshot Loader: Ledger Stats");
    println!("=============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!();
    println!(
        "  {:<10} {:>8} {:>8} {:>11}   {:<28} {}",
        "PROVIDER", "SUCCESS", "FAILED", "PROCESSING", "LATEST FILE", "WHEN"
    );
    println!("  {}", "-".repeat(84));

    for r in &reports {
        let (latest_file, latest_when) = match &r.latest {
            Some(entry) => (
                format!("{} ({})", entry.filename, entry.status),
                format_ts_relative(entry.processed_at),
            ),
            None => ("-".to_string(), "never".to_string()),
        };
        println!(
            "  {:<10} {:>8} {:>8} {:>11}   {:<28} {}",
            r.provider,
            r.counts.success,
            r.counts.failed,
            r.counts.processing,
            latest_file,
            latest_when
        );
    }

    let stuck: Vec<&TrackingEntry> = reports.iter().flat_map(|r| r.stuck.iter()).collect();
    if !stuck.is_empty() {
        println!();
        println!("  Stuck in processing (release with `loader release <provider> <filename>`):");
        for entry in stuck {
            println!(
                "    {}/{}   since {}",
                entry.provider,
                entry.filename,
                format_ts_iso(entry.processed_at)
            );
        }
    }

    println!();
    Ok(())
}

/// Format a timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: DateTime<Utc>) -> String {
    let delta = (Utc::now() - ts).num_seconds();

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
