//! Watch mode - the full pipeline on a timer
//!
//! Repeats organize + scan + sync at a fixed interval until interrupted.
//! A failed iteration is logged and the loop carries on; because the diff
//! is hash-based, whatever an interrupted iteration left unrecorded is
//! simply picked up again on the next pass.

use crate::organize;
use crate::rules::{ImageProbe, RuleSet};
use crate::state::SyncState;
use crate::sync::SyncEngine;
use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Parse interval strings like "90s", "30m", "1h", "2d" (bare numbers are
/// seconds) into seconds.
pub fn parse_interval(duration_str: &str) -> Result<u64> {
    let duration_str = duration_str.trim().to_lowercase();

    if let Some(value) = duration_str.strip_suffix('s') {
        value.parse::<u64>().context("Invalid seconds value")
    } else if let Some(value) = duration_str.strip_suffix('m') {
        value
            .parse::<u64>()
            .map(|v| v * 60)
            .context("Invalid minutes value")
    } else if let Some(value) = duration_str.strip_suffix('h') {
        value
            .parse::<u64>()
            .map(|v| v * 3600)
            .context("Invalid hours value")
    } else if let Some(value) = duration_str.strip_suffix('d') {
        value
            .parse::<u64>()
            .map(|v| v * 86400)
            .context("Invalid days value")
    } else {
        duration_str
            .parse::<u64>()
            .context("Invalid duration format. Use format like '30m', '1h', '2d'")
    }
}

/// Run the watch loop until Ctrl+C. `interval_minutes` overrides the
/// configured interval.
pub async fn run(
    engine: &SyncEngine,
    rules: &RuleSet,
    probe: &dyn ImageProbe,
    interval_minutes: Option<u64>,
) -> Result<()> {
    let interval_secs = match interval_minutes {
        Some(minutes) => minutes * 60,
        None => parse_interval(&engine.config().watch.interval)
            .context("Failed to parse watch interval")?,
    };

    let mut timer = interval(Duration::from_secs(interval_secs));

    info!("Watching every {}s; Ctrl+C to stop", interval_secs);

    loop {
        // Interruption lands between iterations, never mid-fetch
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; exiting watch loop");
                break;
            }
            _ = timer.tick() => {
                if let Err(e) = run_iteration(engine, rules, probe).await {
                    error!("Watch iteration failed: {:#}", e);
                }
            }
        }
    }

    Ok(())
}

/// One watch iteration: organize local strays, then scan and sync remotes.
async fn run_iteration(
    engine: &SyncEngine,
    rules: &RuleSet,
    probe: &dyn ImageProbe,
) -> Result<()> {
    let config = engine.config();
    let mut state = SyncState::load(&config.state_file());

    let moves = organize::organize(config, rules, probe, true)?;
    if !moves.is_empty() {
        info!("Organized {} local file(s)", moves.len());
        state.last_organize = Some(Utc::now());
        state.save(&config.state_file())?;
    }

    let scan = engine.scan(None).await?;
    let plan = engine.plan(&scan.assets, &state);

    if plan.is_empty() {
        info!("No changes detected");
        return Ok(());
    }

    let summary = engine.apply(plan, &mut state).await?;
    info!(
        "Watch iteration synced {} asset(s), {} failed",
        summary.synced.len(),
        summary.failed.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_units() {
        assert_eq!(parse_interval("90s").unwrap(), 90);
        assert_eq!(parse_interval("30m").unwrap(), 1800);
        assert_eq!(parse_interval("1h").unwrap(), 3600);
        assert_eq!(parse_interval("2d").unwrap(), 172800);
        assert_eq!(parse_interval("45").unwrap(), 45);
    }

    #[test]
    fn test_parse_interval_rejects_garbage() {
        assert!(parse_interval("soon").is_err());
        assert!(parse_interval("m30").is_err());
        assert!(parse_interval("").is_err());
    }

    #[test]
    fn test_parse_interval_trims_and_lowercases() {
        assert_eq!(parse_interval(" 10M ").unwrap(), 600);
    }
}
