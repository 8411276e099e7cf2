//! Cache inspection and invalidation CLI commands.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use creatorhub_cache::invalidation::PatternOutcome;
use creatorhub_cache::{
    CacheCoordinator, CacheStatsSnapshot, InvalidationEvent, PatternInvalidation, RemoteOutcome,
};
use creatorhub_core::config::AppConfig;
use creatorhub_core::error::AppError;

/// Arguments for cache commands
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// How long to wait for Redis before falling back to the local tier
    #[arg(long, default_value_t = 2000)]
    pub wait_ms: u64,

    /// Cache subcommand
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache subcommands
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show remote tier status and latency
    Status,
    /// Print the cached value for a key
    Get {
        /// Cache key
        key: String,
    },
    /// Remove every key matching a glob pattern
    Invalidate {
        /// Pattern where `*` matches any run of characters
        pattern: String,
    },
    /// Purge everything an entity mutation makes stale
    Purge {
        #[command(subcommand)]
        target: PurgeTarget,
    },
    /// Time a miss followed by a hit through `get_or_compute`
    Probe {
        /// Key to probe
        #[arg(default_value = "creators:list:limit=20&page=0")]
        key: String,
        /// Simulated loader latency
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
        /// TTL for the probe entry in seconds; defaults to the TTL of the
        /// key's category
        #[arg(long)]
        ttl: Option<u64>,
    },
}

/// Entity whose cache entries should be purged
#[derive(Debug, Subcommand)]
pub enum PurgeTarget {
    /// A creator was changed
    Creator {
        /// Creator ID
        id: Uuid,
    },
    /// A post was changed
    Post {
        /// Post ID
        id: Uuid,
    },
    /// A like, follow, or comment was made
    Social {
        /// Acting user ID
        user: Uuid,
        /// Post the interaction was on
        #[arg(long)]
        post: Option<Uuid>,
    },
}

impl PurgeTarget {
    fn event(&self) -> InvalidationEvent {
        match *self {
            Self::Creator { id } => InvalidationEvent::Creator { creator_id: id },
            Self::Post { id } => InvalidationEvent::Post { post_id: id },
            Self::Social { user, post } => InvalidationEvent::Social {
                user_id: user,
                post_id: post,
            },
        }
    }
}

/// Status summary
#[derive(Debug, Serialize)]
struct CacheStatus {
    context: String,
    remote: String,
    ping: Option<String>,
}

/// Pattern purge display row
#[derive(Debug, Serialize, Tabled)]
struct PurgeRow {
    /// Pattern
    pattern: String,
    /// Remote result
    remote: String,
}

impl PurgeRow {
    fn new(pattern: &str, result: &PatternInvalidation) -> Self {
        Self {
            pattern: pattern.to_string(),
            remote: describe_remote(result.remote),
        }
    }
}

/// Timing display row
#[derive(Debug, Serialize, Tabled)]
struct TimingRow {
    /// Call number
    call: usize,
    /// Where the value came from
    source: &'static str,
    /// Elapsed milliseconds
    elapsed_ms: u128,
}

/// Outcome of a timed miss followed by a hit, with this process's counters.
#[derive(Debug, Serialize)]
struct TimingReport {
    calls: Vec<TimingRow>,
    cached: bool,
    local_entries: usize,
    stats: CacheStatsSnapshot,
}

/// Execute cache commands
pub async fn execute(
    args: &CacheArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let cache = super::build_cache(config, Duration::from_millis(args.wait_ms)).await?;
    let result = run(&args.command, &cache, format).await;
    cache.shutdown();
    result
}

async fn run(
    command: &CacheCommand,
    cache: &CacheCoordinator,
    format: OutputFormat,
) -> Result<(), AppError> {
    match command {
        CacheCommand::Status => status(cache, format).await,
        CacheCommand::Get { key } => {
            match cache.read_raw(key).await {
                Some(raw) => {
                    let value = serde_json::from_str::<serde_json::Value>(&raw)
                        .unwrap_or(serde_json::Value::String(raw));
                    output::print_item(&json!({ "key": key, "value": value }), format);
                }
                None => output::print_warning(&format!("'{}' is not cached", key)),
            }
            Ok(())
        }
        CacheCommand::Invalidate { pattern } => {
            let result = cache.invalidate_pattern(pattern).await;
            output::print_list(&[PurgeRow::new(pattern, &result)], format);
            if !result.remote_invalidated() {
                output::print_warning("Remote tier was not purged");
            }
            Ok(())
        }
        CacheCommand::Purge { target } => {
            let event = target.event();
            let report = cache.invalidate_entity(&event).await;
            let rows: Vec<PurgeRow> = report
                .outcomes
                .iter()
                .map(|PatternOutcome { pattern, result }| PurgeRow::new(pattern, result))
                .collect();
            output::print_list(&rows, format);

            if report.fully_invalidated() {
                output::print_success(&format!(
                    "Purged {} ({} remote keys)",
                    event,
                    report.remote_removed()
                ));
            } else {
                output::print_warning(&format!("Purge of {} was incomplete on the remote tier", event));
            }
            Ok(())
        }
        CacheCommand::Probe { key, delay_ms, ttl } => {
            let ttl = ttl.map_or(Duration::ZERO, Duration::from_secs);
            let report = time_miss_then_hit(cache, key, Duration::from_millis(*delay_ms), ttl).await?;
            print_timing(&report, format);
            Ok(())
        }
    }
}

async fn status(cache: &CacheCoordinator, format: OutputFormat) -> Result<(), AppError> {
    let remote = cache.remote_status();
    let ping = match remote {
        None => None,
        Some(_) => Some(match cache.ping_remote().await {
            Ok(elapsed) => format!("{}ms", elapsed.as_millis()),
            Err(e) => format!("failed: {}", e),
        }),
    };

    let status = CacheStatus {
        context: cache.context().to_string(),
        remote: remote.map_or_else(|| "none".to_string(), |s| s.to_string()),
        ping,
    };

    match format {
        OutputFormat::Json => output::print_item(&status, format),
        OutputFormat::Table => {
            output::print_kv("Context", &status.context);
            output::print_kv("Remote", &status.remote);
            if let Some(ping) = &status.ping {
                output::print_kv("Ping", ping);
            }
        }
    }
    Ok(())
}

async fn time_miss_then_hit(
    cache: &CacheCoordinator,
    key: &str,
    delay: Duration,
    ttl: Duration,
) -> Result<TimingReport, AppError> {
    cache.invalidate(key).await;
    let loads = AtomicUsize::new(0);
    let mut calls = Vec::with_capacity(2);
    let mut payloads = Vec::with_capacity(2);

    for call in 1..=2 {
        let before = loads.load(Ordering::SeqCst);
        let started = Instant::now();
        let payload = cache
            .get_or_compute(key, ttl, || slow_load(&loads, delay))
            .await?;
        calls.push(TimingRow {
            call,
            source: if loads.load(Ordering::SeqCst) > before {
                "loader"
            } else {
                "cache"
            },
            elapsed_ms: started.elapsed().as_millis(),
        });
        payloads.push(payload);
    }

    Ok(TimingReport {
        calls,
        cached: payloads[0] == payloads[1],
        local_entries: cache.local().len(),
        stats: cache.stats(),
    })
}

fn print_timing(report: &TimingReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_item(report, format),
        OutputFormat::Table => {
            output::print_list(&report.calls, format);
            output::print_kv("Loader calls", &report.stats.loads.to_string());
            output::print_kv(
                "Hits (remote/local)",
                &format!("{}/{}", report.stats.remote_hits, report.stats.local_hits),
            );
            output::print_kv("Hit rate", &format!("{:.1}%", report.stats.hit_rate() * 100.0));
            output::print_kv("Local entries", &report.local_entries.to_string());
            if report.cached {
                output::print_success("Second call returned the cached payload");
            } else {
                output::print_warning("Payloads differ; the value was not cached");
            }
        }
    }
}

/// Stand-in for a slow backend query.
async fn slow_load(calls: &AtomicUsize, delay: Duration) -> Result<serde_json::Value, AppError> {
    calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(delay).await;
    Ok(json!({
        "data": ["probe-creator-1", "probe-creator-2"],
        "has_more": false,
        "probe_id": Uuid::new_v4(),
    }))
}

fn describe_remote(outcome: RemoteOutcome) -> String {
    match outcome {
        RemoteOutcome::Purged { removed } => format!("purged {}", removed),
        RemoteOutcome::Unavailable => "unavailable".to_string(),
        RemoteOutcome::Failed => "failed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creatorhub_cache::{LocalCache, TtlPolicy};

    #[tokio::test]
    async fn test_miss_then_hit_reports_process_counters() {
        let cache = CacheCoordinator::new(LocalCache::with_capacity(10), TtlPolicy::default());
        let report = time_miss_then_hit(&cache, "creators:list:limit=20&page=0", Duration::ZERO, Duration::ZERO)
            .await
            .unwrap();

        let sources: Vec<_> = report.calls.iter().map(|row| row.source).collect();
        assert_eq!(sources, ["loader", "cache"]);
        assert!(report.cached);
        assert_eq!(report.stats.loads, 1);
        assert_eq!(report.stats.local_hits, 1);
        assert_eq!(report.local_entries, 1);
    }

    #[test]
    fn test_purge_row_shows_remote_outcome() {
        let result = PatternInvalidation {
            remote: RemoteOutcome::Purged { removed: 3 },
            local_removed: 2,
        };
        let row = PurgeRow::new("posts:list:*", &result);
        assert_eq!(row.remote, "purged 3");

        let result = PatternInvalidation {
            remote: RemoteOutcome::Unavailable,
            local_removed: 0,
        };
        assert_eq!(PurgeRow::new("post:1", &result).remote, "unavailable");
    }
}
