//! Single-task driver: frames, snapshot polling and shutdown share one
//! `select!` loop, so a snapshot is always applied between two frames.

use std::future::Future;
use std::time::Duration;

use foundation::time::Time;
use scene::host::SceneHost;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at, sleep};
use tracing::{debug, info, warn};
use tracking::snapshot::Snapshot;
use tracking::view::GlobeView;

use crate::fetch::{FetchError, fetch_snapshot};

/// Polls that may be outstanding at once; later polls are skipped.
const MAX_IN_FLIGHT: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct DriverOptions {
    pub url: String,
    pub frame_interval: Duration,
    pub poll_interval: Duration,
    pub stats_interval: Duration,
    pub run_for: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub snapshots_applied: u64,
    pub fetch_failures: u64,
    pub polls_skipped: u64,
}

fn engine_time(start: Instant) -> Time {
    Time::from_secs(start.elapsed().as_secs_f64())
}

/// Runs until `shutdown` resolves or `run_for` elapses. In-flight fetches
/// are aborted before returning.
pub async fn run<H, F>(
    view: &mut GlobeView<H>,
    client: reqwest::Client,
    opts: &DriverOptions,
    shutdown: F,
) -> RunSummary
where
    H: SceneHost,
    F: Future<Output = ()>,
{
    let start = Instant::now();
    let mut frames = interval(opts.frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut polls = interval(opts.poll_interval);
    polls.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats = interval_at(start + opts.stats_interval, opts.stats_interval);

    let (tx, mut rx) = mpsc::channel::<Result<Snapshot, FetchError>>(4);
    let mut fetches: JoinSet<()> = JoinSet::new();

    let run_for = opts.run_for;
    let deadline = async move {
        match run_for {
            Some(d) => sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    tokio::pin!(shutdown);

    let mut summary = RunSummary::default();
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            _ = &mut deadline => {
                info!("run duration elapsed");
                break;
            }
            Some(result) = rx.recv() => match result {
                Ok(snapshot) => {
                    let report = view.apply_snapshot(&snapshot, engine_time(start));
                    summary.snapshots_applied += 1;
                    debug!(
                        created = report.created.len(),
                        updated = report.updated.len(),
                        removed = report.removed.len(),
                        skipped = report.skipped.len(),
                        "snapshot applied"
                    );
                    for event in view.events_mut().drain() {
                        debug!(frame = event.frame_index, kind = ?event.kind, "engine event");
                    }
                }
                Err(err) => {
                    summary.fetch_failures += 1;
                    warn!("snapshot fetch failed, keeping previous state: {err}");
                }
            },
            _ = frames.tick() => {
                view.frame(engine_time(start));
                summary.frames += 1;
            }
            _ = polls.tick() => {
                if fetches.len() >= MAX_IN_FLIGHT {
                    summary.polls_skipped += 1;
                    debug!("previous fetch still in flight; poll skipped");
                } else {
                    let tx = tx.clone();
                    let client = client.clone();
                    let url = opts.url.clone();
                    fetches.spawn(async move {
                        let result = fetch_snapshot(&client, &url).await;
                        // The receiver is gone only after shutdown.
                        let _ = tx.send(result).await;
                    });
                }
            }
            Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                if let Err(err) = joined {
                    warn!("fetch task failed: {err}");
                }
            }
            _ = stats.tick() => {
                info!(
                    entries = view.cache().len(),
                    selected = ?view.selection().map(|o| o.id),
                    "tracker stats: {}",
                    view.metrics().summary_line()
                );
            }
        }
    }

    fetches.shutdown().await;
    summary
}
