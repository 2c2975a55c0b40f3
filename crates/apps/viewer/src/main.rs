mod driver;
mod fetch;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use scene::host::RecordingHost;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracking::config::TrackingConfig;
use tracking::view::GlobeView;

use crate::driver::DriverOptions;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless satellite globe tracker")]
struct Args {
    /// Snapshot feed endpoint.
    #[arg(long, env = "FEED_URL", default_value = "http://127.0.0.1:8000/api/satellites")]
    url: String,

    /// Tracking config (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 10.0)]
    poll_secs: f64,

    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Seconds between stats log lines.
    #[arg(long, default_value_t = 5.0)]
    stats_secs: f64,

    /// Per-request timeout for snapshot fetches.
    #[arg(long, default_value_t = 5.0)]
    timeout_secs: f64,

    /// Stop after this many seconds instead of waiting for ctrl-c.
    #[arg(long)]
    duration_secs: Option<f64>,
}

impl Args {
    fn driver_options(&self) -> Result<DriverOptions, String> {
        let secs = |name: &str, value: f64| {
            Duration::try_from_secs_f64(value)
                .ok()
                .filter(|d| !d.is_zero())
                .ok_or_else(|| format!("--{name} must be a positive number of seconds, got {value}"))
        };
        if self.fps == 0 {
            return Err("--fps must be at least 1".to_string());
        }
        Ok(DriverOptions {
            url: self.url.clone(),
            frame_interval: Duration::from_secs_f64(1.0 / f64::from(self.fps)),
            poll_interval: secs("poll-secs", self.poll_secs)?,
            stats_interval: secs("stats-secs", self.stats_secs)?,
            run_for: self
                .duration_secs
                .map(|d| secs("duration-secs", d))
                .transpose()?,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let opts = match args.driver_options() {
        Ok(opts) => opts,
        Err(msg) => {
            error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let config = match &args.config {
        Some(path) => match TrackingConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                error!("failed to load config {path:?}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => TrackingConfig::default(),
    };

    let timeout = Duration::try_from_secs_f64(args.timeout_secs).unwrap_or(Duration::from_secs(5));
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build HTTP client: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(url = %opts.url, policy = ?config.stale_policy, "tracking feed");
    let mut view = GlobeView::new(config, RecordingHost::new());
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler unavailable: {err}");
            std::future::pending::<()>().await;
        }
    };

    let summary = driver::run(&mut view, client, &opts, shutdown).await;
    info!(
        frames = summary.frames,
        snapshots = summary.snapshots_applied,
        fetch_failures = summary.fetch_failures,
        polls_skipped = summary.polls_skipped,
        entries = view.cache().len(),
        "viewer stopped"
    );
    ExitCode::SUCCESS
}
