use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, crate_name, crate_version};
use log::{error, info};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::task::TaskTracker;

use fill_engine::dispatcher;
use fill_protocol::EngineConfig;

#[derive(Debug, Clone, Parser)]
#[clap(author, about, version)]
struct Config {
    /// Optional Sentry DSN for error reporting
    #[clap(long, env)]
    sentry_dsn: Option<String>,

    /// Database URL (with credentials)
    #[clap(long, env, hide_env_values = true)]
    database_url: String,

    /// Maximum number of connections to the database
    #[clap(long, env, default_value = "10")]
    max_db_connections: u32,

    /// Max concurrent events in flight
    #[clap(long, env, default_value = "8")]
    parallelism: u16,

    /// Idle poll cadence
    #[clap(long, env, value_parser = humantime::parse_duration, default_value = "2s")]
    poll_interval: Duration,

    /// Events claimed per poll
    #[clap(long, env, default_value = "16")]
    claim_batch_size: u32,

    /// Stuck-event reap threshold
    #[clap(long, env, value_parser = humantime::parse_duration, default_value = "120s")]
    reap_after: Duration,

    /// Per-event in-process retries
    #[clap(long, env, default_value = "2")]
    max_retries: u32,

    /// Content truncation length
    #[clap(long, env, default_value = "5000")]
    max_cell_length: usize,

    /// Comma-separated hosts whose URLs are rejected pre-write
    #[clap(long, env, value_delimiter = ',', default_value = "vertexaisearch.cloud.google.com,www.google.com,google.com")]
    blocked_url_hosts: Vec<String>,

    /// Confidence below which a retry is triggered
    #[clap(long, env, default_value = "0.5")]
    low_confidence_threshold: f64,
}

impl From<Config> for EngineConfig {
    fn from(c: Config) -> Self {
        Self {
            parallelism: c.parallelism,
            poll_interval: c.poll_interval,
            claim_batch_size: c.claim_batch_size,
            reap_after: c.reap_after,
            max_retries: c.max_retries,
            max_cell_length: c.max_cell_length,
            blocked_url_hosts: BTreeSet::from_iter(c.blocked_url_hosts),
            low_confidence_threshold: c.low_confidence_threshold,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Config::parse();

    // Return value *must* be kept in a variable or else it will be dropped and Sentry integration won't work
    let _sentry = fill_sentry_integration::init(crate_name!(), &cli.sentry_dsn, &None);

    info!("Starting {} {}", crate_name!(), crate_version!());

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_db_connections)
        .connect_with(
            PgConnectOptions::from_str(&cli.database_url)?.application_name(&format!("{}-{}", crate_name!(), crate_version!())),
        )
        .await?;
    info!("Connected to database");

    let engine_config = Arc::new(EngineConfig::from(cli));

    let mut tasks = JoinSet::new();
    let task_tracker = TaskTracker::new();

    // Soft termination signal handling.
    let task_tracker_signal = task_tracker.clone();
    tasks.spawn(async move {
        let mut hangup = signal(SignalKind::hangup()).expect("could not listen to SIGHUP");
        let mut interrupt = signal(SignalKind::interrupt()).expect("could not listen to SIGINT");
        let mut terminate = signal(SignalKind::terminate()).expect("could not listen to SIGTERM");

        select! {
            Some(_) = hangup.recv() => shutdown(&task_tracker_signal),
            Some(_) = interrupt.recv() => shutdown(&task_tracker_signal),
            Some(_) = terminate.recv() => shutdown(&task_tracker_signal),
        }

        fn shutdown(task_tracker: &TaskTracker) {
            info!("Finishing in-flight events before terminating...");
            task_tracker.close();
        }
    });

    // Waits for in-flight tasks to finish after a shutdown signal, and
    // reports progress while doing so; this is what makes `tasks.join_all`
    // below actually wait for the task-tracker-spawned work.
    let task_tracker_indicator = task_tracker.clone();
    tasks.spawn(async move {
        loop {
            if task_tracker_indicator.is_closed() {
                if task_tracker_indicator.is_empty() {
                    break;
                }
                info!("Waiting for {} event(s) to finish...", task_tracker_indicator.len());
            }
            sleep(Duration::from_secs(1)).await;
        }
    });

    // Reaper: force-completes stuck events past the reap threshold.
    {
        let pool = pool.clone();
        let config = engine_config.clone();
        let tt = task_tracker.clone();
        task_tracker.spawn(async move {
            dispatcher::run_reaper(pool, config, tt).await;
        });
    }

    // Dispatcher poll loop, restarted on crash.
    {
        let pool = pool.clone();
        let config = engine_config.clone();
        let tt = task_tracker.clone();
        task_tracker.spawn(async move {
            loop {
                let result = dispatcher::run(pool.clone(), config.clone(), tt.clone()).await;
                if let Err(ref e) = result {
                    error!("dispatcher crashed: {e}");
                }

                if tt.is_closed() {
                    break;
                }

                sleep(Duration::from_secs(1)).await;
                info!("Restarting dispatcher...");
            }
        });
    }

    tasks.join_all().await;

    if task_tracker.is_closed() {
        info!("Engine gracefully terminated");
        Ok(())
    } else {
        Err(anyhow::anyhow!("Fatal error"))
    }
}
