use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cakeday_bot::clock::{Clock, SystemClock};
use cakeday_bot::config::BotConfig;
use cakeday_bot::detect::{DetectorContext, RandomChooser};
use cakeday_bot::reddit::{RedditClient, RedditCredentials, RedditSource};
use cakeday_bot::schedule::{PurgeJob, Scheduler, SchedulerConfig};
use cakeday_bot::server::{self, AppState};
use cakeday_bot::source::VaderScorer;
use cakeday_bot::store::RecordStore;
use cakeday_bot::worker::{CommunityWorker, RecoveryConfig, Supervisor, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cakeday_bot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BotConfig::from_env();

    let store = Arc::new(
        RecordStore::open(&config.store_path)
            .with_context(|| format!("opening record store {}", config.store_path.display()))?,
    );
    let credentials = RedditCredentials::from_env().context("reading Reddit credentials")?;
    let client = Arc::new(RedditClient::new(credentials).context("building Reddit client")?);
    let bot = client.username();
    info!(communities = ?config.communities, %bot, "Starting");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ctx = DetectorContext::new(
        store.clone(),
        Arc::new(VaderScorer::new()),
        Arc::new(RandomChooser),
        bot,
    );

    let shutdown = CancellationToken::new();
    let mut supervisor = Supervisor::new(shutdown.clone());
    let recovery = RecoveryConfig::new(config.restart_backoff);
    for community in &config.communities {
        let source = Arc::new(RedditSource::new(client.clone(), community.clone()));
        let worker = CommunityWorker::new(source, ctx.clone(), clock.clone(), WorkerConfig::default());
        supervisor.spawn(worker, recovery.clone());
    }

    let http = tokio::spawn(server::serve(
        config.listen_addr,
        AppState::new(store.clone()),
        shutdown.clone(),
    ));

    let ctrl_c = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C, shutting down"),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
            }
            shutdown.cancel();
        })
    };

    let scheduler_config = SchedulerConfig::default();
    let mut scheduler = Scheduler::new(clock, scheduler_config.tick);
    scheduler.every_day_at(scheduler_config.purge_at, PurgeJob::new(store));
    scheduler.run(&shutdown).await;

    supervisor.shutdown_all();
    for (community, report) in supervisor.join_all().await {
        info!(%community, restarts = report.restarts, inconsistencies = report.inconsistencies, "Worker stopped");
    }
    ctrl_c.abort();

    match http.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
        Err(e) => error!(error = %e, "HTTP server task panicked"),
    }

    Ok(())
}
