//! Entitlements service binary.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use entitlements::adapters::auth::InMemorySessionValidator;
use entitlements::adapters::clock::SystemClock;
use entitlements::adapters::http::{build_router, EntitlementAppState};
use entitlements::adapters::memory::{InMemoryProfileRepository, InMemoryTransactionRepository};
use entitlements::adapters::payment::SimulatedPaymentConfirmer;
use entitlements::adapters::postgres::{
    connect, PostgresProfileRepository, PostgresTransactionRepository,
};
use entitlements::application::handlers::membership::SweepExpiredMembershipsHandler;
use entitlements::application::SweepScheduler;
use entitlements::config::AppConfig;
use entitlements::ports::{Clock, ProfileRepository, TransactionRepository};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

async fn stores(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<(Arc<dyn ProfileRepository>, Arc<dyn TransactionRepository>), BoxError> {
    if config.database.is_configured() {
        let pool = connect(&config.database).await?;
        info!("Using PostgreSQL entitlement store");
        Ok((
            Arc::new(PostgresProfileRepository::with_clock(pool.clone(), clock.clone())),
            Arc::new(PostgresTransactionRepository::with_clock(pool, clock)),
        ))
    } else {
        warn!("No database URL configured, using in-memory entitlement store");
        Ok((
            Arc::new(InMemoryProfileRepository::with_clock(clock.clone())),
            Arc::new(InMemoryTransactionRepository::with_clock(clock)),
        ))
    }
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let mut config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (profiles, transactions) = stores(&config, clock.clone()).await?;

    let sessions = InMemorySessionValidator::new();
    for (token, user_id) in config.auth.sessions()? {
        sessions.insert(token, user_id).await;
    }
    if sessions.is_empty().await {
        warn!("No sessions configured; authenticated endpoints will reject every request");
    }

    let sweeper = Arc::new(
        SweepExpiredMembershipsHandler::new(profiles.clone(), clock.clone())
            .with_page_size(config.sweep.page_size),
    );

    let state = EntitlementAppState::new(
        profiles,
        transactions,
        Arc::new(SimulatedPaymentConfirmer::new()),
        clock,
    )
    .with_sweeper(sweeper.clone())
    .with_scheduler_token(config.sweep.scheduler_token.take());

    let app = build_router(
        state,
        Arc::new(sessions),
        config.server.request_timeout(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_task = if config.sweep.enabled {
        let scheduler = SweepScheduler::new(sweeper).with_interval(config.sweep.interval());
        let rx = shutdown_rx.clone();
        Some(tokio::spawn(async move { scheduler.run(rx).await }))
    } else {
        info!("In-process sweep scheduler disabled");
        None
    };

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Entitlements service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    if let Some(task) = scheduler_task {
        if let Err(e) = task.await {
            warn!(error = %e, "Sweep scheduler task ended abnormally");
        }
    }

    info!("Entitlements service stopped");
    Ok(())
}
