use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flashsale_backend::config::Config;
use flashsale_backend::services::reservation_store::ReservationStore;
use flashsale_backend::services::sale_cache::SaleCache;
use flashsale_backend::{handlers, jobs, AppState};

/// Upper bound on draining the background workers at shutdown
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(config = ?config, "configuration loaded");

    // Both stores must be reachable before any traffic is accepted.
    let reservations = match ReservationStore::connect(&config.redis_url).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to Redis");
            std::process::exit(1);
        }
    };
    if let Err(e) = reservations.ping().await {
        tracing::error!(error = %e, "Redis ping failed");
        std::process::exit(1);
    }

    let mut connect_options = ConnectOptions::new(&config.postgres_url);
    connect_options
        .max_connections(100)
        .min_connections(25)
        .max_lifetime(Duration::from_secs(300));
    let db = match Database::connect(connect_options).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to Postgres");
            std::process::exit(1);
        }
    };
    if let Err(e) = db.ping().await {
        tracing::error!(error = %e, "Postgres ping failed");
        std::process::exit(1);
    }

    tracing::info!("running migrations");
    if let Err(e) = Migrator::up(&db, None).await {
        tracing::error!(error = %e, "failed to run migrations");
        std::process::exit(1);
    }

    let (attempts_tx, attempts_rx) = mpsc::channel(config.attempt_queue_capacity);
    let (purchases_tx, purchases_rx) = mpsc::channel(config.purchase_queue_capacity);
    let sale_cache = SaleCache::new();

    let state = AppState {
        db: db.clone(),
        reservations: reservations.clone(),
        sale_cache: sale_cache.clone(),
        attempts_tx,
        purchases_tx,
    };

    // Background workers share one cancellation token and are joined at
    // shutdown after the accept loop stops.
    let shutdown = CancellationToken::new();
    let workers = vec![
        tokio::spawn(jobs::attempt_writer::run(
            db.clone(),
            attempts_rx,
            shutdown.clone(),
        )),
        tokio::spawn(jobs::purchase_writer::run(
            db.clone(),
            purchases_rx,
            shutdown.clone(),
        )),
        tokio::spawn(jobs::expiry_reconciler::run(
            db.clone(),
            reservations.clone(),
            shutdown.clone(),
        )),
        tokio::spawn(jobs::sale_scheduler::run(
            db.clone(),
            reservations.clone(),
            sale_cache.clone(),
            shutdown.clone(),
        )),
    ];

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/checkout", post(handlers::checkout::checkout))
        .route("/purchase", post(handlers::purchase::purchase))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, port = config.port, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!(port = config.port, "server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    // Accept loop is stopped; cancel the workers and give each one a
    // final flush before the pools close.
    shutdown.cancel();
    let drain = async {
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "worker task panicked");
            }
        }
    };
    if tokio::time::timeout(SHUTDOWN_DEADLINE, drain).await.is_err() {
        tracing::warn!("graceful shutdown timed out, some records may not have been flushed");
    }

    tracing::info!("server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
