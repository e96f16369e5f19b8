use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use obra_core::cache::LocalStorage;
use obra_events::{
    NotificationDispatcher, PgPushStore, ReminderScheduler, VapidSigner, WebPushDelivery,
};
use obra_gallery::{FeedOptions, PgProjectSource, ProjectFeed};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use obra_api::config::ServerConfig;
use obra_api::router::build_app_router;
use obra_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "obra_api=debug,obra_events=debug,obra_gallery=debug,tower_http=debug".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = obra_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    obra_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    obra_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let cancel = CancellationToken::new();

    // --- Push notifications ---
    let signer = VapidSigner::new(&config.vapid).expect("Invalid VAPID key pair");
    let dispatcher = NotificationDispatcher::new(
        Arc::new(PgPushStore::new(pool.clone())),
        Arc::new(WebPushDelivery::new(signer)),
    );

    // --- Gallery feed ---
    let storage = Arc::new(
        LocalStorage::open(&config.cache_dir).expect("Failed to open cache directory"),
    );
    let feed = Arc::new(ProjectFeed::new(
        Arc::new(PgProjectSource::new(pool.clone())),
        storage,
        FeedOptions {
            cache_ttl_minutes: config.projects_cache_ttl_mins,
            ..FeedOptions::default()
        },
        cancel.child_token(),
    ));

    // Warm the feed in the background; failures are recorded in its state.
    let warm_feed = Arc::clone(&feed);
    tokio::spawn(async move {
        let _ = warm_feed.fetch_projects(false).await;
    });

    // --- Reminder scheduler ---
    let reminder = ReminderScheduler::new(
        pool.clone(),
        dispatcher.clone(),
        Duration::from_secs(config.reminder_interval_secs),
    );
    let reminder_cancel = cancel.child_token();
    let reminder_handle = tokio::spawn(async move {
        reminder.run(reminder_cancel).await;
    });
    tracing::info!(
        interval_secs = config.reminder_interval_secs,
        "Reminder scheduler started"
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        dispatcher,
        feed,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stops the reminder loop and any feed retry still backing off.
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), reminder_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
