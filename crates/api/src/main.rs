use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classtrack_api::config::ServerConfig;
use classtrack_api::{router, state};
use classtrack_notify::{
    EmailDispatcher, MailTransport, NoopMailer, PgEmailStore, SmtpConfig, SmtpMailer,
    SweepScheduler, TemplateRenderer,
};
use classtrack_report::{DailyRunGuard, JobScheduler, PgRunLogStore};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "classtrack_api=debug,classtrack_notify=debug,classtrack_report=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = classtrack_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    classtrack_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    classtrack_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Mail transport ---
    let transport: Arc<dyn MailTransport> = match SmtpConfig::from_env() {
        Some(smtp) => {
            tracing::info!(host = %smtp.smtp_host, port = smtp.smtp_port, "SMTP transport configured");
            Arc::new(SmtpMailer::new(smtp).expect("Failed to initialise SMTP transport"))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, outbound email will be logged and dropped");
            Arc::new(NoopMailer)
        }
    };

    // --- Delivery engine ---
    let renderer = Arc::new(TemplateRenderer::new().expect("Failed to compile mail templates"));
    let dispatcher = Arc::new(EmailDispatcher::new(
        Arc::new(PgEmailStore::new(pool.clone())),
        Arc::clone(&transport),
        renderer,
    ));

    // Spawn the queue sweep (retries PENDING/FAILED email every minute).
    let sweep_cancel = CancellationToken::new();
    let sweep = SweepScheduler::new(Arc::clone(&dispatcher));
    let sweep_cancel_clone = sweep_cancel.clone();
    let sweep_handle = tokio::spawn(async move {
        sweep.run(sweep_cancel_clone).await;
    });

    // Spawn the daily job scheduler (reports + nightly broadcast).
    let guard = DailyRunGuard::new(Arc::new(PgRunLogStore::new(pool.clone())));
    let jobs = Arc::new(JobScheduler::new(
        pool.clone(),
        guard,
        Arc::clone(&transport),
        Arc::clone(&dispatcher),
        config.admin_email.clone(),
    ));
    let jobs_cancel = CancellationToken::new();
    let jobs_clone = Arc::clone(&jobs);
    let jobs_cancel_clone = jobs_cancel.clone();
    let jobs_handle = tokio::spawn(async move {
        jobs_clone.run(jobs_cancel_clone).await;
    });

    tracing::info!("Background services started (email sweep, daily job scheduler)");

    // --- App state / router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        dispatcher,
        jobs,
        transport,
    };
    let app = router::build_app_router(state, &config);

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

    jobs_cancel.cancel();
    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), jobs_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Background services stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
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
