//! Tourly API server entry point.

use std::error::Error;
use std::sync::Arc;

use tourly_api::config::AppConfig;
use tourly_api::state::AppState;
use tourly_core::alert::BackOfficeAlerter;
use tourly_core::clock::{Clock, SystemClock};
use tourly_escalation::alerting::{HttpBackOfficeAlerter, UnconfiguredAlerter};
use tourly_escalation::application::registry::MonitorRegistry;
use tourly_event_store::memory_event_repository::InMemoryEventRepository;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Tourly API server");

    let config = AppConfig::from_env()?;

    let alerter: Arc<dyn BackOfficeAlerter> = match &config.backoffice_alert_url {
        Some(url) => Arc::new(HttpBackOfficeAlerter::new(
            url.clone(),
            config.backoffice_timeout,
        )?),
        None => {
            tracing::warn!("BACKOFFICE_ALERT_URL not set; overdue escalations will fail");
            Arc::new(UnconfiguredAlerter)
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let monitors = Arc::new(MonitorRegistry::new(
        Arc::clone(&clock),
        alerter,
        config.escalation.clone(),
    ));
    let app_state = AppState::new(
        clock,
        Arc::new(InMemoryEventRepository::new()),
        Arc::clone(&monitors),
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = tourly_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitors.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
