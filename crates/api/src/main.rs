//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use domain::{
    CredentialVerifier, InMemoryPaymentSessions, JwtCredentialVerifier, StaticCredentialVerifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use store::{DomainStore, InMemoryStore, PostgresStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let (json, text) = match config.log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Text => (None, Some(tracing_subscriber::fmt::layer())),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

async fn serve<S: DomainStore + Clone + 'static>(
    store: S,
    verifier: Arc<dyn CredentialVerifier>,
    config: &Config,
    metrics_handle: PrometheusHandle,
) {
    let payments = Arc::new(InMemoryPaymentSessions::new());
    let state = api::create_default_state(store, verifier, payments, &config.settings)
        .expect("invalid storefront settings");
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(
        %addr,
        inventory_policy = ?config.settings.inventory_policy,
        reporting_offset_minutes = config.settings.reporting_offset_minutes,
        "starting API server"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env().expect("invalid configuration");
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Credential verification
    let verifier: Arc<dyn CredentialVerifier> = match &config.jwt_secret {
        Some(secret) => Arc::new(JwtCredentialVerifier::new(
            secret.as_bytes(),
            config.jwt_issuer.clone(),
        )),
        None => {
            tracing::warn!("JWT_SECRET is not set; every bearer credential will be rejected");
            Arc::new(StaticCredentialVerifier::new())
        }
    };

    // 4. Pick a store and start serving
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");
            serve(store, verifier, &config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using in-memory store");
            serve(InMemoryStore::new(), verifier, &config, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
