//! Cinegate HTTP server.

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cinegate::adapters::auth::JwtSessionValidator;
use cinegate::adapters::chapa::ChapaGateway;
use cinegate::adapters::http::{app_router, PaymentAppState};
use cinegate::adapters::postgres::{
    PostgresEntitlementStore, PostgresMovieCatalog, PostgresTransactionLedger,
};
use cinegate::application::handlers::purchase::CheckoutLinks;
use cinegate::config::{AppConfig, ConfigError, ServerConfig};
use cinegate::ports::GatewayError;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("payment gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("invalid CORS origin {0:?}")]
    CorsOrigin(String),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate().map_err(ConfigError::from)?;

    info!(
        environment = ?config.server.environment,
        chapa_test_mode = config.chapa.is_test_mode(),
        "starting cinegate"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("migrations applied");
    }

    let gateway = ChapaGateway::new(config.chapa.gateway_config())?;
    let state = PaymentAppState {
        ledger: Arc::new(PostgresTransactionLedger::new(pool.clone())),
        entitlements: Arc::new(PostgresEntitlementStore::new(pool.clone())),
        catalog: Arc::new(PostgresMovieCatalog::new(pool.clone())),
        gateway: Arc::new(gateway),
        links: CheckoutLinks::new(config.chapa.app_base_url.clone()),
        webhook_secret: config.chapa.webhook_secret.clone(),
    };
    let validator = Arc::new(JwtSessionValidator::new(config.auth.jwt_config()));

    let app = with_http_layers(app_router(state, validator), &config.server)?;

    let addr = config
        .server
        .socket_addr()
        .map_err(ConfigError::from)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if server.is_production() {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

fn with_http_layers(router: Router, server: &ServerConfig) -> Result<Router, StartupError> {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let mut router = router
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    if let Some(cors) = cors_layer(server)? {
        router = router.layer(cors);
    }
    Ok(router)
}

fn cors_layer(server: &ServerConfig) -> Result<Option<CorsLayer>, StartupError> {
    let origins = server.cors_origins_list();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed = origins
            .iter()
            .filter(|o| !o.is_empty())
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|_| StartupError::CorsOrigin(o.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(parsed)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
