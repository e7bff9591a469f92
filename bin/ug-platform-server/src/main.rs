//! UG Platform Server
//!
//! Serves the user / group / role APIs over a SQLite database.
//!
//! ## Configuration
//!
//! Read from `config.toml` (or `$UG_CONFIG`), then overridden by environment:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `UG_HTTP_PORT` | `8000` | HTTP API port |
//! | `UG_DATABASE_URL` | `sqlite://data/ug.db` | SQLite database URL |
//! | `UG_AUTHORIZATION_MODE` | `authenticated` | `authenticated` or `role_based` |
//! | `UG_DEV_MODE` | `false` | Seed demo data into an empty database |
//! | `LOG_FORMAT` | `text` | `json` for structured logs |
//! | `RUST_LOG` | `info` | Log level |

use std::path::Path;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use ug_config::ConfigLoader;
use ug_platform::store::Stores;
use ug_platform::{
    api_router, build_policy, connect, init_schema, AppState, AuthorizationPolicy, DemoSeeder,
    LoaderSettings,
};

#[tokio::main]
async fn main() -> Result<()> {
    ug_common::init_logging("ug-platform-server");

    info!("Starting UG Platform Server...");

    let config = ConfigLoader::new().load().context("Failed to load configuration")?;

    ensure_database_dir(&config.database.url)?;
    let pool = connect(&config.database.url, config.database.max_connections).await?;

    if config.database.init_schema {
        init_schema(&pool).await?;
    }

    let stores = Stores::sqlite(pool);

    if config.dev_mode {
        DemoSeeder::new(stores.clone()).seed().await?;
    }

    let policy = build_policy(
        &config.authorization.mode,
        config.authorization.writer_roles.clone(),
        config.authorization.reader_roles.clone(),
    )?;
    info!(policy = policy.name(), "Authorization policy configured");

    let settings = LoaderSettings::new(config.loader.max_batch_size, config.loader.batch_delay_ms);
    let state = AppState::new(stores, settings, policy);

    let app = api_router(state).layer(cors_layer(&config.http.cors_origins));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("UG Platform Server shutdown complete");
    Ok(())
}

/// `*` allows any origin; otherwise only the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// SQLite creates the file but not its directory.
fn ensure_database_dir(url: &str) -> Result<()> {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }

    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received...");
}
