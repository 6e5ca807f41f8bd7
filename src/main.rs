mod app;
mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod response;

use anyhow::Context;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::build_router;
use auth::cookies::CookiePolicy;
use auth::password::PasswordManager;
use auth::services::AuthService;
use auth::tokens::TokenIssuer;
use config::{Config, StorageBackend};
use db::connection::{create_pool, mask_credentials};
use db::memory::InMemoryUnitOfWork;
use db::uow::PgUnitOfWork;

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Si RUST_LOG n'est pas défini, utiliser ces règles par défaut
        tracing_subscriber::EnvFilter::new(
            "info,auth_session=debug,hyper_util=warn,tower_http=info",
        )
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_app(config: &Config) -> anyhow::Result<Router> {
    let tokens = TokenIssuer::new(
        &config.jwt_secret,
        config.jwt_algorithm,
        config.access_token_ttl()?,
        config.refresh_token_ttl()?,
    )?;
    let cookies = CookiePolicy::new(
        config.is_production(),
        tokens.access_token_ttl(),
        tokens.refresh_token_ttl(),
    );
    let passwords = PasswordManager::new(config.bcrypt_cost);

    let app = match &config.storage {
        StorageBackend::Postgres {
            database_url,
            pool_size,
        } => {
            tracing::info!(database = %mask_credentials(database_url), "Using PostgreSQL storage");
            let pool = create_pool(database_url, *pool_size)?;
            build_router(AuthService::new(PgUnitOfWork::new(pool), tokens, passwords), cookies)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            build_router(AuthService::new(InMemoryUnitOfWork::new(), tokens, passwords), cookies)
        }
    };
    Ok(app)
}

// ----------------- Main -----------------

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    // Initialize logging for all environments
    setup_logging();
    tracing::info!("Starting auth-session...");

    let config = Config::from_env()?;
    let app = build_app(&config)?;

    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        tracing::info!("Running in Lambda mode");
        lambda_http::run(app).await
    } else {
        tracing::info!("Running in local HTTP server mode");
        let addr = format!("{}:{}", config.server_host, config.server_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        tracing::info!("🚀 Server running at http://{}", addr);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
