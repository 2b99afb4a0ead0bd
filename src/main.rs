use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use api_shared::AuthConfig;
use clinic_core::config::database_url_from_env_value;
use clinic_core::{CoreConfig, db};

const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Resolve the REST listen address from an optional environment value.
fn rest_addr_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REST_ADDR.to_string())
}

/// Main entry point for the clinic records service
///
/// Resolves configuration once, opens the database, creates any missing tables and serves the
/// REST API until Ctrl-C.
///
/// # Environment Variables
/// - `CLINIC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `DATABASE_URL`: SQLite database URL (default: "sqlite://clinic.db?mode=rwc")
/// - `JWT_SECRET`: token signing secret (required)
/// - `ACCESS_TOKEN_LIFETIME_MINUTES`: access token lifetime (default: 60)
/// - `REFRESH_TOKEN_LIFETIME_DAYS`: refresh token lifetime (default: 1)
///
/// # Errors
/// Returns an error if configuration is invalid, the database cannot be opened, or the server
/// fails to bind or run.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("clinic_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::new(database_url_from_env_value(
        std::env::var("DATABASE_URL").ok(),
    ))?;
    let auth = AuthConfig::from_env_values(
        std::env::var("JWT_SECRET").ok(),
        std::env::var("ACCESS_TOKEN_LIFETIME_MINUTES").ok(),
        std::env::var("REFRESH_TOKEN_LIFETIME_DAYS").ok(),
    )?;
    let rest_addr = rest_addr_from_env_value(std::env::var("CLINIC_REST_ADDR").ok());

    tracing::info!("++ Starting clinic REST on {}", rest_addr);

    let pool = db::connect(&cfg).await?;
    db::init_schema(&pool).await?;

    api_rest::serve(&rest_addr, AppState::new(pool, auth)).await
}
