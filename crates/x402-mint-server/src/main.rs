use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use x402_mint_server::{config::AppConfig, metrics::register_metrics, routes, state::AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing blockchain credentials are fatal.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;

    tracing::info!("Starting x402-mint-server on port {}", port);
    tracing::info!("Signer: {:#x}", config.signer_address);
    tracing::info!("Premium payments to: {:#x}", config.pay_to);
    tracing::info!("Facilitator URL: {}", config.facilitator_url);
    tracing::info!(
        "HMAC auth: {}",
        if config.hmac_secret.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );
    tracing::info!(
        "Chains: {:?}",
        config.chains.iter().map(|c| c.chain_id).collect::<Vec<_>>()
    );
    tracing::info!(
        "Metadata: {}",
        if config.supabase.is_some() {
            "supabase"
        } else {
            "disabled"
        }
    );
    if let Some(affiliate) = config.mint_affiliate {
        tracing::info!("Mint affiliate: {:#x}", affiliate);
    }

    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize: {e}");
            std::process::exit(1);
        }
    };

    // Register Prometheus metrics
    register_metrics();

    let state_data = web::Data::new(state);

    // Configure rate limiter
    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm)
        .finish()
        .ok_or_else(|| std::io::Error::other("invalid RATE_LIMIT_RPM"))?;

    tracing::info!("Rate limit: {} req/min per IP", rate_limit_rpm);

    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(Logger::default())
            .wrap(x402_mint_server::cors::build_cors(&allowed_origins))
            .wrap(Governor::new(&governor_conf))
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
