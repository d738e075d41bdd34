use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use spabook::config::AppConfig;
use spabook::db;
use spabook::handlers;
use spabook::services::messaging::twilio::TwilioSmsProvider;
use spabook::services::messaging::{LogOnlyProvider, MessagingProvider};
use spabook::services::payment::razorpay::RazorpayGateway;
use spabook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    anyhow::ensure!(
        !config.payment_key_secret.is_empty(),
        "PAYMENT_KEY_SECRET must be set to verify payment signatures"
    );
    let gateway = RazorpayGateway::new(
        config.payment_gateway_url.clone(),
        config.payment_key_id.clone(),
        config.payment_key_secret.clone(),
        Duration::from_millis(config.payment_timeout_ms),
    )?;

    let messaging: Box<dyn MessagingProvider> = match TwilioSmsProvider::from_config(&config) {
        Some(provider) => {
            tracing::info!("sending confirmations via Twilio");
            Box::new(provider)
        }
        None => {
            tracing::warn!("Twilio not configured, confirmations will only be logged");
            Box::new(LogOnlyProvider)
        }
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        gateway: Box::new(gateway),
        messaging,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
