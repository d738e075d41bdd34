use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub api_token: String,
    pub payment_gateway_url: String,
    pub payment_key_id: String,
    pub payment_key_secret: String,
    pub payment_currency: String,
    /// Upper bound on a gateway call made while a booking holds the database.
    pub payment_timeout_ms: u64,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "spabook.db".to_string()),
            api_token: env::var("API_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            payment_gateway_url: env::var("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
            payment_key_id: env::var("PAYMENT_KEY_ID").unwrap_or_default(),
            payment_key_secret: env::var("PAYMENT_KEY_SECRET").unwrap_or_default(),
            payment_currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            payment_timeout_ms: env::var("PAYMENT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
        }
    }
}
