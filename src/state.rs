use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::services::messaging::MessagingProvider;
use crate::services::payment::PaymentGateway;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub gateway: Box<dyn PaymentGateway>,
    pub messaging: Box<dyn MessagingProvider>,
}
