pub mod twilio;

use async_trait::async_trait;

#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Stand-in used when no SMS credentials are configured.
pub struct LogOnlyProvider;

#[async_trait]
impl MessagingProvider for LogOnlyProvider {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(to = %to, body = %body, "sms delivery disabled, message logged");
        Ok(())
    }
}
