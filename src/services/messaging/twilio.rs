use anyhow::Context;
use async_trait::async_trait;

use super::MessagingProvider;
use crate::config::AppConfig;

pub struct TwilioSmsProvider {
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: reqwest::Client,
}

impl TwilioSmsProvider {
    /// `None` unless all three Twilio settings are present.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if config.twilio_account_sid.is_empty()
            || config.twilio_auth_token.is_empty()
            || config.twilio_phone_number.is_empty()
        {
            return None;
        }

        Some(Self {
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_phone_number.clone(),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl MessagingProvider for TwilioSmsProvider {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        self.client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", &self.from_number), ("Body", body)])
            .send()
            .await
            .context("failed to send confirmation SMS")?
            .error_for_status()
            .context("SMS provider returned error")?;

        Ok(())
    }
}
