use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{PaymentGateway, PaymentIntent};

pub struct RazorpayGateway {
    base_url: String,
    key_id: String,
    key_secret: String,
    client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(
        base_url: String,
        key_id: String,
        key_secret: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build payment gateway client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
            client,
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        reference: &str,
    ) -> anyhow::Result<PaymentIntent> {
        let body = json!({
            "amount": amount,
            "currency": currency,
            "receipt": reference,
        });

        let resp = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("failed to call payment gateway")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse payment gateway response")?;

        if !status.is_success() {
            anyhow::bail!("payment gateway error ({}): {}", status, data);
        }

        let order_id = data["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing order id in payment gateway response"))?;

        Ok(PaymentIntent {
            order_id,
            amount: data["amount"].as_i64().unwrap_or(amount),
            currency: data["currency"].as_str().unwrap_or(currency).to_string(),
        })
    }
}
