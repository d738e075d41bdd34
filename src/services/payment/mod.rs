pub mod razorpay;

use std::sync::Arc;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::db::{queries, TransactionScope};
use crate::errors::AppError;
use crate::models::{Appointment, PaymentMethod, PaymentStatus};
use crate::state::AppState;

/// An order opened with the gateway that the client completes payment against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `amount` is in minor currency units; `reference` is our receipt id.
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        reference: &str,
    ) -> anyhow::Result<PaymentIntent>;
}

/// Checks a hex HMAC-SHA256 of `order_id|payment_id` under the shared secret.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());

    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub appointment_id: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// Flips an online appointment to `paid` when the gateway signature checks out.
pub async fn confirm_payment(
    state: &Arc<AppState>,
    confirmation: &PaymentConfirmation,
) -> Result<Appointment, AppError> {
    let scope = TransactionScope::begin(&state.db).await?;

    let appt = queries::get_appointment(scope.conn(), &confirmation.appointment_id)?
        .ok_or_else(|| AppError::NotFound("appointment not found".to_string()))?;

    if appt.payment_method != PaymentMethod::Online {
        return Err(AppError::Validation(
            "appointment is not an online payment".to_string(),
        ));
    }

    if appt.gateway_order_id.as_deref() != Some(confirmation.gateway_order_id.as_str()) {
        return Err(AppError::Validation(
            "payment order does not belong to this appointment".to_string(),
        ));
    }

    if !verify_signature(
        &state.config.payment_key_secret,
        &confirmation.gateway_order_id,
        &confirmation.gateway_payment_id,
        &confirmation.signature,
    ) {
        tracing::warn!(
            appointment_id = %appt.id,
            order_id = %confirmation.gateway_order_id,
            "rejected payment with invalid signature"
        );
        return Err(AppError::Validation("invalid payment signature".to_string()));
    }

    if appt.payment_status == PaymentStatus::Paid {
        return Ok(appt);
    }

    queries::mark_paid(scope.conn(), &appt.id, &confirmation.gateway_payment_id)?;
    let updated = queries::get_appointment(scope.conn(), &appt.id)?
        .ok_or_else(|| AppError::NotFound("appointment not found".to_string()))?;
    scope.commit()?;

    tracing::info!(appointment_id = %updated.id, code = %updated.code, "payment verified");
    Ok(updated)
}
