use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::authenticate;
use crate::errors::AppError;
use crate::models::Appointment;
use crate::services::payment::{self, PaymentConfirmation};
use crate::state::AppState;

// POST /api/payments/verify
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(confirmation): Json<PaymentConfirmation>,
) -> Result<Json<Appointment>, AppError> {
    authenticate(&headers, &state.config.api_token)?;
    let appointment = payment::confirm_payment(&state, &confirmation).await?;
    Ok(Json(appointment))
}
