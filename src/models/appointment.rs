use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Interval;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    /// Human-readable sequential code, e.g. `APT-000042`.
    pub code: String,
    pub customer_id: String,
    pub service_id: String,
    pub room_id: Option<String>,
    pub employee_id: Option<String>,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub price: i64,
    pub room_price: i64,
    pub total_price: i64,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start_at, self.end_at)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "in_progress" => Some(AppointmentStatus::InProgress),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// The allowed-transition table. `Pending -> Confirmed` additionally
    /// requires an attached employee, which the lifecycle service enforces.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, InProgress)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "online" => PaymentMethod::Online,
            _ => PaymentMethod::Cash,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting a verified gateway payment.
    Pending,
    /// Settled at the counter.
    Cash,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Cash => "cash",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cash" => PaymentStatus::Cash,
            "paid" => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        }
    }

    pub fn initial_for(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => PaymentStatus::Cash,
            PaymentMethod::Online => PaymentStatus::Pending,
        }
    }
}
