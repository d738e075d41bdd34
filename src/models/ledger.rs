use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Room,
    Employee,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Room => "room",
            ResourceKind::Employee => "employee",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "employee" => ResourceKind::Employee,
            _ => ResourceKind::Room,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Booked,
    Released,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Booked => "booked",
            LedgerStatus::Released => "released",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "released" => LedgerStatus::Released,
            _ => LedgerStatus::Booked,
        }
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// `None` when the end would fall outside chrono's representable range.
    pub fn starting_at(start: NaiveDateTime, duration_minutes: i64) -> Option<Self> {
        let length = TimeDelta::try_minutes(duration_minutes)?;
        let end = start.checked_add_signed(length)?;
        Some(Self { start, end })
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// `[a,b)` and `[c,d)` overlap iff `a < d && c < b`. Empty intervals
    /// overlap nothing, and back-to-back intervals do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub resource_kind: ResourceKind,
    pub resource_id: String,
    pub interval: Interval,
    pub status: LedgerStatus,
    pub appointment_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
