use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Interval, ResourceKind};

/// Whether `resource_id` has no `booked` ledger entry overlapping `interval`.
///
/// Only overlap arithmetic lives here; callers must hold a
/// [`TransactionScope`](crate::db::TransactionScope) when the answer feeds a
/// ledger insert.
pub fn is_free(
    conn: &Connection,
    kind: ResourceKind,
    resource_id: &str,
    interval: &Interval,
) -> anyhow::Result<bool> {
    if interval.is_empty() {
        return Ok(true);
    }

    let entries = queries::get_booked_entries(conn, kind, resource_id, interval)?;
    Ok(!entries.iter().any(|entry| entry.interval.overlaps(interval)))
}
