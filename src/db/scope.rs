use std::sync::Arc;

use anyhow::Context;
use rusqlite::Connection;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A write transaction over the shared connection.
///
/// `BEGIN IMMEDIATE` takes SQLite's reserved lock up front, so a conflict
/// check followed by an insert cannot interleave with another writer.
/// Dropping the scope without calling [`TransactionScope::commit`] rolls the
/// transaction back, which covers both error returns and a request future
/// that is dropped mid-flight.
pub struct TransactionScope {
    conn: OwnedMutexGuard<Connection>,
    open: bool,
}

impl TransactionScope {
    pub async fn begin(db: &Arc<Mutex<Connection>>) -> anyhow::Result<Self> {
        let conn = Arc::clone(db).lock_owned().await;
        conn.execute_batch("BEGIN IMMEDIATE")
            .context("failed to begin transaction")?;
        Ok(Self { conn, open: true })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn commit(mut self) -> anyhow::Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("failed to commit transaction")?;
        self.open = false;
        Ok(())
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.open {
            match self.conn.execute_batch("ROLLBACK") {
                Ok(()) => tracing::debug!("transaction rolled back"),
                Err(e) => tracing::error!(error = %e, "failed to roll back transaction"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn shared_db() -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(db::init_db(":memory:").unwrap()))
    }

    fn branch_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM branches", [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let db = shared_db();
        let scope = TransactionScope::begin(&db).await.unwrap();
        scope
            .conn()
            .execute("INSERT INTO branches (id, name) VALUES ('b1', 'Downtown')", [])
            .unwrap();
        scope.commit().unwrap();

        assert_eq!(branch_count(&*db.lock().await), 1);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let db = shared_db();
        {
            let scope = TransactionScope::begin(&db).await.unwrap();
            scope
                .conn()
                .execute("INSERT INTO branches (id, name) VALUES ('b1', 'Downtown')", [])
                .unwrap();
        }

        assert_eq!(branch_count(&*db.lock().await), 0);
    }

    #[tokio::test]
    async fn test_scope_can_be_reopened_after_rollback() {
        let db = shared_db();
        drop(TransactionScope::begin(&db).await.unwrap());

        let scope = TransactionScope::begin(&db).await.unwrap();
        scope.commit().unwrap();
    }
}
