//! Run-wide transaction guard.
//!
//! PostgreSQL runs DDL transactionally, so a migration run can be wrapped in
//! one BEGIN/COMMIT. The guard rolls back when it is dropped without being
//! committed, which covers every early return on error.

use crate::executor::{LifeError, LifeExecutor};

/// An open transaction on a borrowed connection.
pub struct TransactionGuard<'a> {
    conn: &'a dyn LifeExecutor,
    closed: bool,
}

impl<'a> TransactionGuard<'a> {
    /// Start a transaction.
    pub fn begin(conn: &'a dyn LifeExecutor) -> Result<Self, LifeError> {
        conn.execute("BEGIN", &[])?;
        log::debug!("transaction started");
        Ok(Self { conn, closed: false })
    }

    pub fn commit(mut self) -> Result<(), LifeError> {
        if self.closed {
            return Err(LifeError::Other("Transaction closed".to_string()));
        }
        self.closed = true;
        self.conn.execute("COMMIT", &[])?;
        log::debug!("transaction committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), LifeError> {
        if self.closed {
            return Err(LifeError::Other("Transaction closed".to_string()));
        }
        self.closed = true;
        self.conn.execute("ROLLBACK", &[])?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        log::warn!("rolling back unfinished migration transaction");
        if let Err(e) = self.conn.execute("ROLLBACK", &[]) {
            log::error!("rollback failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockExecutor;

    #[test]
    fn test_commit() {
        let mock = MockExecutor::new();
        let tx = TransactionGuard::begin(&mock).unwrap();
        assert!(!tx.is_closed());
        tx.commit().unwrap();
        assert_eq!(mock.executed(), vec!["BEGIN", "COMMIT"]);
    }

    #[test]
    fn test_explicit_rollback() {
        let mock = MockExecutor::new();
        TransactionGuard::begin(&mock).unwrap().rollback().unwrap();
        assert_eq!(mock.executed(), vec!["BEGIN", "ROLLBACK"]);
    }

    #[test]
    fn test_drop_rolls_back() {
        let mock = MockExecutor::new();
        {
            let _tx = TransactionGuard::begin(&mock).unwrap();
        }
        assert_eq!(mock.executed(), vec!["BEGIN", "ROLLBACK"]);
    }
}
