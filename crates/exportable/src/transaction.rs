//! Transaction Management
//!
//! Scoped unit-of-work helper: everything done through the store inside the
//! closure is committed together or rolled back together.

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::model::Transactional;

/// Execute a closure within a transaction scope with automatic commit/rollback
///
/// - If the closure succeeds, the transaction is committed
/// - If the closure fails, the transaction is rolled back and the closure's
///   error is returned
///
/// No retry is attempted.
pub fn with_transaction<S, F, R, E>(store: &mut S, f: F) -> Result<R, E>
where
    S: Transactional + ?Sized,
    F: FnOnce(&mut S) -> Result<R, E>,
    E: From<StoreError>,
{
    store.begin()?;
    debug!("Transaction started at depth {}", store.depth());

    match f(store) {
        Ok(result) => {
            store.commit()?;
            debug!("Transaction committed");
            Ok(result)
        }
        Err(e) => {
            if let Err(rollback_error) = store.rollback() {
                warn!("Rollback failed after aborted transaction: {}", rollback_error);
            } else {
                debug!("Transaction rolled back");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreResult;

    #[derive(Default)]
    struct Ledger {
        open: usize,
        events: Vec<&'static str>,
        fail_rollback: bool,
    }

    impl Transactional for Ledger {
        fn begin(&mut self) -> StoreResult<()> {
            self.open += 1;
            self.events.push("begin");
            Ok(())
        }

        fn commit(&mut self) -> StoreResult<()> {
            self.open -= 1;
            self.events.push("commit");
            Ok(())
        }

        fn rollback(&mut self) -> StoreResult<()> {
            self.open -= 1;
            self.events.push("rollback");
            if self.fail_rollback {
                return Err(StoreError::Transaction("connection lost".to_string()));
            }
            Ok(())
        }

        fn depth(&self) -> usize {
            self.open
        }
    }

    #[test]
    fn test_commit_on_success() {
        let mut ledger = Ledger::default();
        let result: Result<i32, StoreError> = with_transaction(&mut ledger, |_| Ok(5));

        assert_eq!(result.unwrap(), 5);
        assert_eq!(ledger.events, vec!["begin", "commit"]);
        assert_eq!(ledger.depth(), 0);
    }

    #[test]
    fn test_rollback_on_failure() {
        let mut ledger = Ledger::default();
        let result: Result<(), StoreError> = with_transaction(&mut ledger, |_| {
            Err(StoreError::Constraint("duplicate key".to_string()))
        });

        assert_eq!(result.unwrap_err(), StoreError::Constraint("duplicate key".to_string()));
        assert_eq!(ledger.events, vec!["begin", "rollback"]);
    }

    #[test]
    fn test_original_error_wins_over_rollback_error() {
        let mut ledger = Ledger {
            fail_rollback: true,
            ..Default::default()
        };
        let result: Result<(), StoreError> = with_transaction(&mut ledger, |_| {
            Err(StoreError::Validation {
                class_name: "Item".to_string(),
                message: "qty can't be blank".to_string(),
            })
        });

        assert!(matches!(result, Err(StoreError::Validation { .. })));
    }

    #[test]
    fn test_nested_scopes() {
        let mut ledger = Ledger::default();
        let result: Result<usize, StoreError> = with_transaction(&mut ledger, |outer| {
            with_transaction(outer, |inner| Ok(inner.depth()))
        });

        assert_eq!(result.unwrap(), 2);
        assert_eq!(ledger.events, vec!["begin", "begin", "commit", "commit"]);
    }
}
