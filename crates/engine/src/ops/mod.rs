use std::{future::Future, pin::Pin};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::{EngineError, MoneyCents, ResultEngine, locks::PairLocks};

mod access;
mod balances;
mod expenses;
mod relationships;
mod settlements;

pub use balances::{CounterpartyBalance, MemberBalance};
pub use expenses::{OwedExpense, RelatedExpenses};
pub use settlements::SettlementReceipt;

/// Future returned by a unit-of-work body passed to [`Engine::with_tx`].
pub(crate) type TxFuture<'a, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>;

/// The debt ledger engine.
///
/// Cheap to share behind an `Arc`: every operation borrows the connection
/// pool and opens its own transaction.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    strict_split_totals: bool,
    pair_locks: PairLocks,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Runs `body` as one unit of work.
    ///
    /// Commits when `body` succeeds. On error the transaction is rolled back
    /// explicitly and the original error is returned, so no operation ever
    /// leaves partial state behind.
    pub(crate) async fn with_tx<T, F>(&self, body: F) -> ResultEngine<T>
    where
        T: Send,
        F: for<'a> FnOnce(&'a Engine, &'a DatabaseTransaction) -> TxFuture<'a, T> + Send,
    {
        let db_tx = self.database.begin().await?;
        let result = body(self, &db_tx).await;
        match result {
            Ok(value) => {
                db_tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = db_tx.rollback().await {
                    tracing::warn!("rollback failed after \"{err}\": {rollback_err}");
                }
                Err(err)
            }
        }
    }
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn ensure_within_limit(amount: MoneyCents, label: &str) -> ResultEngine<()> {
    if amount.within_limit() {
        return Ok(());
    }
    Err(EngineError::InvalidAmount(format!(
        "{label} must not exceed {}",
        MoneyCents::MAX
    )))
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    strict_split_totals: bool,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Reject expenses whose splits add up to more than the expense amount.
    ///
    /// Off by default: split totals are trusted as supplied by the caller.
    pub fn strict_split_totals(mut self, enabled: bool) -> EngineBuilder {
        self.strict_split_totals = enabled;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            strict_split_totals: self.strict_split_totals,
            pair_locks: PairLocks::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(
            normalize_required_text("  Dinner ", "description").unwrap(),
            "Dinner"
        );
    }

    #[test]
    fn blank_required_text_is_rejected() {
        assert_eq!(
            normalize_required_text("   ", "description"),
            Err(EngineError::InvalidInput(
                "description must not be empty".to_string()
            ))
        );
    }

    #[test]
    fn amounts_above_the_limit_are_rejected() {
        assert_eq!(ensure_within_limit(MoneyCents::MAX, "amount"), Ok(()));
        assert_eq!(
            ensure_within_limit(MoneyCents::new(i64::MAX), "amount"),
            Err(EngineError::InvalidAmount(
                "amount must not exceed 99999999.99".to_string()
            ))
        );
    }

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(
            normalize_optional_text(Some(" cash ")),
            Some("cash".to_string())
        );
    }
}
