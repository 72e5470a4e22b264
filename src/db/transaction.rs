/*!
 * Transaction helpers for the ledger's mutating operations.
 *
 * Every write runs inside one database transaction, and all writers in the
 * process queue behind a shared [`WriteGate`] so that read-decide-write
 * sequences never interleave.
 */

use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// Process-wide serialization point for ledger mutations.
///
/// Cloning shares the same underlying lock.
#[derive(Debug, Clone, Default)]
pub struct WriteGate {
    lock: Arc<AsyncMutex<()>>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive write access. The gate is released when the guard drops.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

/// Execute a function within a database transaction
///
/// Commits when `f` returns `Ok` and rolls back otherwise. Business errors
/// raised inside the closure come back unchanged.
///
/// ```rust,ignore
/// let line = with_transaction(&db, move |txn| {
///     Box::pin(async move {
///         let line = invoice_line::Entity::find_by_id(id).one(txn).await?;
///         Ok(line)
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let transaction_id = Uuid::new_v4();
    let start = std::time::Instant::now();

    debug!(transaction_id = %transaction_id, "Starting database transaction");
    counter!("ledger_db.transaction.started", 1);

    let result = db.transaction::<F, T, ServiceError>(f).await;

    let elapsed = start.elapsed();
    histogram!("ledger_db.transaction.duration", elapsed);

    match &result {
        Ok(_) => {
            counter!("ledger_db.transaction.committed", 1);
            debug!(transaction_id = %transaction_id, "Transaction committed in {:?}", elapsed);
        }
        Err(_) => {
            counter!("ledger_db.transaction.rolled_back", 1);
            warn!(transaction_id = %transaction_id, "Transaction rolled back after {:?}", elapsed);
        }
    }

    result.map_err(|e| match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::entities::supplier;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    async fn setup() -> DatabaseConnection {
        let db = establish_connection_with_config(&DbConfig::in_memory())
            .await
            .unwrap();
        run_migrations(&db).await.unwrap();
        db
    }

    fn new_supplier(name: &str) -> supplier::ActiveModel {
        supplier::ActiveModel {
            name: Set(name.to_string()),
            contact_info: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn commits_on_success() {
        let db = setup().await;

        let id = with_transaction(&db, |txn| {
            Box::pin(async move {
                let model = new_supplier("Acme").insert(txn).await?;
                Ok(model.id)
            })
        })
        .await
        .unwrap();

        assert!(supplier::Entity::find_by_id(id)
            .one(&db)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn rolls_back_and_returns_business_error() {
        let db = setup().await;

        let result: Result<(), ServiceError> = with_transaction(&db, |txn| {
            Box::pin(async move {
                new_supplier("Rolled Back").insert(txn).await?;
                Err(ServiceError::EditConflict("abort".into()))
            })
        })
        .await;

        assert_matches!(result, Err(ServiceError::EditConflict(_)));
        assert_eq!(supplier::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn write_gate_is_shared_between_clones() {
        let gate = WriteGate::new();
        let other = gate.clone();
        let _held = gate.acquire().await;
        assert!(other.lock.try_lock().is_err());
    }
}
