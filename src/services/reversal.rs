use metrics::counter;
use sea_orm::{EntityTrait, ModelTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::db::{with_transaction, DbPool, WriteGate};
use crate::entities::{invoice_line, movement};
use crate::errors::ServiceError;
use crate::repositories::LedgerRepository;

/// The deleted movement and the invoice line it was returned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalOutcome {
    pub movement: movement::Model,
    pub invoice_line: invoice_line::Model,
}

/// Undoes withdrawals by deleting the movement and restoring its quantity.
#[derive(Clone)]
pub struct ReversalService {
    db_pool: Arc<DbPool>,
    write_gate: WriteGate,
}

impl ReversalService {
    pub fn new(db_pool: Arc<DbPool>, write_gate: WriteGate) -> Self {
        Self {
            db_pool,
            write_gate,
        }
    }

    /// Deletes movement `id` and adds its quantity back to the source line.
    ///
    /// Reversing the same id twice fails the second time with
    /// [`ServiceError::MovementNotFound`], so a balance is never restored twice.
    #[instrument(skip(self))]
    pub async fn reverse_movement(&self, id: i64) -> Result<ReversalOutcome, ServiceError> {
        let _guard = self.write_gate.acquire().await;
        let result = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let movement = movement::Entity::find_by_id(id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or(ServiceError::MovementNotFound(id))?;

                let line = LedgerRepository::find_line(txn, movement.invoice_line_id)
                    .await?
                    .ok_or(ServiceError::SourceInvoiceMissing {
                        movement_id: id,
                        invoice_line_id: movement.invoice_line_id,
                    })?;

                movement
                    .clone()
                    .delete(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                let invoice_line = LedgerRepository::restore(txn, line, movement.quantity).await?;

                Ok(ReversalOutcome {
                    movement,
                    invoice_line,
                })
            })
        })
        .await;

        match &result {
            Ok(outcome) => {
                counter!("ledger.reversal.success", 1);
                info!(
                    invoice_line_id = outcome.invoice_line.id,
                    quantity = outcome.movement.quantity,
                    remaining = outcome.invoice_line.quantity_remaining,
                    "Movement reversed"
                );
            }
            Err(ServiceError::SourceInvoiceMissing {
                invoice_line_id, ..
            }) => {
                counter!("ledger.reversal.orphaned", 1);
                error!(invoice_line_id, "Movement references a missing invoice line");
            }
            Err(_) => {
                counter!("ledger.reversal.failed", 1);
            }
        }

        result
    }
}
