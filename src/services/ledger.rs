//! Invoice Ledger
//!
//! Records purchase-invoice lines and guards later edits and deletions
//! against the withdrawal history kept in the movement log.

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::db::query_builder::{outstanding_lines, settled_lines};
use crate::db::{with_transaction, DbPool, LedgerFilter, WriteGate};
use crate::entities::invoice_line;
use crate::errors::ServiceError;
use crate::models::{Clock, EditInvoiceRequest, RecordInvoiceRequest};
use crate::repositories::LedgerRepository;
use crate::services::cost::{line_value, net_unit_cost};

/// Outstanding quantity and its value at net unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub quantity: i64,
    pub value: Decimal,
    /// Number of invoice lines contributing to the balance
    pub lines: u64,
}

impl BalanceSummary {
    pub fn from_lines<'a>(
        lines: impl IntoIterator<Item = &'a invoice_line::Model>,
    ) -> Result<Self, ServiceError> {
        lines
            .into_iter()
            .filter(|line| line.quantity_remaining > 0)
            .try_fold(Self::default(), |acc, line| {
                let value = line
                    .remaining_value()
                    .and_then(|value| acc.value.checked_add(value))
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "balance value overflows at invoice line {}",
                            line.id
                        ))
                    })?;
                Ok(Self {
                    quantity: acc.quantity + i64::from(line.quantity_remaining),
                    value,
                    lines: acc.lines + 1,
                })
            })
    }
}

/// Rejects a line whose full value at `net_cost` is not representable, so
/// every stored balance can be valued.
fn ensure_valuable(quantity: i32, net_cost: Decimal) -> Result<(), ServiceError> {
    line_value(quantity, net_cost).map(|_| ()).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "value of {} unit(s) at net cost {} overflows",
            quantity, net_cost
        ))
    })
}

#[derive(Clone)]
pub struct InvoiceLedgerService {
    db_pool: Arc<DbPool>,
    write_gate: WriteGate,
    clock: Arc<dyn Clock>,
}

impl InvoiceLedgerService {
    pub fn new(db_pool: Arc<DbPool>, write_gate: WriteGate, clock: Arc<dyn Clock>) -> Self {
        Self {
            db_pool,
            write_gate,
            clock,
        }
    }

    /// Records a received invoice line with its full quantity outstanding.
    #[instrument(skip(self, request), fields(supplier_id = request.supplier_id, product_id = request.product_id))]
    pub async fn record_invoice(
        &self,
        request: RecordInvoiceRequest,
    ) -> Result<invoice_line::Model, ServiceError> {
        request.validate()?;

        let invoice_date = request.invoice_date.unwrap_or_else(|| self.clock.today());
        let document_no = request.document_no.trim().to_string();
        let net_cost = net_unit_cost(request.unit_price, request.discount_pct, request.vat_pct)?;
        ensure_valuable(request.quantity, net_cost)?;

        let _guard = self.write_gate.acquire().await;
        let line = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                LedgerRepository::require_supplier(txn, request.supplier_id).await?;
                LedgerRepository::require_product(txn, request.product_id).await?;

                if LedgerRepository::document_taken(txn, request.supplier_id, &document_no, None)
                    .await?
                {
                    return Err(ServiceError::DuplicateDocument {
                        supplier_id: request.supplier_id,
                        document_no,
                    });
                }

                let now = Utc::now();
                let line = invoice_line::ActiveModel {
                    supplier_id: Set(request.supplier_id),
                    product_id: Set(request.product_id),
                    document_no: Set(document_no),
                    invoice_date: Set(invoice_date),
                    quantity_received: Set(request.quantity),
                    quantity_remaining: Set(request.quantity),
                    unit_price: Set(request.unit_price),
                    discount_pct: Set(request.discount_pct),
                    vat_pct: Set(request.vat_pct),
                    net_unit_cost: Set(net_cost),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };

                line.insert(txn).await.map_err(ServiceError::db_error)
            })
        })
        .await?;

        counter!("ledger.invoice.recorded", 1);
        info!(
            invoice_line_id = line.id,
            document_no = %line.document_no,
            quantity = line.quantity_received,
            net_unit_cost = %line.net_unit_cost,
            "Invoice line recorded"
        );

        Ok(line)
    }

    /// Replaces the editable fields of a line.
    ///
    /// After the first withdrawal the quantity is frozen: the request must
    /// repeat the received quantity, and the remaining balance is kept.
    /// Pricing is always recomputed.
    #[instrument(skip(self, request))]
    pub async fn edit_invoice(
        &self,
        id: i64,
        request: EditInvoiceRequest,
    ) -> Result<invoice_line::Model, ServiceError> {
        request.validate()?;
        let net_cost = net_unit_cost(request.unit_price, request.discount_pct, request.vat_pct)?;
        ensure_valuable(request.quantity, net_cost)?;

        let _guard = self.write_gate.acquire().await;
        let line = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let line = LedgerRepository::require_line(txn, id).await?;
                let untouched = line.is_untouched();

                if !untouched && request.quantity != line.quantity_received {
                    return Err(ServiceError::EditConflict(format!(
                        "invoice line {} already has {} unit(s) withdrawn; quantity must remain {}",
                        id,
                        line.withdrawn(),
                        line.quantity_received
                    )));
                }

                let document_no = request.document_no.trim().to_string();
                if document_no != line.document_no
                    && LedgerRepository::document_taken(txn, line.supplier_id, &document_no, Some(id))
                        .await?
                {
                    return Err(ServiceError::DuplicateDocument {
                        supplier_id: line.supplier_id,
                        document_no,
                    });
                }

                let mut active: invoice_line::ActiveModel = line.into();
                active.document_no = Set(document_no);
                active.invoice_date = Set(request.invoice_date);
                if untouched {
                    active.quantity_received = Set(request.quantity);
                    active.quantity_remaining = Set(request.quantity);
                }
                active.unit_price = Set(request.unit_price);
                active.discount_pct = Set(request.discount_pct);
                active.vat_pct = Set(request.vat_pct);
                active.net_unit_cost = Set(net_cost);
                active.updated_at = Set(Utc::now());

                active.update(txn).await.map_err(ServiceError::db_error)
            })
        })
        .await;

        match &line {
            Ok(line) => {
                counter!("ledger.invoice.edited", 1);
                info!(invoice_line_id = line.id, "Invoice line updated");
            }
            Err(ServiceError::EditConflict(reason)) => {
                counter!("ledger.invoice.edit_conflict", 1);
                warn!(invoice_line_id = id, reason = %reason, "Invoice edit rejected");
            }
            Err(_) => {}
        }

        line
    }

    /// Deletes a line that has never been drawn from.
    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, id: i64) -> Result<(), ServiceError> {
        let _guard = self.write_gate.acquire().await;
        with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let line = LedgerRepository::require_line(txn, id).await?;
                if !line.is_untouched() {
                    return Err(ServiceError::HasMovements {
                        invoice_line_id: id,
                        withdrawn: line.withdrawn(),
                    });
                }

                invoice_line::Entity::delete_by_id(id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                Ok(())
            })
        })
        .await?;

        counter!("ledger.invoice.deleted", 1);
        info!(invoice_line_id = id, "Invoice line deleted");
        Ok(())
    }

    pub async fn get_invoice_line(&self, id: i64) -> Result<invoice_line::Model, ServiceError> {
        invoice_line::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice line {} not found", id)))
    }

    /// Sums the outstanding quantity and value for the filter.
    #[instrument(skip(self))]
    pub async fn query_balance(&self, filter: LedgerFilter) -> Result<BalanceSummary, ServiceError> {
        let lines = outstanding_lines(&filter)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        BalanceSummary::from_lines(&lines)
    }

    /// Lines with a remaining balance, oldest first (date, then id).
    pub async fn list_outstanding_invoice_lines(
        &self,
        filter: LedgerFilter,
    ) -> Result<Vec<invoice_line::Model>, ServiceError> {
        outstanding_lines(&filter)
            .order_by_asc(invoice_line::Column::InvoiceDate)
            .order_by_asc(invoice_line::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Fully withdrawn lines, most recent invoice first.
    pub async fn list_settled_invoice_lines(
        &self,
        filter: LedgerFilter,
    ) -> Result<Vec<invoice_line::Model>, ServiceError> {
        settled_lines(&filter)
            .order_by_desc(invoice_line::Column::InvoiceDate)
            .order_by_desc(invoice_line::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn line(id: i64, received: i32, remaining: i32, cost: Decimal) -> invoice_line::Model {
        let now = Utc::now();
        invoice_line::Model {
            id,
            supplier_id: 1,
            product_id: 1,
            document_no: format!("INV-{}", id),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            quantity_received: received,
            quantity_remaining: remaining,
            unit_price: cost,
            discount_pct: Decimal::ZERO,
            vat_pct: Decimal::ZERO,
            net_unit_cost: cost,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn balance_summary_sums_remaining_at_cost() {
        let lines = vec![
            line(1, 50, 0, dec!(10)),
            line(2, 30, 20, dec!(12)),
            line(3, 5, 5, dec!(1.5)),
        ];
        let summary = BalanceSummary::from_lines(&lines).unwrap();
        assert_eq!(summary.quantity, 25);
        assert_eq!(summary.value, dec!(247.5));
        assert_eq!(summary.lines, 2);
    }

    #[test]
    fn empty_balance_is_zero() {
        let summary = BalanceSummary::from_lines(Vec::<invoice_line::Model>::new().iter()).unwrap();
        assert_eq!(summary, BalanceSummary::default());
    }

    #[test]
    fn balance_overflow_is_an_error() {
        let lines = vec![line(1, 10, 10, Decimal::MAX)];
        assert!(matches!(
            BalanceSummary::from_lines(&lines),
            Err(ServiceError::InternalError(_))
        ));
    }

    #[test]
    fn unvaluable_quantity_is_invalid_input() {
        assert!(ensure_valuable(3, dec!(108)).is_ok());
        assert!(matches!(
            ensure_valuable(3, Decimal::MAX),
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
