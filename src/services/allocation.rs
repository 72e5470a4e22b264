//! Allocation Engine
//!
//! Turns a withdrawal request into deductions against outstanding invoice
//! lines. `allocate` drains a (supplier, product) balance oldest-first;
//! `allocate_bulk` draws from invoice lines picked by the caller.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::db::{with_transaction, DbPool, WriteGate};
use crate::entities::{invoice_line, movement};
use crate::errors::ServiceError;
use crate::models::{AllocationRequest, BulkAllocationLine, Clock, ShipmentMeta};
use crate::repositories::LedgerRepository;

/// One step of a FIFO plan: take `quantity` from `invoice_line_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDeduction {
    pub invoice_line_id: i64,
    pub quantity: i32,
}

/// Plans a withdrawal of `requested` units across `lines`, oldest first.
///
/// Lines are ordered by invoice date, then id, regardless of input order.
/// Lines with nothing remaining are ignored. The plan is all-or-nothing: if
/// the lines together hold less than `requested`, nothing is planned and
/// the available total is reported.
pub fn plan_fifo(
    lines: &[invoice_line::Model],
    requested: i32,
) -> Result<Vec<PlannedDeduction>, ServiceError> {
    if requested < 1 {
        return Err(ServiceError::InvalidInput(format!(
            "quantity must be at least 1, got {}",
            requested
        )));
    }

    let mut ordered: Vec<&invoice_line::Model> = lines
        .iter()
        .filter(|line| line.quantity_remaining > 0)
        .collect();
    ordered.sort_by_key(|line| (line.invoice_date, line.id));

    let available: i64 = ordered
        .iter()
        .map(|line| i64::from(line.quantity_remaining))
        .sum();
    if available < i64::from(requested) {
        return Err(ServiceError::InsufficientBalance {
            available,
            requested: i64::from(requested),
        });
    }

    let mut still_needed = requested;
    let mut plan = Vec::new();
    for line in ordered {
        if still_needed == 0 {
            break;
        }
        let take = line.quantity_remaining.min(still_needed);
        plan.push(PlannedDeduction {
            invoice_line_id: line.id,
            quantity: take,
        });
        still_needed -= take;
    }

    Ok(plan)
}

/// Movements written by a successful allocation, one per invoice line touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub movements: Vec<movement::Model>,
    pub total_quantity: i32,
}

/// Why a bulk entry was left out of the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InvalidQuantity,
    LineNotFound,
    ExceedsRemaining { remaining: i32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidQuantity => write!(f, "quantity must be positive"),
            SkipReason::LineNotFound => write!(f, "invoice line not found"),
            SkipReason::ExceedsRemaining { remaining } => {
                write!(f, "only {} remaining on invoice line", remaining)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLine {
    pub entry: BulkAllocationLine,
    pub reason: SkipReason,
}

/// Result of an invoice-targeted withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAllocationOutcome {
    /// Number of entries applied
    pub applied: usize,
    pub movements: Vec<movement::Model>,
    /// Entries rejected by validation, in request order
    pub skipped: Vec<SkippedLine>,
}

#[derive(Clone)]
pub struct AllocationService {
    db_pool: Arc<DbPool>,
    write_gate: WriteGate,
    clock: Arc<dyn Clock>,
}

impl AllocationService {
    pub fn new(db_pool: Arc<DbPool>, write_gate: WriteGate, clock: Arc<dyn Clock>) -> Self {
        Self {
            db_pool,
            write_gate,
            clock,
        }
    }

    /// FIFO withdrawal from a supplier's balance of one product.
    ///
    /// Either every planned deduction and movement is committed, or none is.
    #[instrument(
        skip(self, request),
        fields(
            supplier_id = request.supplier_id,
            product_id = request.product_id,
            quantity = request.quantity
        )
    )]
    pub async fn allocate(
        &self,
        request: AllocationRequest,
    ) -> Result<AllocationOutcome, ServiceError> {
        if request.quantity < 1 {
            counter!("ledger.allocation.invalid", 1);
            return Err(ServiceError::InvalidInput(format!(
                "quantity must be at least 1, got {}",
                request.quantity
            )));
        }
        request.validate()?;

        let movement_date = request
            .shipment
            .movement_date
            .unwrap_or_else(|| self.clock.today());

        let _guard = self.write_gate.acquire().await;
        let result = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let lines = LedgerRepository::fifo_candidates(
                    txn,
                    request.supplier_id,
                    request.product_id,
                )
                .await?;
                let plan = plan_fifo(&lines, request.quantity)?;

                let mut by_id: HashMap<i64, invoice_line::Model> =
                    lines.into_iter().map(|line| (line.id, line)).collect();
                let mut movements = Vec::with_capacity(plan.len());

                for step in plan {
                    let line = by_id.remove(&step.invoice_line_id).ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "planned invoice line {} missing from candidates",
                            step.invoice_line_id
                        ))
                    })?;
                    let (_, movement) = LedgerRepository::withdraw(
                        txn,
                        line,
                        step.quantity,
                        &request.shipment,
                        movement_date,
                    )
                    .await?;
                    movements.push(movement);
                }

                Ok(AllocationOutcome {
                    movements,
                    total_quantity: request.quantity,
                })
            })
        })
        .await;

        match &result {
            Ok(outcome) => {
                counter!("ledger.allocation.success", 1);
                info!(
                    movements = outcome.movements.len(),
                    total_quantity = outcome.total_quantity,
                    "Allocation committed"
                );
            }
            Err(ServiceError::InsufficientBalance {
                available,
                requested,
            }) => {
                counter!("ledger.allocation.insufficient_balance", 1);
                warn!(available, requested, "Allocation rejected: insufficient balance");
            }
            Err(e) => {
                counter!("ledger.allocation.failed", 1);
                warn!(error = %e, "Allocation failed");
            }
        }

        result
    }

    /// Withdraws from caller-chosen invoice lines.
    ///
    /// Each entry is checked against the line's remaining balance at the
    /// time it is applied, so repeated entries for one line see the earlier
    /// deductions. Invalid entries are skipped and reported. The batch runs
    /// in one transaction; with nothing applicable it fails with
    /// [`ServiceError::NoOperationsApplied`] and writes nothing.
    #[instrument(skip(self, entries, shipment), fields(entries = entries.len()))]
    pub async fn allocate_bulk(
        &self,
        entries: Vec<BulkAllocationLine>,
        shipment: ShipmentMeta,
    ) -> Result<BulkAllocationOutcome, ServiceError> {
        shipment.validate()?;
        if entries.is_empty() {
            return Err(ServiceError::NoOperationsApplied { skipped: 0 });
        }

        let movement_date = shipment.movement_date.unwrap_or_else(|| self.clock.today());

        let _guard = self.write_gate.acquire().await;
        let result = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let mut movements = Vec::new();
                let mut skipped = Vec::new();

                for entry in entries {
                    if entry.quantity <= 0 {
                        skipped.push(SkippedLine {
                            entry,
                            reason: SkipReason::InvalidQuantity,
                        });
                        continue;
                    }

                    let line = match LedgerRepository::find_line(txn, entry.invoice_line_id).await? {
                        Some(line) => line,
                        None => {
                            skipped.push(SkippedLine {
                                entry,
                                reason: SkipReason::LineNotFound,
                            });
                            continue;
                        }
                    };

                    if entry.quantity > line.quantity_remaining {
                        skipped.push(SkippedLine {
                            entry,
                            reason: SkipReason::ExceedsRemaining {
                                remaining: line.quantity_remaining,
                            },
                        });
                        continue;
                    }

                    let (_, movement) = LedgerRepository::withdraw(
                        txn,
                        line,
                        entry.quantity,
                        &shipment,
                        movement_date,
                    )
                    .await?;
                    movements.push(movement);
                }

                if movements.is_empty() {
                    return Err(ServiceError::NoOperationsApplied {
                        skipped: skipped.len(),
                    });
                }

                Ok(BulkAllocationOutcome {
                    applied: movements.len(),
                    movements,
                    skipped,
                })
            })
        })
        .await;

        match &result {
            Ok(outcome) => {
                counter!("ledger.bulk_allocation.success", 1);
                for skip in &outcome.skipped {
                    warn!(
                        invoice_line_id = skip.entry.invoice_line_id,
                        quantity = skip.entry.quantity,
                        reason = %skip.reason,
                        "Bulk entry skipped"
                    );
                }
                info!(
                    applied = outcome.applied,
                    skipped = outcome.skipped.len(),
                    "Bulk allocation committed"
                );
            }
            Err(e) => {
                counter!("ledger.bulk_allocation.failed", 1);
                warn!(error = %e, "Bulk allocation failed");
            }
        }

        result
    }
}
