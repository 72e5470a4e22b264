//! Dashboard and balance report
//!
//! Read-only aggregates over the ledger. Monetary figures are summed exactly
//! and rounded with [`round_currency`] only when they leave the report.
//! Ids that no longer resolve to a catalog entry render as `#<id>`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::instrument;

use crate::db::query_builder::{outstanding_lines, settled_lines, FilterExt};
use crate::db::{DbPool, LedgerFilter};
use crate::entities::{invoice_line, movement, product, supplier};
use crate::errors::ServiceError;
use crate::services::cost::{checked_total, round_currency};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierBalance {
    pub supplier_id: i64,
    pub supplier_name: String,
    pub quantity: i64,
    /// Rounded to two decimal places
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_quantity: i64,
    /// Exact sum of every supplier's balance, rounded to two decimal places
    pub total_value: Decimal,
    pub suppliers: Vec<SupplierBalance>,
}

/// An invoice line with its supplier and product names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineView {
    pub id: i64,
    pub supplier_id: i64,
    pub supplier_name: String,
    pub product_id: i64,
    pub product_name: String,
    pub document_no: String,
    pub invoice_date: NaiveDate,
    pub quantity_received: i32,
    pub quantity_remaining: i32,
    pub net_unit_cost: Decimal,
    /// Rounded to two decimal places
    pub remaining_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementView {
    pub id: i64,
    pub invoice_line_id: i64,
    pub supplier_name: String,
    pub product_name: String,
    pub quantity: i32,
    pub shipment_no: String,
    pub destination: String,
    pub recipient: String,
    pub movement_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceReport {
    pub outstanding: Vec<InvoiceLineView>,
    pub settled: Vec<InvoiceLineView>,
    /// Exact sum of remaining value over `outstanding`, rounded to two places
    pub grand_total: Decimal,
    pub recent_movements: Vec<MovementView>,
}

fn exact_value(line: &invoice_line::Model) -> Result<Decimal, ServiceError> {
    line.remaining_value().ok_or_else(|| {
        ServiceError::InternalError(format!(
            "remaining value of invoice line {} overflows",
            line.id
        ))
    })
}

fn fallback_name(id: i64) -> String {
    format!("#{}", id)
}

/// Catalog names for the ids a report refers to.
#[derive(Debug, Default)]
struct Names {
    suppliers: HashMap<i64, String>,
    products: HashMap<i64, String>,
}

impl Names {
    /// Loads only the referenced suppliers and products.
    async fn load<C: ConnectionTrait>(
        conn: &C,
        supplier_ids: BTreeSet<i64>,
        product_ids: BTreeSet<i64>,
    ) -> Result<Self, ServiceError> {
        let mut names = Self::default();

        if !supplier_ids.is_empty() {
            names.suppliers = supplier::Entity::find()
                .filter(supplier::Column::Id.is_in(supplier_ids))
                .all(conn)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|s| (s.id, s.name))
                .collect();
        }
        if !product_ids.is_empty() {
            names.products = product::Entity::find()
                .filter(product::Column::Id.is_in(product_ids))
                .all(conn)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|p| (p.id, p.name))
                .collect();
        }

        Ok(names)
    }

    fn supplier(&self, id: i64) -> String {
        self.suppliers
            .get(&id)
            .cloned()
            .unwrap_or_else(|| fallback_name(id))
    }

    fn product(&self, id: i64) -> String {
        self.products
            .get(&id)
            .cloned()
            .unwrap_or_else(|| fallback_name(id))
    }

    fn line_view(&self, line: &invoice_line::Model) -> Result<InvoiceLineView, ServiceError> {
        Ok(InvoiceLineView {
            id: line.id,
            supplier_id: line.supplier_id,
            supplier_name: self.supplier(line.supplier_id),
            product_id: line.product_id,
            product_name: self.product(line.product_id),
            document_no: line.document_no.clone(),
            invoice_date: line.invoice_date,
            quantity_received: line.quantity_received,
            quantity_remaining: line.quantity_remaining,
            net_unit_cost: line.net_unit_cost,
            remaining_value: round_currency(exact_value(line)?),
        })
    }

    fn movement_view(&self, m: movement::Model) -> MovementView {
        MovementView {
            id: m.id,
            invoice_line_id: m.invoice_line_id,
            supplier_name: self.supplier(m.supplier_id),
            product_name: self.product(m.product_id),
            quantity: m.quantity,
            shipment_no: m.shipment_no,
            destination: m.destination,
            recipient: m.recipient,
            movement_date: m.movement_date,
        }
    }
}

/// Folds outstanding lines, each paired with its supplier, into per-supplier
/// totals ordered by supplier name.
fn supplier_balances(
    rows: &[(invoice_line::Model, Option<supplier::Model>)],
) -> Result<(Vec<SupplierBalance>, Decimal), ServiceError> {
    let mut totals: BTreeMap<i64, (String, i64, Decimal)> = BTreeMap::new();
    for (line, owner) in rows.iter().filter(|(l, _)| l.quantity_remaining > 0) {
        let value = exact_value(line)?;
        let entry = totals.entry(line.supplier_id).or_insert_with(|| {
            let name = owner
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_else(|| fallback_name(line.supplier_id));
            (name, 0, Decimal::ZERO)
        });
        entry.1 += i64::from(line.quantity_remaining);
        entry.2 = checked_total([entry.2, value])?;
    }

    let total_value = checked_total(totals.values().map(|(_, _, value)| *value))?;
    let mut balances: Vec<SupplierBalance> = totals
        .into_iter()
        .map(|(supplier_id, (supplier_name, quantity, value))| SupplierBalance {
            supplier_id,
            supplier_name,
            quantity,
            value: round_currency(value),
        })
        .collect();
    balances.sort_by(|a, b| {
        a.supplier_name
            .cmp(&b.supplier_name)
            .then(a.supplier_id.cmp(&b.supplier_id))
    });
    Ok((balances, total_value))
}

#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
    movement_limit: u64,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>, movement_limit: u64) -> Self {
        Self {
            db_pool,
            movement_limit,
        }
    }

    /// Totals across all suppliers plus a per-supplier breakdown.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardStats, ServiceError> {
        let rows = outstanding_lines(&LedgerFilter::all())
            .find_also_related(supplier::Entity)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let (suppliers, total_value) = supplier_balances(&rows)?;
        Ok(DashboardStats {
            total_quantity: suppliers.iter().map(|s| s.quantity).sum(),
            total_value: round_currency(total_value),
            suppliers,
        })
    }

    #[instrument(skip(self))]
    pub async fn balance_report(&self, filter: LedgerFilter) -> Result<BalanceReport, ServiceError> {
        let conn = self.db_pool.as_ref();

        let outstanding_models = outstanding_lines(&filter)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;
        let settled_models = settled_lines(&filter)
            .order_by_desc(invoice_line::Column::InvoiceDate)
            .order_by_desc(invoice_line::Column::Id)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;
        let movement_models = movement::Entity::find()
            .apply_filter(&filter)
            .order_by_desc(movement::Column::Id)
            .limit(self.movement_limit)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;

        let supplier_ids = outstanding_models
            .iter()
            .chain(&settled_models)
            .map(|l| l.supplier_id)
            .chain(movement_models.iter().map(|m| m.supplier_id))
            .collect();
        let product_ids = outstanding_models
            .iter()
            .chain(&settled_models)
            .map(|l| l.product_id)
            .chain(movement_models.iter().map(|m| m.product_id))
            .collect();
        let names = Names::load(conn, supplier_ids, product_ids).await?;

        let grand_total = checked_total(
            outstanding_models
                .iter()
                .map(exact_value)
                .collect::<Result<Vec<_>, _>>()?,
        )?;

        let mut outstanding = outstanding_models
            .iter()
            .map(|l| names.line_view(l))
            .collect::<Result<Vec<_>, _>>()?;
        outstanding.sort_by(|a, b| {
            a.supplier_name
                .cmp(&b.supplier_name)
                .then_with(|| a.product_name.cmp(&b.product_name))
                .then(a.invoice_date.cmp(&b.invoice_date))
                .then(a.id.cmp(&b.id))
        });

        let settled = settled_models
            .iter()
            .map(|l| names.line_view(l))
            .collect::<Result<Vec<_>, _>>()?;

        let recent_movements = movement_models
            .into_iter()
            .map(|m| names.movement_view(m))
            .collect();

        Ok(BalanceReport {
            outstanding,
            settled,
            grand_total: round_currency(grand_total),
            recent_movements,
        })
    }
}
