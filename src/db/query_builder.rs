use crate::entities::{invoice_line, movement};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, Select};
use serde::{Deserialize, Serialize};

/// Optional supplier/product predicates shared by the ledger's list and
/// aggregate queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    pub supplier_id: Option<i64>,
    pub product_id: Option<i64>,
}

impl LedgerFilter {
    /// Matches everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Exact (supplier, product) pair, as used by FIFO allocation
    pub fn pair(supplier_id: i64, product_id: i64) -> Self {
        Self {
            supplier_id: Some(supplier_id),
            product_id: Some(product_id),
        }
    }

    pub fn supplier(mut self, supplier_id: i64) -> Self {
        self.supplier_id = Some(supplier_id);
        self
    }

    pub fn product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    fn condition<S, P>(&self, supplier_col: S, product_col: P) -> Condition
    where
        S: ColumnTrait,
        P: ColumnTrait,
    {
        let mut cond = Condition::all();
        if let Some(supplier_id) = self.supplier_id {
            cond = cond.add(supplier_col.eq(supplier_id));
        }
        if let Some(product_id) = self.product_id {
            cond = cond.add(product_col.eq(product_id));
        }
        cond
    }

    pub fn invoice_condition(&self) -> Condition {
        self.condition(
            invoice_line::Column::SupplierId,
            invoice_line::Column::ProductId,
        )
    }

    pub fn movement_condition(&self) -> Condition {
        self.condition(movement::Column::SupplierId, movement::Column::ProductId)
    }
}

/// Applies a [`LedgerFilter`] to a select over one of the ledger tables.
pub trait FilterExt: Sized {
    fn apply_filter(self, filter: &LedgerFilter) -> Self;
}

impl FilterExt for Select<invoice_line::Entity> {
    fn apply_filter(self, filter: &LedgerFilter) -> Self {
        self.filter(filter.invoice_condition())
    }
}

impl FilterExt for Select<movement::Entity> {
    fn apply_filter(self, filter: &LedgerFilter) -> Self {
        self.filter(filter.movement_condition())
    }
}

/// Outstanding lines (remaining > 0) for the filter, without ordering.
pub fn outstanding_lines(filter: &LedgerFilter) -> Select<invoice_line::Entity> {
    invoice_line::Entity::find()
        .apply_filter(filter)
        .filter(invoice_line::Column::QuantityRemaining.gt(0))
}

/// Fully drawn lines (remaining == 0) for the filter, without ordering.
pub fn settled_lines(filter: &LedgerFilter) -> Select<invoice_line::Entity> {
    invoice_line::Entity::find()
        .apply_filter(filter)
        .filter(invoice_line::Column::QuantityRemaining.eq(0))
}
