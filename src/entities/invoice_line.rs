use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One receipt of a product from a supplier on a purchase invoice.
///
/// `quantity_remaining` is the part of the receipt still owed by the
/// supplier. It never exceeds `quantity_received`, and the difference always
/// equals the sum of the line's movement quantities.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub supplier_id: i64,
    pub product_id: i64,
    pub document_no: String,
    pub invoice_date: NaiveDate,
    pub quantity_received: i32,
    pub quantity_remaining: i32,
    #[sea_orm(column_type = "Decimal(None)")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(None)")]
    pub discount_pct: Decimal,
    #[sea_orm(column_type = "Decimal(None)")]
    pub vat_pct: Decimal,
    #[sea_orm(column_type = "Decimal(None)")]
    pub net_unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Units already withdrawn through movements
    pub fn withdrawn(&self) -> i32 {
        self.quantity_received - self.quantity_remaining
    }

    /// True until the first withdrawal
    pub fn is_untouched(&self) -> bool {
        self.quantity_remaining == self.quantity_received
    }

    /// Value of the remaining balance at net unit cost, `None` on overflow
    pub fn remaining_value(&self) -> Option<Decimal> {
        Decimal::from(self.quantity_remaining).checked_mul(self.net_unit_cost)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::movement::Entity")]
    Movements,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
