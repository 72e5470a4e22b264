#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseBackend as DbBackend, Statement};
use supplier_ledger::{
    db::{self, DbConfig, DbPool},
    entities::{invoice_line, product, supplier},
    models::{FixedClock, NewProduct, NewSupplier, RecordInvoiceRequest, ShipmentMeta},
    Ledger,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Ledger over a fresh, migrated in-memory SQLite database.
///
/// The clock is pinned to 2024-02-01 so defaulted dates are predictable.
pub struct TestLedger {
    pub ledger: Ledger,
    pub pool: Arc<DbPool>,
}

impl TestLedger {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("connect to in-memory sqlite");
        db::run_migrations(&pool).await.expect("run migrations");

        let pool = Arc::new(pool);
        let ledger = Ledger::with_clock(pool.clone(), Arc::new(FixedClock(date(2024, 2, 1))));
        Self { ledger, pool }
    }

    pub async fn seed_supplier(&self, name: &str) -> supplier::Model {
        self.ledger
            .catalog()
            .create_supplier(NewSupplier {
                name: name.to_string(),
                contact_info: None,
            })
            .await
            .expect("create supplier")
    }

    pub async fn seed_product(&self, barcode: &str, name: &str) -> product::Model {
        self.ledger
            .catalog()
            .create_product(NewProduct {
                barcode: barcode.to_string(),
                name: name.to_string(),
                unit: None,
            })
            .await
            .expect("create product")
    }

    /// Records a line with no discount and no VAT, so net cost equals `price`.
    pub async fn record(
        &self,
        supplier_id: i64,
        product_id: i64,
        document_no: &str,
        invoice_date: NaiveDate,
        quantity: i32,
        price: i64,
    ) -> invoice_line::Model {
        let request = RecordInvoiceRequest::new(
            supplier_id,
            product_id,
            document_no,
            quantity,
            Decimal::from(price),
        )
        .dated(invoice_date)
        .with_pricing(Decimal::ZERO, Decimal::ZERO);

        self.ledger
            .invoices()
            .record_invoice(request)
            .await
            .expect("record invoice")
    }

    pub async fn line(&self, id: i64) -> invoice_line::Model {
        self.ledger
            .invoices()
            .get_invoice_line(id)
            .await
            .expect("invoice line exists")
    }

    /// Runs raw SQL on the single pooled connection.
    pub async fn exec(&self, sql: &str) {
        self.pool
            .execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await
            .expect("raw statement");
    }
}

pub fn shipment() -> ShipmentMeta {
    ShipmentMeta::new("SHP-1", "WH-A", "Jane Doe").dated(date(2024, 2, 10))
}
