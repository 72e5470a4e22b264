//! Seed data script - populates the ledger with a small demo scenario
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 2 suppliers and 3 products
//! - 5 invoice lines spread over January
//! - 2 shipments drawn from the oldest invoices
//!
//! Uses `DATABASE_URL` when set, otherwise the configured database. The
//! schema is migrated before anything is written.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::info;

use supplier_ledger::{
    config, db,
    models::{AllocationRequest, NewProduct, NewSupplier, RecordInvoiceRequest, ShipmentMeta},
    Ledger, LedgerSettings,
};

fn day(d: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 1, d).context("invalid seed date")
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    if let Ok(url) = std::env::var("DATABASE_URL") {
        cfg.database_url = url;
    }

    info!("=== Supplier Ledger Seed Data ===");
    info!("Connecting to database: {}", cfg.database_url());
    let pool = db::establish_connection_from_app_config(&cfg).await?;
    db::run_migrations(&pool).await?;

    let ledger = Ledger::with_settings(
        Arc::new(pool),
        Arc::new(supplier_ledger::models::SystemClock),
        LedgerSettings::from(&cfg),
    );
    let catalog = ledger.catalog();

    info!("Creating suppliers...");
    let acme = catalog
        .create_supplier(NewSupplier {
            name: "Acme Wholesale".into(),
            contact_info: Some("orders@acme.example".into()),
        })
        .await?;
    let nordic = catalog
        .create_supplier(NewSupplier {
            name: "Nordic Parts".into(),
            contact_info: None,
        })
        .await?;

    info!("Creating products...");
    let bolts = catalog
        .create_product(NewProduct {
            barcode: "4006381333931".into(),
            name: "Hex bolt M8".into(),
            unit: None,
        })
        .await?;
    let cable = catalog
        .create_product(NewProduct {
            barcode: "5901234123457".into(),
            name: "Copper cable 2.5mm".into(),
            unit: Some("m".into()),
        })
        .await?;
    let gloves = catalog
        .create_product(NewProduct {
            barcode: "9780201379624".into(),
            name: "Work gloves".into(),
            unit: Some("pair".into()),
        })
        .await?;

    info!("Recording invoices...");
    let invoices = vec![
        RecordInvoiceRequest::new(acme.id, bolts.id, "ACM-1001", 50, dec!(10)).dated(day(2)?),
        RecordInvoiceRequest::new(acme.id, bolts.id, "ACM-1002", 30, dec!(12))
            .dated(day(9)?)
            .with_pricing(dec!(5), dec!(20)),
        RecordInvoiceRequest::new(acme.id, cable.id, "ACM-1003", 200, dec!(1.8)).dated(day(9)?),
        RecordInvoiceRequest::new(nordic.id, bolts.id, "NP-77", 40, dec!(9.5)).dated(day(4)?),
        RecordInvoiceRequest::new(nordic.id, gloves.id, "NP-78", 25, dec!(4.2))
            .dated(day(15)?)
            .with_pricing(dec!(10), dec!(8)),
    ];
    for request in invoices {
        ledger.invoices().record_invoice(request).await?;
    }

    info!("Shipping stock...");
    let outcome = ledger
        .allocation()
        .allocate(AllocationRequest {
            supplier_id: acme.id,
            product_id: bolts.id,
            quantity: 60,
            shipment: ShipmentMeta::new("SHP-001", "WH-NORTH", "Site crew A").dated(day(20)?),
        })
        .await?;
    info!("  Allocation touched {} invoice line(s)", outcome.movements.len());

    ledger
        .allocation()
        .allocate(AllocationRequest {
            supplier_id: nordic.id,
            product_id: gloves.id,
            quantity: 10,
            shipment: ShipmentMeta::new("SHP-002", "WH-SOUTH", "Site crew B").dated(day(21)?),
        })
        .await?;

    let dashboard = ledger.reports().dashboard().await?;
    println!("{}", serde_json::to_string_pretty(&dashboard)?);

    info!("=== Seed Data Complete ===");
    Ok(())
}
