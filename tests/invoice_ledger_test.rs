mod common;

use assert_matches::assert_matches;
use common::{date, shipment, TestLedger};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use supplier_ledger::{
    db::LedgerFilter,
    errors::ServiceError,
    models::{AllocationRequest, EditInvoiceRequest, RecordInvoiceRequest},
};

fn edit(document_no: &str, quantity: i32, price: i64, vat: i64) -> EditInvoiceRequest {
    EditInvoiceRequest {
        document_no: document_no.to_string(),
        invoice_date: date(2024, 1, 1),
        quantity,
        unit_price: Decimal::from(price),
        discount_pct: Decimal::ZERO,
        vat_pct: Decimal::from(vat),
    }
}

#[tokio::test]
async fn record_computes_net_cost_and_full_balance() {
    let t = TestLedger::new().await;
    let s = t.seed_supplier("Acme").await;
    let p = t.seed_product("111", "Bolts").await;

    let line = t
        .ledger
        .invoices()
        .record_invoice(
            RecordInvoiceRequest::new(s.id, p.id, "  INV-7 ", 12, dec!(100))
                .with_pricing(dec!(10), dec!(20)),
        )
        .await
        .expect("record");

    assert_eq!(line.document_no, "INV-7");
    assert_eq!(line.quantity_received, 12);
    assert_eq!(line.quantity_remaining, 12);
    assert_eq!(line.net_unit_cost, Decimal::from(108));
    // Defaulted from the ledger clock.
    assert_eq!(line.invoice_date, date(2024, 2, 1));
}

#[tokio::test]
async fn duplicate_document_is_rejected_per_supplier() {
    let t = TestLedger::new().await;
    let s1 = t.seed_supplier("Acme").await;
    let s2 = t.seed_supplier("Nordic").await;
    let p = t.seed_product("111", "Bolts").await;
    t.record(s1.id, p.id, "INV-1", date(2024, 1, 1), 5, 10).await;

    let err = t
        .ledger
        .invoices()
        .record_invoice(RecordInvoiceRequest::new(s1.id, p.id, "INV-1", 3, dec!(10)))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::DuplicateDocument { supplier_id, ref document_no }
            if supplier_id == s1.id && document_no == "INV-1"
    );

    // Another supplier may reuse the number.
    t.record(s2.id, p.id, "INV-1", date(2024, 1, 1), 5, 10).await;
}

#[tokio::test]
async fn record_validates_input_and_references() {
    let t = TestLedger::new().await;
    let s = t.seed_supplier("Acme").await;
    let p = t.seed_product("111", "Bolts").await;

    assert_matches!(
        t.ledger
            .invoices()
            .record_invoice(RecordInvoiceRequest::new(s.id, p.id, "X", 0, dec!(10)))
            .await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        t.ledger
            .invoices()
            .record_invoice(RecordInvoiceRequest::new(s.id, p.id, "X", 1, dec!(-1)))
            .await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        t.ledger
            .invoices()
            .record_invoice(RecordInvoiceRequest::new(s.id, 404, "X", 1, dec!(10)))
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        t.ledger
            .invoices()
            .record_invoice(RecordInvoiceRequest::new(404, p.id, "X", 1, dec!(10)))
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn untouched_line_accepts_any_edit() {
    let t = TestLedger::new().await;
    let s = t.seed_supplier("Acme").await;
    let p = t.seed_product("111", "Bolts").await;
    let line = t.record(s.id, p.id, "A", date(2024, 1, 1), 10, 10).await;

    let edited = t
        .ledger
        .invoices()
        .edit_invoice(line.id, edit("A-2", 15, 20, 0))
        .await
        .expect("edit");

    assert_eq!(edited.document_no, "A-2");
    assert_eq!(edited.quantity_received, 15);
    assert_eq!(edited.quantity_remaining, 15);
    assert_eq!(edited.net_unit_cost, Decimal::from(20));
}

#[tokio::test]
async fn touched_line_freezes_quantity_but_not_pricing() {
    let t = TestLedger::new().await;
    let s = t.seed_supplier("Acme").await;
    let p = t.seed_product("111", "Bolts").await;
    let line = t.record(s.id, p.id, "A", date(2024, 1, 1), 10, 10).await;
    t.ledger
        .allocation()
        .allocate(AllocationRequest {
            supplier_id: s.id,
            product_id: p.id,
            quantity: 3,
            shipment: shipment(),
        })
        .await
        .unwrap();

    assert_matches!(
        t.ledger
            .invoices()
            .edit_invoice(line.id, edit("A", 5, 10, 0))
            .await,
        Err(ServiceError::EditConflict(_))
    );
    assert_eq!(t.line(line.id).await.quantity_remaining, 7);

    let edited = t
        .ledger
        .invoices()
        .edit_invoice(line.id, edit("A", 10, 200, 10))
        .await
        .expect("pricing edit");
    assert_eq!(edited.quantity_received, 10);
    assert_eq!(edited.quantity_remaining, 7);
    assert_eq!(edited.net_unit_cost, Decimal::from(220));
}

#[tokio::test]
async fn edit_rejects_taken_document_number() {
    let t = TestLedger::new().await;
    let s = t.seed_supplier("Acme").await;
    let p = t.seed_product("111", "Bolts").await;
    t.record(s.id, p.id, "A", date(2024, 1, 1), 10, 10).await;
    let b = t.record(s.id, p.id, "B", date(2024, 1, 2), 10, 10).await;

    assert_matches!(
        t.ledger.invoices().edit_invoice(b.id, edit("A", 10, 10, 0)).await,
        Err(ServiceError::DuplicateDocument { .. })
    );
    // Keeping its own number is fine.
    t.ledger
        .invoices()
        .edit_invoice(b.id, edit("B", 10, 11, 0))
        .await
        .expect("same document");
}

#[tokio::test]
async fn edit_and_delete_of_unknown_line_are_not_found() {
    let t = TestLedger::new().await;
    assert_matches!(
        t.ledger.invoices().edit_invoice(77, edit("A", 1, 1, 0)).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        t.ledger.invoices().delete_invoice(77).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn delete_is_guarded_by_movements() {
    let t = TestLedger::new().await;
    let s = t.seed_supplier("Acme").await;
    let p = t.seed_product("111", "Bolts").await;
    let drawn = t.record(s.id, p.id, "A", date(2024, 1, 1), 10, 10).await;
    let fresh = t.record(s.id, p.id, "B", date(2024, 1, 2), 10, 10).await;
    t.ledger
        .allocation()
        .allocate(AllocationRequest {
            supplier_id: s.id,
            product_id: p.id,
            quantity: 1,
            shipment: shipment(),
        })
        .await
        .unwrap();

    assert_matches!(
        t.ledger.invoices().delete_invoice(drawn.id).await,
        Err(ServiceError::HasMovements { invoice_line_id, withdrawn: 1 }) if invoice_line_id == drawn.id
    );
    t.ledger.invoices().delete_invoice(fresh.id).await.expect("delete");
    assert_matches!(
        t.ledger.invoices().get_invoice_line(fresh.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn balance_and_listings_follow_filters() {
    let t = TestLedger::new().await;
    let s1 = t.seed_supplier("Acme").await;
    let s2 = t.seed_supplier("Nordic").await;
    let p = t.seed_product("111", "Bolts").await;
    let a = t.record(s1.id, p.id, "A", date(2024, 1, 1), 10, 10).await;
    let b = t.record(s1.id, p.id, "B", date(2024, 1, 3), 5, 12).await;
    t.record(s2.id, p.id, "C", date(2024, 1, 2), 4, 10).await;
    t.ledger
        .allocation()
        .allocate(AllocationRequest {
            supplier_id: s1.id,
            product_id: p.id,
            quantity: 10,
            shipment: shipment(),
        })
        .await
        .unwrap();

    let all = t.ledger.invoices().query_balance(LedgerFilter::all()).await.unwrap();
    assert_eq!(all.quantity, 9);
    assert_eq!(all.value, Decimal::from(100));
    assert_eq!(all.lines, 2);

    let acme = t
        .ledger
        .invoices()
        .query_balance(LedgerFilter::all().supplier(s1.id))
        .await
        .unwrap();
    assert_eq!(acme.quantity, 5);
    assert_eq!(acme.value, Decimal::from(60));

    let outstanding = t
        .ledger
        .invoices()
        .list_outstanding_invoice_lines(LedgerFilter::all().product(p.id))
        .await
        .unwrap();
    let ids: Vec<i64> = outstanding.iter().map(|l| l.id).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[1], b.id);

    let settled = t
        .ledger
        .invoices()
        .list_settled_invoice_lines(LedgerFilter::all())
        .await
        .unwrap();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].id, a.id);
}

#[tokio::test]
async fn unrepresentable_cost_is_rejected_without_storing() {
    let t = TestLedger::new().await;
    let s = t.seed_supplier("Acme").await;
    let p = t.seed_product("111", "Bolts").await;
    let line = t.record(s.id, p.id, "OK", date(2024, 1, 1), 2, 10).await;

    let huge_price = RecordInvoiceRequest::new(s.id, p.id, "D1", 3, Decimal::MAX)
        .with_pricing(dec!(10), dec!(20));
    assert_matches!(
        t.ledger.invoices().record_invoice(huge_price).await,
        Err(ServiceError::InvalidInput(_))
    );

    // The unit cost fits but the line's value does not.
    let huge_value = RecordInvoiceRequest::new(s.id, p.id, "D2", 1000, Decimal::MAX)
        .with_pricing(Decimal::ZERO, Decimal::ZERO);
    assert_matches!(
        t.ledger.invoices().record_invoice(huge_value).await,
        Err(ServiceError::InvalidInput(_))
    );

    let mut edit = edit("OK", 2, 10, 0);
    edit.unit_price = Decimal::MAX;
    edit.vat_pct = dec!(50);
    assert_matches!(
        t.ledger.invoices().edit_invoice(line.id, edit).await,
        Err(ServiceError::InvalidInput(_))
    );

    let balance = t.ledger.invoices().query_balance(LedgerFilter::all()).await.unwrap();
    assert_eq!(balance.lines, 1);
    assert_eq!(balance.value, Decimal::from(20));
    assert_eq!(t.line(line.id).await.net_unit_cost, Decimal::from(10));
}
