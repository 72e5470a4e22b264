mod common;

use assert_matches::assert_matches;
use common::{date, TestLedger};
use supplier_ledger::{
    errors::ServiceError,
    models::{NewProduct, NewSupplier},
};

#[tokio::test]
async fn suppliers_are_unique_and_listed_by_name() {
    let t = TestLedger::new().await;
    t.seed_supplier("Nordic").await;
    t.seed_supplier("Acme").await;

    assert_matches!(
        t.ledger
            .catalog()
            .create_supplier(NewSupplier {
                name: " Acme ".into(),
                contact_info: None,
            })
            .await,
        Err(ServiceError::Conflict(_))
    );

    let names: Vec<String> = t
        .ledger
        .catalog()
        .list_suppliers()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["Acme", "Nordic"]);
}

#[tokio::test]
async fn products_default_their_unit() {
    let t = TestLedger::new().await;
    let p = t.seed_product("111", "Bolts").await;
    assert_eq!(p.unit, "pcs");

    let cable = t
        .ledger
        .catalog()
        .create_product(NewProduct {
            barcode: "222".into(),
            name: "Cable".into(),
            unit: Some("m".into()),
        })
        .await
        .unwrap();
    assert_eq!(cable.unit, "m");

    assert_matches!(
        t.ledger
            .catalog()
            .create_product(NewProduct {
                barcode: "111".into(),
                name: "Other".into(),
                unit: None,
            })
            .await,
        Err(ServiceError::Conflict(_))
    );
}

#[tokio::test]
async fn referenced_catalog_entries_cannot_be_deleted() {
    let t = TestLedger::new().await;
    let s = t.seed_supplier("Acme").await;
    let p = t.seed_product("111", "Bolts").await;
    let line = t.record(s.id, p.id, "A", date(2024, 1, 1), 1, 10).await;

    assert_matches!(
        t.ledger.catalog().delete_supplier(s.id).await,
        Err(ServiceError::ReferentialConflict(_))
    );
    assert_matches!(
        t.ledger.catalog().delete_product(p.id).await,
        Err(ServiceError::ReferentialConflict(_))
    );

    t.ledger.invoices().delete_invoice(line.id).await.unwrap();
    t.ledger.catalog().delete_supplier(s.id).await.unwrap();
    t.ledger.catalog().delete_product(p.id).await.unwrap();
    assert_matches!(
        t.ledger.catalog().get_supplier(s.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        t.ledger.catalog().get_product(p.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn find_or_create_reuses_existing_entries() {
    let t = TestLedger::new().await;
    let first = t.ledger.catalog().find_or_create_supplier("Acme").await.unwrap();
    let again = t.ledger.catalog().find_or_create_supplier("Acme").await.unwrap();
    assert_eq!(first.id, again.id);

    let product = t
        .ledger
        .catalog()
        .find_or_create_product("999", "Washers")
        .await
        .unwrap();
    let found = t
        .ledger
        .catalog()
        .find_product_by_barcode("999")
        .await
        .unwrap()
        .expect("product by barcode");
    assert_eq!(product.id, found.id);
    assert_eq!(t.ledger.catalog().list_products().await.unwrap().len(), 1);
}
