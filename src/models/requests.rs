use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// VAT applied when an invoice does not state one
pub const DEFAULT_VAT_PCT: Decimal = dec!(20);

/// Decimal places accepted on prices and percentages
pub const MONEY_SCALE: u32 = 4;

/// A purchase-invoice line to record against a supplier's balance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordInvoiceRequest {
    pub supplier_id: i64,
    pub product_id: i64,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub document_no: String,
    /// Defaults to the ledger clock's today
    pub invoice_date: Option<NaiveDate>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(custom = "validate_decimal_non_negative")]
    pub unit_price: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_percentage")]
    pub discount_pct: Decimal,
    #[serde(default = "default_vat_pct")]
    #[validate(custom = "validate_decimal_non_negative")]
    pub vat_pct: Decimal,
}

impl RecordInvoiceRequest {
    /// Request with no discount and the default VAT rate
    pub fn new(
        supplier_id: i64,
        product_id: i64,
        document_no: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            supplier_id,
            product_id,
            document_no: document_no.into(),
            invoice_date: None,
            quantity,
            unit_price,
            discount_pct: Decimal::ZERO,
            vat_pct: DEFAULT_VAT_PCT,
        }
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.invoice_date = Some(date);
        self
    }

    pub fn with_pricing(mut self, discount_pct: Decimal, vat_pct: Decimal) -> Self {
        self.discount_pct = discount_pct;
        self.vat_pct = vat_pct;
        self
    }
}

/// Replacement values for an existing invoice line.
///
/// Every field is submitted in full, as an edit form would. Once a line has
/// movements, `quantity` must repeat the stored received quantity.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EditInvoiceRequest {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub document_no: String,
    pub invoice_date: NaiveDate,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(custom = "validate_decimal_non_negative")]
    pub unit_price: Decimal,
    #[validate(custom = "validate_percentage")]
    pub discount_pct: Decimal,
    #[validate(custom = "validate_decimal_non_negative")]
    pub vat_pct: Decimal,
}

/// Shipment details copied onto every movement of one withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShipmentMeta {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub shipment_no: String,
    /// Destination location tag
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub destination: String,
    #[validate(length(min = 1, max = 150), custom = "validate_not_blank")]
    pub recipient: String,
    /// Defaults to the ledger clock's today
    pub movement_date: Option<NaiveDate>,
}

impl ShipmentMeta {
    pub fn new(
        shipment_no: impl Into<String>,
        destination: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            shipment_no: shipment_no.into(),
            destination: destination.into(),
            recipient: recipient.into(),
            movement_date: None,
        }
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.movement_date = Some(date);
        self
    }
}

/// Withdraw `quantity` units of a product from a supplier, oldest invoices first.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AllocationRequest {
    pub supplier_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    #[validate]
    pub shipment: ShipmentMeta,
}

/// One entry of an invoice-targeted bulk withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAllocationLine {
    pub invoice_line_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSupplier {
    #[validate(length(min = 1, max = 150), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(max = 250))]
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub barcode: String,
    #[validate(length(min = 1, max = 150), custom = "validate_not_blank")]
    pub name: String,
    /// Falls back to the configured default unit
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
}

fn default_vat_pct() -> Decimal {
    DEFAULT_VAT_PCT
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("must not be blank"));
    }
    Ok(())
}

// SQLite keeps decimals as REAL, which is only exact for short fractions.
fn validate_money_scale(value: &Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(ValidationError::new("At most 4 decimal places are allowed"));
    }
    Ok(())
}

fn validate_decimal_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("Amount must be non-negative"));
    }
    validate_money_scale(value)
}

fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > dec!(100) {
        return Err(ValidationError::new("Percentage must be between 0 and 100"));
    }
    validate_money_scale(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn invoice() -> RecordInvoiceRequest {
        RecordInvoiceRequest::new(1, 1, "INV-1", 10, dec!(100))
    }

    #[test]
    fn new_invoice_request_uses_default_pricing() {
        let req = invoice();
        assert_eq!(req.discount_pct, Decimal::ZERO);
        assert_eq!(req.vat_pct, dec!(20));
        assert!(req.validate().is_ok());
    }

    #[rstest]
    #[case::zero_quantity(0, dec!(100), dec!(0), "quantity")]
    #[case::negative_quantity(-3, dec!(100), dec!(0), "quantity")]
    #[case::negative_price(5, dec!(-0.01), dec!(0), "unit_price")]
    #[case::discount_over_100(5, dec!(100), dec!(100.5), "discount_pct")]
    #[case::price_too_precise(5, dec!(12.3456789), dec!(0), "unit_price")]
    #[case::discount_too_precise(5, dec!(100), dec!(2.50001), "discount_pct")]
    fn invalid_invoice_fields(
        #[case] quantity: i32,
        #[case] unit_price: Decimal,
        #[case] discount_pct: Decimal,
        #[case] field: &str,
    ) {
        let mut req = invoice();
        req.quantity = quantity;
        req.unit_price = unit_price;
        req.discount_pct = discount_pct;
        let errors = req.validate().unwrap_err();
        assert!(
            errors.field_errors().contains_key(field),
            "expected error on {}, got {:?}",
            field,
            errors
        );
    }

    #[test]
    fn zero_price_is_allowed() {
        let mut req = invoice();
        req.unit_price = Decimal::ZERO;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn four_decimal_places_are_accepted() {
        let mut req = invoice();
        req.unit_price = dec!(12.3456);
        // Trailing zeros do not count.
        req.vat_pct = dec!(7.250000);
        assert!(req.validate().is_ok());

        let edit = EditInvoiceRequest {
            document_no: "INV-1".into(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            quantity: 10,
            unit_price: dec!(1.00001),
            discount_pct: Decimal::ZERO,
            vat_pct: dec!(20),
        };
        let errors = edit.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("unit_price"));
    }

    #[test]
    fn blank_document_number_is_rejected() {
        let mut req = invoice();
        req.document_no = "   ".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn shipment_meta_requires_every_field() {
        assert!(ShipmentMeta::new("SHP-1", "Main", "Ali").validate().is_ok());
        assert!(ShipmentMeta::new("", "Main", "Ali").validate().is_err());
        assert!(ShipmentMeta::new("SHP-1", " ", "Ali").validate().is_err());
        assert!(ShipmentMeta::new("SHP-1", "Main", "").validate().is_err());
    }

    #[test]
    fn allocation_request_validates_nested_shipment() {
        let req = AllocationRequest {
            supplier_id: 1,
            product_id: 1,
            quantity: 5,
            shipment: ShipmentMeta::new("SHP-1", "", "Ali"),
        };
        assert!(req.validate().is_err());
    }
}
