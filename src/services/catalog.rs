use chrono::Utc;
use metrics::counter;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::db::{with_transaction, DbPool, WriteGate};
use crate::entities::{product, supplier};
use crate::errors::ServiceError;
use crate::models::{NewProduct, NewSupplier};
use crate::repositories::LedgerRepository;

/// Suppliers and products that invoice lines refer to.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    write_gate: WriteGate,
    default_unit: String,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, write_gate: WriteGate, default_unit: impl Into<String>) -> Self {
        Self {
            db_pool,
            write_gate,
            default_unit: default_unit.into(),
        }
    }

    #[instrument(skip(self, new_supplier), fields(name = %new_supplier.name))]
    pub async fn create_supplier(
        &self,
        new_supplier: NewSupplier,
    ) -> Result<supplier::Model, ServiceError> {
        new_supplier.validate()?;
        let name = new_supplier.name.trim().to_string();
        let contact_info = new_supplier
            .contact_info
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let _guard = self.write_gate.acquire().await;
        let created = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = supplier::Entity::find()
                    .filter(supplier::Column::Name.eq(name.as_str()))
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                if existing.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Supplier '{}' already exists",
                        name
                    )));
                }

                supplier::ActiveModel {
                    name: Set(name),
                    contact_info: Set(contact_info),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)
            })
        })
        .await?;

        counter!("ledger.catalog.supplier_created", 1);
        info!(supplier_id = created.id, "Supplier created");
        Ok(created)
    }

    pub async fn list_suppliers(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        supplier::Entity::find()
            .order_by_asc(supplier::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_supplier(&self, id: i64) -> Result<supplier::Model, ServiceError> {
        LedgerRepository::require_supplier(self.db_pool.as_ref(), id).await
    }

    pub async fn find_supplier_by_name(
        &self,
        name: &str,
    ) -> Result<Option<supplier::Model>, ServiceError> {
        supplier::Entity::find()
            .filter(supplier::Column::Name.eq(name.trim()))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Deletes a supplier no invoice line refers to.
    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, id: i64) -> Result<(), ServiceError> {
        let _guard = self.write_gate.acquire().await;
        with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = LedgerRepository::require_supplier(txn, id).await?;
                let lines = LedgerRepository::count_lines_for_supplier(txn, &existing).await?;
                if lines > 0 {
                    return Err(ServiceError::ReferentialConflict(format!(
                        "Supplier {} is referenced by {} invoice line(s)",
                        id, lines
                    )));
                }
                supplier::Entity::delete_by_id(id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                Ok(())
            })
        })
        .await?;

        counter!("ledger.catalog.supplier_deleted", 1);
        info!(supplier_id = id, "Supplier deleted");
        Ok(())
    }

    /// Returns the supplier named `name`, creating it when absent.
    ///
    /// The lookup and the insert are separate steps; concurrent importers
    /// racing on one name get a `Conflict` from the loser.
    pub async fn find_or_create_supplier(&self, name: &str) -> Result<supplier::Model, ServiceError> {
        if let Some(existing) = self.find_supplier_by_name(name).await? {
            return Ok(existing);
        }
        self.create_supplier(NewSupplier {
            name: name.to_string(),
            contact_info: None,
        })
        .await
    }

    #[instrument(skip(self, new_product), fields(barcode = %new_product.barcode))]
    pub async fn create_product(&self, new_product: NewProduct) -> Result<product::Model, ServiceError> {
        new_product.validate()?;
        let barcode = new_product.barcode.trim().to_string();
        let name = new_product.name.trim().to_string();
        let unit = new_product
            .unit
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.default_unit.clone());

        let _guard = self.write_gate.acquire().await;
        let created = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = product::Entity::find()
                    .filter(product::Column::Barcode.eq(barcode.as_str()))
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                if existing.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Product with barcode '{}' already exists",
                        barcode
                    )));
                }

                product::ActiveModel {
                    barcode: Set(barcode),
                    name: Set(name),
                    unit: Set(unit),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)
            })
        })
        .await?;

        counter!("ledger.catalog.product_created", 1);
        info!(product_id = created.id, "Product created");
        Ok(created)
    }

    pub async fn list_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        product::Entity::find()
            .order_by_asc(product::Column::Name)
            .order_by_asc(product::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_product(&self, id: i64) -> Result<product::Model, ServiceError> {
        LedgerRepository::require_product(self.db_pool.as_ref(), id).await
    }

    pub async fn find_product_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<product::Model>, ServiceError> {
        product::Entity::find()
            .filter(product::Column::Barcode.eq(barcode.trim()))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i64) -> Result<(), ServiceError> {
        let _guard = self.write_gate.acquire().await;
        with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = LedgerRepository::require_product(txn, id).await?;
                let lines = LedgerRepository::count_lines_for_product(txn, &existing).await?;
                if lines > 0 {
                    return Err(ServiceError::ReferentialConflict(format!(
                        "Product {} is referenced by {} invoice line(s)",
                        id, lines
                    )));
                }
                product::Entity::delete_by_id(id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                Ok(())
            })
        })
        .await?;

        counter!("ledger.catalog.product_deleted", 1);
        info!(product_id = id, "Product deleted");
        Ok(())
    }

    pub async fn find_or_create_product(
        &self,
        barcode: &str,
        name: &str,
    ) -> Result<product::Model, ServiceError> {
        if let Some(existing) = self.find_product_by_barcode(barcode).await? {
            return Ok(existing);
        }
        self.create_product(NewProduct {
            barcode: barcode.to_string(),
            name: name.to_string(),
            unit: None,
        })
        .await
    }
}
