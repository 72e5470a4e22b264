use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

use crate::db::query_builder::outstanding_lines;
use crate::db::LedgerFilter;
use crate::entities::{invoice_line, movement, product, supplier};
use crate::errors::ServiceError;
use crate::models::ShipmentMeta;

/// Stateless access to suppliers, products, invoice lines and movements
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerRepository;

impl LedgerRepository {
    pub async fn require_supplier<C: ConnectionTrait>(
        conn: &C,
        id: i64,
    ) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))
    }

    pub async fn require_product<C: ConnectionTrait>(
        conn: &C,
        id: i64,
    ) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    pub async fn find_line<C: ConnectionTrait>(
        conn: &C,
        id: i64,
    ) -> Result<Option<invoice_line::Model>, ServiceError> {
        Self::for_update(conn, invoice_line::Entity::find_by_id(id))
            .one(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn require_line<C: ConnectionTrait>(
        conn: &C,
        id: i64,
    ) -> Result<invoice_line::Model, ServiceError> {
        Self::find_line(conn, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice line {} not found", id)))
    }

    /// Whether `document_no` is already used by another line of the supplier
    pub async fn document_taken<C: ConnectionTrait>(
        conn: &C,
        supplier_id: i64,
        document_no: &str,
        exclude_line: Option<i64>,
    ) -> Result<bool, ServiceError> {
        let mut query = invoice_line::Entity::find()
            .filter(invoice_line::Column::SupplierId.eq(supplier_id))
            .filter(invoice_line::Column::DocumentNo.eq(document_no));
        if let Some(id) = exclude_line {
            query = query.filter(invoice_line::Column::Id.ne(id));
        }
        let count = query.count(conn).await.map_err(ServiceError::db_error)?;
        Ok(count > 0)
    }

    /// Outstanding lines of one (supplier, product) pair in FIFO order:
    /// invoice date ascending, then id ascending.
    pub async fn fifo_candidates<C: ConnectionTrait>(
        conn: &C,
        supplier_id: i64,
        product_id: i64,
    ) -> Result<Vec<invoice_line::Model>, ServiceError> {
        let query = outstanding_lines(&LedgerFilter::pair(supplier_id, product_id))
            .order_by_asc(invoice_line::Column::InvoiceDate)
            .order_by_asc(invoice_line::Column::Id);
        Self::for_update(conn, query)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Deducts `quantity` from the line and appends the matching movement.
    pub async fn withdraw<C: ConnectionTrait>(
        conn: &C,
        line: invoice_line::Model,
        quantity: i32,
        shipment: &ShipmentMeta,
        movement_date: NaiveDate,
    ) -> Result<(invoice_line::Model, movement::Model), ServiceError> {
        let remaining = line.quantity_remaining - quantity;
        if quantity <= 0 || remaining < 0 {
            return Err(ServiceError::InternalError(format!(
                "cannot withdraw {} from invoice line {} with {} remaining",
                quantity, line.id, line.quantity_remaining
            )));
        }

        let now = Utc::now();
        let new_movement = movement::ActiveModel {
            invoice_line_id: Set(line.id),
            supplier_id: Set(line.supplier_id),
            product_id: Set(line.product_id),
            quantity: Set(quantity),
            shipment_no: Set(shipment.shipment_no.trim().to_string()),
            destination: Set(shipment.destination.trim().to_string()),
            recipient: Set(shipment.recipient.trim().to_string()),
            movement_date: Set(movement_date),
            created_at: Set(now),
            ..Default::default()
        };

        let mut active_line: invoice_line::ActiveModel = line.into();
        active_line.quantity_remaining = Set(remaining);
        active_line.updated_at = Set(now);

        let line = active_line
            .update(conn)
            .await
            .map_err(ServiceError::db_error)?;
        let movement = new_movement
            .insert(conn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((line, movement))
    }

    /// Puts `quantity` back on the line. Fails if that would exceed the received quantity.
    pub async fn restore<C: ConnectionTrait>(
        conn: &C,
        line: invoice_line::Model,
        quantity: i32,
    ) -> Result<invoice_line::Model, ServiceError> {
        let restored = line.quantity_remaining + quantity;
        if quantity <= 0 || restored > line.quantity_received {
            return Err(ServiceError::InternalError(format!(
                "restoring {} to invoice line {} would leave {} remaining of {} received",
                quantity, line.id, restored, line.quantity_received
            )));
        }

        let mut active_line: invoice_line::ActiveModel = line.into();
        active_line.quantity_remaining = Set(restored);
        active_line.updated_at = Set(Utc::now());
        active_line
            .update(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn count_lines_for_supplier<C: ConnectionTrait>(
        conn: &C,
        supplier: &supplier::Model,
    ) -> Result<u64, ServiceError> {
        supplier
            .find_related(invoice_line::Entity)
            .count(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn count_lines_for_product<C: ConnectionTrait>(
        conn: &C,
        product: &product::Model,
    ) -> Result<u64, ServiceError> {
        product
            .find_related(invoice_line::Entity)
            .count(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Row locks only exist on Postgres. SQLite writers are already serialized.
    fn for_update<C, E>(conn: &C, query: Select<E>) -> Select<E>
    where
        C: ConnectionTrait,
        E: EntityTrait,
    {
        if conn.get_database_backend() == DbBackend::Postgres {
            query.lock_exclusive()
        } else {
            query
        }
    }
}
