//! Movement Log
//!
//! Read access to the append-only record of withdrawals. Movements are only
//! written by the allocation engine and only removed by a reversal.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::sync::Arc;
use tracing::instrument;

use crate::db::query_builder::FilterExt;
use crate::db::{DbPool, LedgerFilter};
use crate::entities::movement;
use crate::errors::ServiceError;

#[derive(Clone)]
pub struct MovementLogService {
    db_pool: Arc<DbPool>,
}

impl MovementLogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Movements matching the filter, newest first.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        filter: LedgerFilter,
        limit: Option<u64>,
    ) -> Result<Vec<movement::Model>, ServiceError> {
        let mut query = movement::Entity::find()
            .apply_filter(&filter)
            .order_by_desc(movement::Column::Id);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        query
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Withdrawal history of one invoice line, in the order it happened.
    pub async fn movements_for_invoice_line(
        &self,
        invoice_line_id: i64,
    ) -> Result<Vec<movement::Model>, ServiceError> {
        movement::Entity::find()
            .filter(movement::Column::InvoiceLineId.eq(invoice_line_id))
            .order_by_asc(movement::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_movement(&self, id: i64) -> Result<movement::Model, ServiceError> {
        movement::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or(ServiceError::MovementNotFound(id))
    }
}
