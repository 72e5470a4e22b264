use sea_orm::error::DbErr;
use serde::Serialize;

/// Failures returned by the ledger services.
///
/// Business-rule violations are ordinary variants and never leave partial
/// writes behind. Only [`ServiceError::DatabaseError`] and
/// [`ServiceError::InternalError`] are treated as fatal.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invoice document {document_no} already recorded for supplier {supplier_id}")]
    DuplicateDocument { supplier_id: i64, document_no: String },

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("Edit conflict: {0}")]
    EditConflict(String),

    #[error("Invoice line {invoice_line_id} has {withdrawn} unit(s) withdrawn and cannot be deleted")]
    HasMovements { invoice_line_id: i64, withdrawn: i32 },

    #[error("Referential conflict: {0}")]
    ReferentialConflict(String),

    #[error("No operations applied: all {skipped} bulk entries were rejected")]
    NoOperationsApplied { skipped: usize },

    #[error("Movement {0} not found")]
    MovementNotFound(i64),

    #[error("Source invoice line {invoice_line_id} of movement {movement_id} is missing")]
    SourceInvoiceMissing {
        movement_id: i64,
        invoice_line_id: i64,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Stable machine-readable code for callers that render failures.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::DuplicateDocument { .. } => "duplicate_document",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::EditConflict(_) => "edit_conflict",
            Self::HasMovements { .. } => "has_movements",
            Self::ReferentialConflict(_) => "referential_conflict",
            Self::NoOperationsApplied { .. } => "no_operations_applied",
            Self::MovementNotFound(_) => "movement_not_found",
            Self::SourceInvoiceMissing { .. } => "source_invoice_missing",
            Self::Conflict(_) => "conflict",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Storage and invariant failures that the caller cannot recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::InternalError(_))
    }
}
