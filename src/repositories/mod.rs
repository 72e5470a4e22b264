//! Persistence operations shared by the ledger services.
//!
//! Every function is generic over [`sea_orm::ConnectionTrait`] so the same
//! code runs against the pool for reads and inside a transaction for writes.

pub mod ledger_repository;

pub use ledger_repository::LedgerRepository;
