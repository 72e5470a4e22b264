//! Supplier Ledger Library
//!
//! Tracks goods owed by suppliers as invoice lines, draws them down
//! oldest-first when stock is shipped, and keeps an auditable movement log
//! that can be reversed.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::db::{DbPool, WriteGate};
use crate::errors::ServiceError;
use crate::models::{Clock, SystemClock};
use crate::services::{
    AllocationService, CatalogService, InvoiceLedgerService, MovementLogService, ReportService,
    ReversalService,
};

/// Tunables the services take from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub report_movement_limit: u64,
    pub default_product_unit: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            report_movement_limit: 50,
            default_product_unit: "pcs".to_string(),
        }
    }
}

impl From<&AppConfig> for LedgerSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            report_movement_limit: cfg.report_movement_limit,
            default_product_unit: cfg.default_product_unit.clone(),
        }
    }
}

/// Entry point bundling every ledger service over one pool.
///
/// All mutating services share a single [`WriteGate`], so writes issued
/// through one `Ledger` (or any of its clones) never interleave.
#[derive(Clone)]
pub struct Ledger {
    db_pool: Arc<DbPool>,
    catalog: CatalogService,
    invoices: InvoiceLedgerService,
    allocation: AllocationService,
    reversal: ReversalService,
    movements: MovementLogService,
    reports: ReportService,
}

impl Ledger {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self::with_clock(db_pool, Arc::new(SystemClock))
    }

    pub fn with_clock(db_pool: Arc<DbPool>, clock: Arc<dyn Clock>) -> Self {
        Self::with_settings(db_pool, clock, LedgerSettings::default())
    }

    pub fn with_settings(
        db_pool: Arc<DbPool>,
        clock: Arc<dyn Clock>,
        settings: LedgerSettings,
    ) -> Self {
        let write_gate = WriteGate::new();
        Self {
            catalog: CatalogService::new(
                db_pool.clone(),
                write_gate.clone(),
                settings.default_product_unit,
            ),
            invoices: InvoiceLedgerService::new(db_pool.clone(), write_gate.clone(), clock.clone()),
            allocation: AllocationService::new(db_pool.clone(), write_gate.clone(), clock),
            reversal: ReversalService::new(db_pool.clone(), write_gate),
            movements: MovementLogService::new(db_pool.clone()),
            reports: ReportService::new(db_pool.clone(), settings.report_movement_limit),
            db_pool,
        }
    }

    /// Connects using the configured pool settings, migrating first when
    /// `auto_migrate` is set.
    pub async fn connect(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let pool = db::establish_connection_from_app_config(cfg).await?;
        if cfg.auto_migrate {
            db::run_migrations(&pool).await?;
        }
        info!(environment = %cfg.environment, "Ledger ready");
        Ok(Self::with_settings(
            Arc::new(pool),
            Arc::new(SystemClock),
            LedgerSettings::from(cfg),
        ))
    }

    pub fn db_pool(&self) -> &Arc<DbPool> {
        &self.db_pool
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn invoices(&self) -> &InvoiceLedgerService {
        &self.invoices
    }

    pub fn allocation(&self) -> &AllocationService {
        &self.allocation
    }

    pub fn reversal(&self) -> &ReversalService {
        &self.reversal
    }

    pub fn movements(&self) -> &MovementLogService {
        &self.movements
    }

    pub fn reports(&self) -> &ReportService {
        &self.reports
    }
}
