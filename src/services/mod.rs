pub mod allocation;
pub mod catalog;
pub mod cost;
pub mod ledger;
pub mod movements;
pub mod reports;
pub mod reversal;

pub use allocation::{
    plan_fifo, AllocationOutcome, AllocationService, BulkAllocationOutcome, PlannedDeduction,
    SkipReason, SkippedLine,
};
pub use catalog::CatalogService;
pub use cost::{net_unit_cost, round_currency};
pub use ledger::{BalanceSummary, InvoiceLedgerService};
pub use movements::MovementLogService;
pub use reports::{
    BalanceReport, DashboardStats, InvoiceLineView, MovementView, ReportService, SupplierBalance,
};
pub use reversal::{ReversalOutcome, ReversalService};
