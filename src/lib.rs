//! Financial totals and system health checks for the membership dashboard.

pub mod checks;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod financials;
pub mod models;
pub mod report;
pub mod source;

pub use checks::{group_by_check_type, run_system_checks};
pub use dashboard::Dashboard;
pub use error::{CheckInvocationError, DashboardError, FetchError, SourceError};
pub use financials::compute_financial_totals;
pub use models::{CheckGroup, FinancialTotals, Severity, SystemCheckResult};
pub use source::{DataSource, FixtureSource, Procedure, RecordSet};
