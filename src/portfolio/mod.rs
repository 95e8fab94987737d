pub mod dashboard_model;
pub mod dashboard_service;
pub mod refresh_model;
pub mod refresh_service;

#[cfg(test)]
pub(crate) mod test_support;


pub use dashboard_model::{DashboardSummary, HoldingPerformance, HoldingProjection};
pub use dashboard_service::DashboardService;
pub use refresh_model::{RefreshOutcome, RefreshStatus};
pub use refresh_service::PortfolioRefreshService;
