use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one refresh run. A run that commits any update is a success;
/// per-holding problems are carried in `failures` (capped for the client).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RefreshOutcome {
    pub success: bool,
    pub message: String,
    pub updated_count: usize,
    pub failed_count: usize,
    pub failures: Vec<String>,
    pub total_holdings: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RefreshOutcome {
    pub fn failure(message: impl Into<String>, total_holdings: usize) -> Self {
        Self {
            success: false,
            message: message.into(),
            updated_count: 0,
            failed_count: total_holdings,
            failures: Vec::new(),
            total_holdings,
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    pub last_updated: Option<DateTime<Utc>>,
    pub is_authenticated: bool,
}
