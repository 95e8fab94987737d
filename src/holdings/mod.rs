pub mod holdings_errors;
pub mod holdings_model;
pub mod holdings_repository;
pub mod holdings_service;
pub mod ingestion;

pub use holdings_errors::HoldingError;
pub use holdings_model::{
    composite_key, HoldingEdit, Holding, MarketFieldsUpdate, NewHoldingInput, ParsedHoldingRow,
};
pub use holdings_repository::{
    HoldingsRepositoryTrait, MarketUpdateOutcome, SqliteHoldingsRepository,
};
pub use holdings_service::HoldingsService;
pub use ingestion::{plan_merge, IngestionService, MergePlan, MergeReport, MergeUpdate};
