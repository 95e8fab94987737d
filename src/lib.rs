pub mod broker;
pub mod cache;
pub mod constants;
pub mod db;
pub mod errors;
pub mod holdings;
pub mod portfolio;
pub mod schema;
pub mod symbols;

pub use errors::{Error, Result};
