pub mod symbol_errors;
pub mod symbol_model;
pub mod symbol_resolver;

pub use symbol_errors::SymbolError;
pub use symbol_model::{ScripRecord, SymbolEntry};
pub use symbol_resolver::{normalize_company_name, SymbolResolver, SymbolResolverTrait};
