pub mod cache_store;

pub use cache_store::{CacheError, CacheStoreTrait, InMemoryCacheStore};
