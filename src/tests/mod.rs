pub mod common;
pub mod token_cache_expiry;
