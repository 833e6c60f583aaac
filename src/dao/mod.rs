/// Database model definitions.
pub mod models;
/// Stat persistence contract and implementations.
pub mod stat_store;
/// Storage error types shared by every backend.
pub mod storage;
