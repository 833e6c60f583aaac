/// Payloads published to viewer observers.
pub mod viewer;
