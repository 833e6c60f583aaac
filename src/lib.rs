//! Library crate for replay-stats, exposing modules for the binary and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod media;
pub mod services;
pub mod state;
