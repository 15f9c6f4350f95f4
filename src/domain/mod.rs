//! Core domain types and rule logic.

pub mod config;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod order;
pub mod position;
pub mod runner;
pub mod signal;
pub mod universe;
