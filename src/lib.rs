//! CAULYTICS — bridge backtesting, performance caching and consensus
//! scoring for lottery draw analysis.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod backtest;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod scoring;
pub mod signal;
pub mod stats;
pub mod types;
