#![forbid(unsafe_code)]

//! Core domain model and business logic for drinklog.
//!
//! This crate provides:
//! - Domain types (consumption events, profile, estimates, logged drinks)
//! - The BAC estimation engine
//! - A live recompute driver for "current" estimates
//! - Drink catalog, log persistence and CSV transfer
//! - History and per-day statistics

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod engine;
pub mod format;
pub mod live;
pub mod log;
pub mod history;
pub mod csv_transfer;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, DrinkCatalog};
pub use config::Config;
pub use engine::{estimate, peak_over_day};
pub use format::{format_concentration, format_time_to_zero, BacLevel, TimeLabels};
pub use live::{LiveMonitor, LiveSettings};
pub use log::{DrinkSink, JsonlLog};
pub use history::{daily_summaries, events_since, load_recent_entries, PeriodSummary};
