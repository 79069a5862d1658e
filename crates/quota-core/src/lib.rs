//! # Quota Core
//!
//! The domain layer of the quota window.
//! This crate holds the per-category rate limiting logic and the ports it
//! depends on. Storage backends and clocks live in `quota-infra`.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{Category, Counts, Decision, Limits, RateWindowState, WindowConfig};
pub use error::{ConfigError, QuotaError};
pub use service::{CategoryUsage, RateLimitWindow, STORAGE_KEY, StateOrigin, WindowStatus};
