//! # Quota Shared
//!
//! Wire types for front ends that report quota decisions.
//! Kept free of domain dependencies so any UI layer can consume them.

pub mod dto;
pub mod response;

pub use dto::{CategoryUsageResponse, DecisionResponse, MarkResponse, StatusResponse};
pub use response::{ApiResponse, ErrorResponse};
