//! Data Transfer Objects - machine-readable views of quota decisions.

use serde::{Deserialize, Serialize};

/// Result of asking whether one more action is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub category: String,
    pub label: String,
    pub allowed: bool,
    /// RFC 3339 instant the quota frees up again; only present when denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<String>,
    /// The caller skipped the limiter (privileged account).
    #[serde(default)]
    pub bypassed: bool,
}

/// Acknowledgement of a recorded usage or a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkResponse {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub recorded: bool,
}

/// Usage of one category within the current window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUsageResponse {
    pub category: String,
    pub label: String,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub allowed: bool,
}

/// Snapshot of the whole window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub start: String,
    pub resets_at: String,
    /// No live window was stored; the numbers describe one that would start now.
    pub fresh: bool,
    pub categories: Vec<CategoryUsageResponse>,
}
