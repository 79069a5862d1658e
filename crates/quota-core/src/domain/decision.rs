use chrono::{DateTime, Utc};

/// Outcome of an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Quota exhausted until the current window ends at `retry_after`.
    Denied { retry_after: DateTime<Utc> },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn retry_after(&self) -> Option<DateTime<Utc>> {
        match self {
            Decision::Allowed => None,
            Decision::Denied { retry_after } => Some(*retry_after),
        }
    }
}
