//! Rate limiting window service.
//!
//! Tracks per-category usage within a fixed-length window that is persisted
//! through a [`KeyValueStore`]. Reads never write: a missing, corrupt or
//! expired window is replaced in memory and only persisted by the next
//! [`RateLimitWindow::mark`] or [`RateLimitWindow::reset`].
//!
//! Note: there is no locking across operations. Two hosts sharing one store
//! can lose an increment when they mark concurrently.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{Category, Decision, Limits, RateWindowState, WindowConfig};
use crate::error::{ConfigError, QuotaError};
use crate::ports::{Clock, KeyValueStore};

/// Default storage slot for the persisted window.
pub const STORAGE_KEY: &str = "rate_limit";

/// Why [`RateLimitWindow`] ended up with the state it is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOrigin {
    /// A live window read from the store.
    Persisted,
    /// Nothing stored yet.
    Missing,
    /// The stored value could not be parsed.
    Corrupt,
    /// The store failed on read.
    Unreadable,
    /// The stored window had run past its period.
    Expired,
}

impl StateOrigin {
    /// True when the state was synthesized rather than read back.
    pub fn is_fresh(self) -> bool {
        !matches!(self, StateOrigin::Persisted)
    }
}

/// Usage of one category inside the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryUsage {
    pub category: Category,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub allowed: bool,
}

/// Read-only snapshot of the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowStatus {
    pub start: DateTime<Utc>,
    pub resets_at: DateTime<Utc>,
    pub origin: StateOrigin,
    pub usage: Vec<CategoryUsage>,
}

struct Loaded {
    state: RateWindowState,
    origin: StateOrigin,
}

/// Per-category quota over a rolling fixed-length window.
pub struct RateLimitWindow {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: WindowConfig,
    key: String,
}

impl RateLimitWindow {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: WindowConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            store,
            clock,
            config,
            key: STORAGE_KEY.to_string(),
        })
    }

    /// Persist under `key` instead of [`STORAGE_KEY`].
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn limits(&self) -> &Limits {
        &self.config.limits
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Check whether one more `category` action fits in the current window.
    ///
    /// Never writes to the store.
    pub fn is_allowed(&self, category: Category) -> Decision {
        let Loaded { state, origin } = self.load();
        let decision = self.decide(&state, category);

        tracing::debug!(
            category = %category,
            used = state.counts.get(category),
            limit = self.config.limits.get(category),
            origin = ?origin,
            allowed = decision.is_allowed(),
            "Rate window checked"
        );

        decision
    }

    /// Record one completed `category` action.
    ///
    /// Call only after the guarded action was actually dispatched.
    pub fn mark(&self, category: Category) -> Result<(), QuotaError> {
        let Loaded { mut state, origin } = self.load();
        state.counts.increment(category);
        self.save(&state)?;

        tracing::debug!(
            category = %category,
            used = state.counts.get(category),
            origin = ?origin,
            "Usage recorded"
        );

        Ok(())
    }

    /// Replace the window with a fresh, zeroed one regardless of its age.
    pub fn reset(&self) -> Result<(), QuotaError> {
        let mut state = RateWindowState::fresh(self.clock.now());

        // Keep starts non-decreasing even if the clock stepped backwards.
        if let Ok(previous) = self.read_persisted() {
            state.start = state.start.max(previous.start);
        }

        self.save(&state)?;

        tracing::info!(key = %self.key, start = %state.start, "Rate window reset");

        Ok(())
    }

    /// Snapshot of every category in the current window. Never writes.
    pub fn status(&self) -> WindowStatus {
        let Loaded { state, origin } = self.load();

        let usage = Category::ALL
            .into_iter()
            .map(|category| {
                let used = state.counts.get(category);
                let limit = self.config.limits.get(category);
                CategoryUsage {
                    category,
                    used,
                    limit,
                    remaining: limit.saturating_sub(used),
                    allowed: used < limit,
                }
            })
            .collect();

        WindowStatus {
            start: state.start,
            resets_at: state.resets_at(self.period()),
            origin,
            usage,
        }
    }

    fn decide(&self, state: &RateWindowState, category: Category) -> Decision {
        if state.counts.get(category) < self.config.limits.get(category) {
            Decision::Allowed
        } else {
            Decision::Denied {
                retry_after: state.resets_at(self.period()),
            }
        }
    }

    fn period(&self) -> TimeDelta {
        self.config.window_length()
    }

    /// The live window, or a fresh unpersisted one.
    fn load(&self) -> Loaded {
        let now = self.clock.now();

        let (state, origin) = match self.read_persisted() {
            Ok(state) if !state.is_expired(now, self.period()) => (state, StateOrigin::Persisted),
            Ok(_) => (RateWindowState::fresh(now), StateOrigin::Expired),
            Err(origin) => (RateWindowState::fresh(now), origin),
        };

        Loaded { state, origin }
    }

    /// Whatever is stored, expired or not. The error says why nothing usable was found.
    fn read_persisted(&self) -> Result<RateWindowState, StateOrigin> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Err(StateOrigin::Missing),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Rate window unreadable, starting fresh");
                return Err(StateOrigin::Unreadable);
            }
        };

        RateWindowState::from_json(&raw).map_err(|e| {
            tracing::warn!(key = %self.key, error = %e, "Discarding corrupt rate window");
            StateOrigin::Corrupt
        })
    }

    fn save(&self, state: &RateWindowState) -> Result<(), QuotaError> {
        let raw = state
            .to_json()
            .map_err(|e| QuotaError::Serialization(e.to_string()))?;
        self.store.set(&self.key, &raw)?;
        Ok(())
    }
}
