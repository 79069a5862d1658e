use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

/// Usage counts for the current window, one slot per category.
///
/// Categories missing from persisted JSON read as zero; unknown keys are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counts {
    pub text: u32,
    pub code: u32,
    pub image: u32,
}

impl Counts {
    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Text => self.text,
            Category::Code => self.code,
            Category::Image => self.image,
        }
    }

    pub fn increment(&mut self, category: Category) {
        let slot = match category {
            Category::Text => &mut self.text,
            Category::Code => &mut self.code,
            Category::Image => &mut self.image,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Persisted window: when it started and what has been used since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindowState {
    #[serde(with = "timestamp")]
    pub start: DateTime<Utc>,
    pub counts: Counts,
}

impl RateWindowState {
    /// A zeroed window starting at `now`, truncated to the millisecond
    /// precision it is persisted with.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            start: now.trunc_subsecs(3),
            counts: Counts::default(),
        }
    }

    /// The instant this window ends.
    pub fn resets_at(&self, period: TimeDelta) -> DateTime<Utc> {
        self.start
            .checked_add_signed(period)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, period: TimeDelta) -> bool {
        now.signed_duration_since(self.start) >= period
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Window start timestamps: written as RFC 3339 with milliseconds, read from
/// either an RFC 3339 string or integer epoch milliseconds.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        EpochMillis(i64),
        Iso(String),
    }

    pub fn serialize<S: Serializer>(start: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&start.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::EpochMillis(ms) => DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| D::Error::custom(format!("epoch milliseconds out of range: {ms}"))),
            Raw::Iso(s) => DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(D::Error::custom),
        }
    }
}
