//! Domain types - categories, window state, limits and decisions.

mod category;
mod config;
mod decision;
mod state;

pub use category::{Category, UnknownCategory};
pub use config::{DEFAULT_PERIOD, Limits, WindowConfig};
pub use decision::Decision;
pub use state::{Counts, RateWindowState};
