//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use quota_core::Category;

use crate::config::StoreKind;

/// Per-category usage quota for AI chat requests.
#[derive(Debug, Parser)]
#[command(name = "quota", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Account name, matched against QUOTA_PRIVILEGED_USERS
    #[arg(long, global = true, value_name = "NAME")]
    pub user: Option<String>,

    /// Skip the limiter for check and guard
    #[arg(long, global = true)]
    pub privileged: bool,

    /// Window length in milliseconds (overrides QUOTA_PERIOD_MS)
    #[arg(long, global = true, value_name = "MS")]
    pub period_ms: Option<u64>,

    /// Storage backend: memory, file or redis (overrides QUOTA_STORE)
    #[arg(long, global = true, value_name = "KIND")]
    pub store: Option<StoreKind>,

    /// File store location (overrides QUOTA_STORE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub store_path: Option<PathBuf>,

    /// Keep this client's window apart from others in the same store
    #[arg(long, global = true, value_name = "ID")]
    pub client_id: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether one more request of CATEGORY is allowed (exit 2 when denied)
    Check { category: Category },

    /// Record one completed request of CATEGORY
    Mark { category: Category },

    /// Start a fresh window with zero usage
    Reset,

    /// Show usage, limits and the reset time for every category
    Status,

    /// Run PROGRAM if CATEGORY has quota left, recording usage only if it succeeds
    Guard {
        category: Category,

        #[arg(
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "PROGRAM"
        )]
        program: Vec<String>,
    },
}
