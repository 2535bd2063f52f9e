//! CLI Module
//!
//! Provides command-line support:
//! - Exit codes for automation
//! - Tracing subscriber setup

pub mod exit_codes;
pub mod tracing_setup;

pub use exit_codes::{exit_code_description, print_exit_codes, CliResult, ExitCodes};
pub use tracing_setup::init_tracing;
