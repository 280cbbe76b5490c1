//! Command line interface module
//!
//! Argument parsing (with environment overrides) and the runner that turns
//! arguments into one push session.

pub mod args;
pub mod runner;

pub use args::{Args, usage_exit_code};
pub use runner::{Runner, exit_code};
