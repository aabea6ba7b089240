//! Subcommand implementations.

pub mod check_config;
pub mod import;
pub mod serve;
