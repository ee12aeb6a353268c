//! Subcommand implementations

pub mod analyze;
pub mod catalog;
pub mod costs;
pub mod recommendations;
