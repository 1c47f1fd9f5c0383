//! CLI subcommand implementations.

pub mod regions;
pub mod search;
