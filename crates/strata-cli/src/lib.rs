//! Command-line driver for `strata-query`.

pub mod cli;
pub mod commands;
pub mod config;
