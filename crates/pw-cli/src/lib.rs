//! PlastiWatch CLI library.
//!
//! This crate provides the host simulator around the activity controller.

mod cli;
pub mod commands;
mod config;
pub mod scenario;
pub mod simulator;

pub use cli::{Cli, Commands};
pub use config::Config;
