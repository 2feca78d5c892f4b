//! restwatch CLI library.
//!
//! This crate provides the command-line client, the collector link with its
//! local fallback, and the tick loop that drives the scheduler.

mod cli;
pub mod commands;
mod config;
pub mod intent;
pub mod link;
pub mod presenter;
pub mod runner;

pub use cli::{Cli, Commands, RunArgs};
pub use config::{Config, DEFAULT_COLLECTOR, dirs_config_path};
pub use intent::{Intent, IntentError};
pub use link::CollectorLink;
pub use presenter::ConsolePresenter;
pub use runner::{Runner, Sensors};
