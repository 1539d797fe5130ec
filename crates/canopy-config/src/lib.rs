//! Configuration for canopy tools.
//!
//! Settings persist to disk as RON, stay readable when fields are added or
//! removed, and can be overridden from the command line via clap.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, FetchConfig, TilesetConfig, ViewConfig, default_config_dir};
pub use error::ConfigError;
