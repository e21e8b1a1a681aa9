//! Configuration management for deplan
//!
//! ## Architecture
//!
//! - `schema` - Configuration data structures
//! - `io` - Reading and validating config files
//! - `paths` - Directory path management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use deplan_cli::config;
//!
//! # fn example() -> anyhow::Result<()> {
//! // Load config (returns default if file doesn't exist)
//! let config = config::io::load_config(None)?;
//! let timeout = config.planner.url_handlers_timeout_ms;
//! # Ok(())
//! # }
//! ```

pub mod io;
pub mod paths;
pub mod schema;

pub use io::{load_config, load_config_from};
pub use paths::{get_config_path, get_deplan_dir};
pub use schema::{DeplanConfig, SystemConfig};
