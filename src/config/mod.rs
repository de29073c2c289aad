//! Configuration module for Anjuke-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so a minimal file only names what differs.
//!
//! # Example
//!
//! ```no_run
//! use anjuke_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will visit at most {} pages per region", config.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AntiDetectionConfig, Config, CrawlConfig, OutputConfig, OutputFormat, PacingConfig,
    RotationPolicy, ValidationConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
