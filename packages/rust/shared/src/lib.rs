//! Shared types, error model, and configuration for docpipe.
//!
//! This crate is the foundation depended on by all other docpipe crates.
//! It provides:
//! - [`DocpipeError`]: the unified error type
//! - Domain types ([`FrbrUri`], [`ExtractedCitation`])
//! - Configuration ([`AppConfig`], [`CleanupOptions`], [`PdfOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CitationsConfig, CleanupConfig, CleanupOptions, PdfConfig, PdfOptions, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DocpipeError, Result};
pub use types::{ExtractedCitation, FrbrUri};
