//! # Errors
//!
//! Typed failures surfaced by the core crate. Everything that is a
//! "soft" failure (bad price, empty result, exhausted pagination) is
//! handled in-line and never reaches these types.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load the product catalog. Always fatal at startup.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to open catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog table: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog is missing required column `{0}`")]
    MissingColumn(&'static str),
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Rotator could not be started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error("quote list is empty")]
    Empty,

    #[error("rotation interval must be greater than zero")]
    ZeroInterval,
}
