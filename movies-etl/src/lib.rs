//! # Movies ETL
//!
//! Main library for the movies catalog search ETL.
//!
//! This crate provides the entry point and configuration for running
//! the ETL pipeline.

pub mod config;

pub use config::{Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur during ETL initialization or execution.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] movies_etl_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] movies_etl_repository::SearchError),

    /// Source database error.
    #[error("Source error: {0}")]
    SourceError(#[from] movies_etl_repository::SourceError),

    /// Watermark store error.
    #[error("State error: {0}")]
    StateError(#[from] movies_etl_repository::StateError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EtlError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
