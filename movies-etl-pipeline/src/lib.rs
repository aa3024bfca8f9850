//! # Movies ETL Pipeline
//!
//! This crate provides the pipeline components that keep the search indices
//! in sync with the movies catalog database.
//!
//! ## Architecture
//!
//! The pipeline follows the Extractor-Processor-Loader pattern:
//!
//! 1. **Extractor**: Reads rows changed after a stream's watermark
//! 2. **Processor**: Transforms rows into search documents
//! 3. **Loader**: Indexes documents into OpenSearch
//! 4. **Orchestrator**: Coordinates the pipeline flow and advances the
//!    watermarks
//!
//! Every call to an external system goes through a [`retry::RetryPolicy`].

pub mod errors;
pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod retry;
pub mod schema;
pub mod state;

pub use errors::PipelineError;
pub use extractor::Extractor;
pub use loader::{LoadReport, SearchLoader};
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, StreamFailure, StreamReport, StreamState, TickReport,
};
pub use processor::{DocumentProcessor, TransformError};
pub use retry::{Classify, ErrorClass, RetryConfig, RetryPolicy};
pub use schema::IndexSchemaManager;
pub use state::WatermarkStore;
