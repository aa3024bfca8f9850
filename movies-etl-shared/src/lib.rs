//! # Movies ETL Shared
//!
//! Shared types used across the movies ETL workspace: the set of synchronized
//! streams, the watermark that tracks each stream's progress, the raw rows
//! pulled from the catalog database and the documents written to the search
//! index.

pub mod documents;
pub mod rows;
pub mod stream;
pub mod watermark;

pub use documents::{EntityRef, FilmDocument, GenreDocument, IndexDocument, PersonDocument};
pub use rows::{ExtractedBatch, ExtractedRow, FilmWorkRow, GenreRow, PersonRow};
pub use stream::{Stream, UnknownStreamError};
pub use watermark::{Watermark, WatermarkParseError};
