//! Raw rows as they come out of the catalog database.
//!
//! Rows are ephemeral: they live for one extract/transform/load cycle and are
//! never persisted by the pipeline.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::stream::Stream;
use crate::watermark::Watermark;

/// A changed film work with its related entities pre-aggregated.
///
/// The aggregate columns hold JSON arrays of `{id, name}` objects exactly as
/// produced by the database, or `None` when the aggregate came back null.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmWorkRow {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub kind: Option<String>,
    /// Subscription-only flag, `None` when the column is null.
    pub premium: Option<bool>,
    pub modified: DateTime<Utc>,
    pub genres: Option<Value>,
    pub actors: Option<Value>,
    pub directors: Option<Value>,
    pub writers: Option<Value>,
}

/// A changed genre.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub modified: DateTime<Utc>,
}

/// A changed person.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub modified: DateTime<Utc>,
}

/// One extracted row of any stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedRow {
    FilmWork(FilmWorkRow),
    Genre(GenreRow),
    Person(PersonRow),
}

impl ExtractedRow {
    /// Primary key of the source row.
    pub fn id(&self) -> Uuid {
        match self {
            ExtractedRow::FilmWork(row) => row.id,
            ExtractedRow::Genre(row) => row.id,
            ExtractedRow::Person(row) => row.id,
        }
    }

    /// Modification timestamp of the source row.
    pub fn modified(&self) -> DateTime<Utc> {
        match self {
            ExtractedRow::FilmWork(row) => row.modified,
            ExtractedRow::Genre(row) => row.modified,
            ExtractedRow::Person(row) => row.modified,
        }
    }

    /// The stream this row belongs to.
    pub fn stream(&self) -> Stream {
        match self {
            ExtractedRow::FilmWork(_) => Stream::FilmWork,
            ExtractedRow::Genre(_) => Stream::Genre,
            ExtractedRow::Person(_) => Stream::Person,
        }
    }

    /// Watermark that resumes right after this row.
    pub fn position(&self) -> Watermark {
        Watermark::at_row(self.modified(), self.id())
    }
}

/// One bounded page of changed rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedBatch {
    /// Rows ordered by `(modified, id)`.
    pub rows: Vec<ExtractedRow>,
    /// Number of rows in the batch.
    pub count: usize,
    /// Position of the last row, `None` for an empty batch.
    pub next_watermark: Option<Watermark>,
}

impl ExtractedBatch {
    /// Build a batch from rows already ordered by `(modified, id)`.
    pub fn from_rows(rows: Vec<ExtractedRow>) -> Self {
        let next_watermark = rows.last().map(ExtractedRow::position);
        Self {
            count: rows.len(),
            rows,
            next_watermark,
        }
    }

    /// Check if the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
