//! Document processor implementation.
//!
//! Transforms extracted rows into IndexDocument structures for indexing.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use movies_etl_shared::{
    EntityRef, ExtractedRow, FilmDocument, FilmWorkRow, GenreDocument, GenreRow, IndexDocument,
    PersonDocument, PersonRow, Stream,
};

/// Why a single row could not be transformed.
///
/// Transform errors are row-scoped: the row is dropped, the batch goes on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A required field is null or blank.
    #[error("Row {id} is missing required field `{field}`")]
    MissingField { id: Uuid, field: &'static str },

    /// A nested aggregate is not an array of `{id, name}` objects.
    #[error("Row {id} has malformed `{field}`: {reason}")]
    MalformedAggregate {
        id: Uuid,
        field: &'static str,
        reason: String,
    },

    /// The row belongs to a different stream than the one being processed.
    #[error("Row {id} belongs to {actual}, expected {expected}")]
    StreamMismatch {
        id: Uuid,
        expected: Stream,
        actual: Stream,
    },
}

/// Processor that transforms extracted rows into search documents.
///
/// The processor is pure: no I/O, no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    /// Create a new document processor.
    pub fn new() -> Self {
        Self
    }

    /// Transform a batch of rows of one stream.
    ///
    /// Rows that fail to transform are logged and skipped.
    ///
    /// # Returns
    ///
    /// Documents in the order of their rows.
    #[instrument(skip(self, rows), fields(stream = %stream, row_count = rows.len()))]
    pub fn transform(&self, stream: Stream, rows: Vec<ExtractedRow>) -> Vec<IndexDocument> {
        let mut documents = Vec::with_capacity(rows.len());

        for row in rows {
            match self.transform_row(stream, row) {
                Ok(document) => documents.push(document),
                Err(e) => warn!(error = %e, "Skipping row"),
            }
        }

        debug!(document_count = documents.len(), "Transformed batch");
        documents
    }

    /// Transform a single row.
    pub fn transform_row(
        &self,
        stream: Stream,
        row: ExtractedRow,
    ) -> Result<IndexDocument, TransformError> {
        if row.stream() != stream {
            return Err(TransformError::StreamMismatch {
                id: row.id(),
                expected: stream,
                actual: row.stream(),
            });
        }

        match row {
            ExtractedRow::FilmWork(row) => transform_film(row).map(IndexDocument::Film),
            ExtractedRow::Genre(row) => transform_genre(row).map(IndexDocument::Genre),
            ExtractedRow::Person(row) => transform_person(row).map(IndexDocument::Person),
        }
    }
}

fn transform_film(row: FilmWorkRow) -> Result<FilmDocument, TransformError> {
    let id = row.id;

    Ok(FilmDocument {
        id,
        title: required(id, "title", row.title)?,
        description: row.description,
        imdb_rating: row.rating,
        kind: row.kind,
        premium: row.premium.unwrap_or(false),
        genres: entity_refs(id, "genres", row.genres)?,
        actors: entity_refs(id, "actors", row.actors)?,
        directors: entity_refs(id, "directors", row.directors)?,
        writers: entity_refs(id, "writers", row.writers)?,
    })
}

fn transform_genre(row: GenreRow) -> Result<GenreDocument, TransformError> {
    Ok(GenreDocument {
        id: row.id,
        name: required(row.id, "name", row.name)?,
        description: row.description,
    })
}

fn transform_person(row: PersonRow) -> Result<PersonDocument, TransformError> {
    Ok(PersonDocument {
        id: row.id,
        name: required(row.id, "name", row.name)?,
    })
}

fn required(
    id: Uuid,
    field: &'static str,
    value: Option<String>,
) -> Result<String, TransformError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TransformError::MissingField { id, field }),
    }
}

/// Parse an aggregated `[{id, name}, ...]` column.
///
/// Null means no related rows. Stubs with a null id (left-join leftovers)
/// are dropped. The result is de-duplicated and sorted by name.
fn entity_refs(
    id: Uuid,
    field: &'static str,
    value: Option<Value>,
) -> Result<Vec<EntityRef>, TransformError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(TransformError::MalformedAggregate {
                id,
                field,
                reason: format!("expected an array, got {}", other),
            })
        }
    };

    let mut refs = Vec::with_capacity(items.len());
    for item in items {
        if item.get("id").map_or(true, Value::is_null) {
            continue;
        }
        let entity: EntityRef =
            serde_json::from_value(item).map_err(|e| TransformError::MalformedAggregate {
                id,
                field,
                reason: e.to_string(),
            })?;
        refs.push(entity);
    }

    refs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    refs.dedup();
    Ok(refs)
}
