//! Denormalized documents written to the search indices.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stream::Stream;

/// Stub of a related entity nested inside a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: Uuid,
    pub name: String,
}

impl EntityRef {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Document stored in the `movies` index.
///
/// Relationship arrays are always present, possibly empty, never null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmDocument {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub imdb_rating: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Restricts the film to subscribers.
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub genres: Vec<EntityRef>,
    #[serde(default)]
    pub actors: Vec<EntityRef>,
    #[serde(default)]
    pub directors: Vec<EntityRef>,
    #[serde(default)]
    pub writers: Vec<EntityRef>,
}

/// Document stored in the `genres` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Document stored in the `persons` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: Uuid,
    pub name: String,
}

/// A document ready for indexing.
///
/// Serializes to the bare document body; the variant only decides which
/// index it goes to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndexDocument {
    Film(FilmDocument),
    Genre(GenreDocument),
    Person(PersonDocument),
}

impl IndexDocument {
    /// Document id. Always equal to the source row id, which makes writes
    /// upserts.
    pub fn id(&self) -> Uuid {
        match self {
            IndexDocument::Film(doc) => doc.id,
            IndexDocument::Genre(doc) => doc.id,
            IndexDocument::Person(doc) => doc.id,
        }
    }

    /// The stream this document belongs to.
    pub fn stream(&self) -> Stream {
        match self {
            IndexDocument::Film(_) => Stream::FilmWork,
            IndexDocument::Genre(_) => Stream::Genre,
            IndexDocument::Person(_) => Stream::Person,
        }
    }

    /// Index the document is written to.
    pub fn index_name(&self) -> &'static str {
        self.stream().index_name()
    }
}
