//! The closed set of entity streams replicated into the search engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One independently synchronized entity type.
///
/// Each stream owns its own state key, destination index, source query and
/// index mapping, all selected by matching on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    /// Films, series and other works, with their genres and cast.
    FilmWork,
    /// Genres.
    Genre,
    /// Persons (actors, directors, writers).
    Person,
}

impl Stream {
    /// All streams, in the order the scheduler processes them.
    pub const ALL: [Stream; 3] = [Stream::FilmWork, Stream::Genre, Stream::Person];

    /// Key under which the stream's watermark is stored.
    pub fn state_key(&self) -> &'static str {
        match self {
            Stream::FilmWork => "film_work",
            Stream::Genre => "genre",
            Stream::Person => "person",
        }
    }

    /// Name of the destination search index.
    pub fn index_name(&self) -> &'static str {
        match self {
            Stream::FilmWork => "movies",
            Stream::Genre => "genres",
            Stream::Person => "persons",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_key())
    }
}

/// Returned when a string does not name a known stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown stream: {0}")]
pub struct UnknownStreamError(pub String);

impl FromStr for Stream {
    type Err = UnknownStreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stream::ALL
            .into_iter()
            .find(|stream| stream.state_key() == s)
            .ok_or_else(|| UnknownStreamError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_order() {
        assert_eq!(
            Stream::ALL,
            [Stream::FilmWork, Stream::Genre, Stream::Person]
        );
    }

    #[test]
    fn test_state_keys_and_indices() {
        assert_eq!(Stream::FilmWork.state_key(), "film_work");
        assert_eq!(Stream::FilmWork.index_name(), "movies");
        assert_eq!(Stream::Genre.index_name(), "genres");
        assert_eq!(Stream::Person.index_name(), "persons");
    }

    #[test]
    fn test_parse_round_trip() {
        for stream in Stream::ALL {
            assert_eq!(stream.to_string().parse::<Stream>(), Ok(stream));
        }
        assert!("movies".parse::<Stream>().is_err());
    }
}
