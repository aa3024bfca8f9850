//! Resumption position of a stream.
//!
//! A watermark is the `(modified, id)` pair of the last row that was durably
//! indexed. Extraction resumes strictly after it, so rows that share the
//! boundary timestamp are neither skipped nor indexed twice.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Separates the timestamp from the tie-break id in the stored form.
const ID_SEPARATOR: char = '|';

const SENTINEL_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1800, 1, 1) {
    Some(date) => date,
    None => panic!("invalid sentinel date"),
};

/// Errors raised when a stored watermark cannot be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatermarkParseError {
    /// The timestamp part is not in any accepted format.
    #[error("Invalid watermark timestamp: {0}")]
    InvalidTimestamp(String),

    /// The id part is not a UUID.
    #[error("Invalid watermark id: {0}")]
    InvalidId(String),
}

/// Last processed position of a stream.
///
/// Ordered by `modified`, then by `last_id`, with a missing id ordered before
/// every id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark {
    modified: DateTime<Utc>,
    last_id: Option<Uuid>,
}

impl Watermark {
    /// Watermark at the given timestamp with no tie-break id.
    pub fn new(modified: DateTime<Utc>) -> Self {
        Self {
            modified,
            last_id: None,
        }
    }

    /// Watermark pointing at a specific row.
    pub fn at_row(modified: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            modified,
            last_id: Some(id),
        }
    }

    /// The far-past starting point of a stream that has never run.
    pub fn sentinel() -> Self {
        Self::new(Utc.from_utc_datetime(&SENTINEL_DATE.and_time(NaiveTime::MIN)))
    }

    /// Modification timestamp of the last processed row.
    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Id of the last processed row, if known.
    pub fn last_id(&self) -> Option<Uuid> {
        self.last_id
    }

    /// Id bound used in keyset queries. The nil UUID sorts before every real id.
    pub fn id_bound(&self) -> Uuid {
        self.last_id.unwrap_or_else(Uuid::nil)
    }

    /// Check if this is the sentinel value.
    pub fn is_sentinel(&self) -> bool {
        *self == Self::sentinel()
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::sentinel()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.modified.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        match self.last_id {
            Some(id) => write!(f, "{}{}{}", ts, ID_SEPARATOR, id),
            None => f.write_str(&ts),
        }
    }
}

impl FromStr for Watermark {
    type Err = WatermarkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts, id) = match s.trim().split_once(ID_SEPARATOR) {
            Some((ts, id)) => {
                let id = Uuid::parse_str(id.trim())
                    .map_err(|_| WatermarkParseError::InvalidId(id.to_string()))?;
                (ts, Some(id))
            }
            None => (s.trim(), None),
        };

        Ok(Self {
            modified: parse_timestamp(ts.trim())?,
            last_id: id,
        })
    }
}

/// Accepts RFC 3339, the PostgreSQL text form and a bare date.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, WatermarkParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }

    Err(WatermarkParseError::InvalidTimestamp(s.to_string()))
}
