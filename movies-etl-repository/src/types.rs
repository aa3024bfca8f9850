//! Result types for bulk write operations.

/// A single document the search engine refused in a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// Id of the rejected document.
    pub id: String,
    /// HTTP status reported for the item.
    pub status: u16,
    /// Error reason reported by the search engine.
    pub reason: String,
}

/// Summary of a bulk operation.
///
/// A bulk request can succeed as a whole while individual items fail. This
/// struct carries the aggregate counts and the failed items so callers can
/// decide how to handle partial failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Total number of documents in the request.
    pub total: usize,
    /// Number of documents written.
    pub succeeded: usize,
    /// Number of documents rejected.
    pub failed: usize,
    /// Details of the rejected documents.
    pub failures: Vec<BulkItemFailure>,
}

impl BulkSummary {
    /// Summary of a request in which every document was written.
    pub fn all_succeeded(total: usize) -> Self {
        Self {
            total,
            succeeded: total,
            failed: 0,
            failures: Vec::new(),
        }
    }

    /// Check if any document was rejected.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
