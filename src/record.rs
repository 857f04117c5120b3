//! Intelligence record types
//!
//! A record points at its report payload through `content_ref`, an opaque
//! handle into external content-addressed storage. The registry never holds
//! payload bytes, only the handle.

use serde::{Deserialize, Serialize};

/// One submitted intelligence entry
///
/// Serializes with camelCase field names for external consumers
/// (`{id, submitter, contentRef, category, title, createdAt, upvotes,
/// downvotes, active}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelRecord {
    /// Sequential identifier, assigned in submission order starting at 1
    pub id: u64,
    /// Identity of the submitting agent
    pub submitter: String,
    /// Content store handle for the report payload
    pub content_ref: String,
    /// Category label (e.g. "Malware", "Phishing")
    pub category: String,
    /// Short summary
    pub title: String,
    /// Ledger-clock timestamp at submission, microseconds since epoch
    pub created_at: u64,
    /// Upvote tally, increment-only
    pub upvotes: u64,
    /// Downvote tally, increment-only
    pub downvotes: u64,
    /// Soft-delete flag; inactive records are invisible to all operations
    pub active: bool,
}

impl IntelRecord {
    /// Credibility score: upvotes minus downvotes
    pub fn score(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }
}
