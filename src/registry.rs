//! Registry service
//!
//! Single-writer ledger of intelligence records. Every mutating operation
//! runs under one write guard, so no intermediate state is ever observable;
//! reads share a read guard and see committed state only.
//!
//! ## Voting invariants
//!
//! - one vote per (record, voter) pair, ever; no retraction
//! - a submitter never votes on their own record
//! - tallies only increase
//!
//! Precondition checks on `vote` run in a fixed order (existence, activity,
//! duplicate vote, self vote) and short-circuit at the first violation, so
//! callers see stable error outcomes.

use crate::config::Config;
use crate::error::RegistryError;
use crate::record::IntelRecord;
use crate::signals::{RegistrySignal, SignalBroadcaster};
use crate::store::{RegistryDb, StoreStats};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// Maximum page size accepted by [`Registry::list_active`]
pub const MAX_PAGE_LIMIT: u64 = 100;

struct Inner {
    db: RegistryDb,
    /// Last issued ledger timestamp; stamps never regress past this
    clock_watermark: u64,
}

/// Community threat-intelligence registry
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
    signals: SignalBroadcaster,
}

impl Registry {
    /// Open the registry backed by the configured database
    pub fn open(config: &Config) -> Result<Self, RegistryError> {
        let db = RegistryDb::open(config.registry_db_path())?;
        let clock_watermark = db.clock_watermark()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(Inner {
                db,
                clock_watermark,
            })),
            signals: SignalBroadcaster::new(config.signal_capacity),
        })
    }

    /// Subscribe to registry signals
    pub fn subscribe(&self) -> broadcast::Receiver<RegistrySignal> {
        self.signals.subscribe()
    }

    /// Submit a new intelligence record, returning its assigned id
    ///
    /// Ids are dense and sequential starting at 1. The submission either
    /// fully commits or leaves no trace.
    pub async fn submit(
        &self,
        content_ref: &str,
        category: &str,
        title: &str,
        submitter: &str,
    ) -> Result<u64, RegistryError> {
        require_non_empty(content_ref, "contentRef")?;
        require_non_empty(category, "category")?;
        require_non_empty(title, "title")?;

        let mut inner = self.inner.write().await;
        let id = inner.db.last_id()? + 1;
        let created_at = tick(&mut inner);

        let record = IntelRecord {
            id,
            submitter: submitter.to_string(),
            content_ref: content_ref.to_string(),
            category: category.to_string(),
            title: title.to_string(),
            created_at,
            upvotes: 0,
            downvotes: 0,
            active: true,
        };
        inner.db.commit_submission(&record)?;

        info!(id, submitter = %submitter, category = %category, "Accepted intelligence record");

        // Emitted under the write guard so signals publish in commit order;
        // broadcast send is synchronous and never blocks.
        self.signals.emit(RegistrySignal::Submitted {
            id,
            submitter: submitter.to_string(),
            content_ref: content_ref.to_string(),
            category: category.to_string(),
            title: title.to_string(),
        });
        drop(inner);

        Ok(id)
    }

    /// Record a credibility vote on a record
    pub async fn vote(
        &self,
        id: u64,
        is_upvote: bool,
        voter: &str,
    ) -> Result<(), RegistryError> {
        let inner = self.inner.write().await;

        let mut record = match inner.db.get_record(id)? {
            Some(record) if record.active => record,
            _ => {
                debug!(id, voter = %voter, "Vote rejected: record not found or inactive");
                return Err(RegistryError::NotFound(id));
            }
        };

        if inner.db.has_vote(id, voter)? {
            debug!(id, voter = %voter, "Vote rejected: already voted");
            return Err(RegistryError::AlreadyVoted {
                id,
                voter: voter.to_string(),
            });
        }

        if record.submitter == voter {
            debug!(id, voter = %voter, "Vote rejected: self vote");
            return Err(RegistryError::SelfVoteForbidden { id });
        }

        if is_upvote {
            record.upvotes += 1;
        } else {
            record.downvotes += 1;
        }
        inner.db.commit_vote(&record, voter)?;

        info!(id, voter = %voter, is_upvote, "Recorded vote");

        // Same ordering guarantee as submit: emit before releasing the guard
        self.signals.emit(RegistrySignal::Voted {
            id,
            voter: voter.to_string(),
            is_upvote,
        });
        drop(inner);

        Ok(())
    }

    /// Get a full snapshot of an active record
    pub async fn get(&self, id: u64) -> Result<IntelRecord, RegistryError> {
        let inner = self.inner.read().await;
        match inner.db.get_record(id)? {
            Some(record) if record.active => Ok(record),
            _ => Err(RegistryError::NotFound(id)),
        }
    }

    /// Credibility score (upvotes minus downvotes) of an active record
    pub async fn score(&self, id: u64) -> Result<i64, RegistryError> {
        Ok(self.get(id).await?.score())
    }

    /// Whether a voter has a recorded vote on a record
    ///
    /// Deliberately more permissive than [`Registry::get`]: an unassigned or
    /// inactive id has an empty vote relation and simply yields false.
    pub async fn has_voted(&self, id: u64, voter: &str) -> Result<bool, RegistryError> {
        let inner = self.inner.read().await;
        match inner.db.get_record(id)? {
            Some(record) if record.active => inner.db.has_vote(id, voter),
            _ => Ok(false),
        }
    }

    /// Number of active records
    pub async fn active_count(&self) -> Result<u64, RegistryError> {
        let inner = self.inner.read().await;
        let mut count = 0u64;
        for item in inner.db.iter_records_desc() {
            if item?.active {
                count += 1;
            }
        }
        Ok(count)
    }

    /// List active record ids newest-first
    ///
    /// Walks the id space in descending order; inactive records consume no
    /// offset or limit budget. The result is `[offset, offset + limit)` of
    /// the active subsequence, possibly shorter at the tail.
    pub async fn list_active(&self, limit: u64, offset: u64) -> Result<Vec<u64>, RegistryError> {
        if limit < 1 || limit > MAX_PAGE_LIMIT {
            return Err(RegistryError::InvalidArgument(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }

        let inner = self.inner.read().await;
        let mut ids = Vec::new();
        let mut skipped = 0u64;
        for item in inner.db.iter_records_desc() {
            let record = item?;
            if !record.active {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            ids.push(record.id);
            if ids.len() as u64 == limit {
                break;
            }
        }
        Ok(ids)
    }

    /// Number of successful submissions by an identity
    pub async fn submission_count(&self, submitter: &str) -> Result<u64, RegistryError> {
        let inner = self.inner.read().await;
        inner.db.submission_count(submitter)
    }

    /// Registry statistics
    pub async fn stats(&self) -> Result<StoreStats, RegistryError> {
        let inner = self.inner.read().await;
        inner.db.stats()
    }

    /// Flip the soft-delete flag on a record (reserved moderation hook)
    pub async fn set_active(&self, id: u64, active: bool) -> Result<(), RegistryError> {
        let inner = self.inner.write().await;
        inner.db.set_active(id, active)
    }
}

/// Issue the next ledger timestamp, monotonic non-decreasing
fn tick(inner: &mut Inner) -> u64 {
    let now = unix_micros().max(inner.clock_watermark);
    inner.clock_watermark = now;
    now
}

fn unix_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

fn require_non_empty(value: &str, field: &str) -> Result<(), RegistryError> {
    if value.is_empty() {
        return Err(RegistryError::InvalidArgument(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}
