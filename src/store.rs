//! Persistent registry tables
//!
//! Tracks:
//! - Submitted records, keyed by big-endian id (ordered iteration gives
//!   submission order; reverse iteration gives newest-first)
//! - Vote markers, one per (record id, voter identity) pair
//! - Per-identity submission counters
//! - Meta watermarks (highest assigned id, ledger-clock high-water mark)

use crate::error::RegistryError;
use crate::record::IntelRecord;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::info;

const TREE_RECORDS: &str = "records";
const TREE_VOTES: &str = "votes";
const TREE_SUBMITTERS: &str = "submitters";
const TREE_META: &str = "meta";

const META_LAST_ID: &[u8] = b"last_id";
const META_CLOCK: &[u8] = b"clock";

/// Registry database
pub struct RegistryDb {
    _db: Db,
    records: Tree,
    votes: Tree,
    submitters: Tree,
    meta: Tree,
}

impl RegistryDb {
    /// Open or create the registry database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let db = sled::open(path.as_ref())?;
        let records = db.open_tree(TREE_RECORDS)?;
        let votes = db.open_tree(TREE_VOTES)?;
        let submitters = db.open_tree(TREE_SUBMITTERS)?;
        let meta = db.open_tree(TREE_META)?;
        info!(path = %path.as_ref().display(), "Opened registry database");
        Ok(Self {
            _db: db,
            records,
            votes,
            submitters,
            meta,
        })
    }

    /// Highest assigned record id (0 when empty)
    pub fn last_id(&self) -> Result<u64, RegistryError> {
        Ok(self.meta.get(META_LAST_ID)?.map(|v| decode_u64(&v)).unwrap_or(0))
    }

    /// Ledger-clock high-water mark in microseconds (0 when never stamped)
    pub fn clock_watermark(&self) -> Result<u64, RegistryError> {
        Ok(self.meta.get(META_CLOCK)?.map(|v| decode_u64(&v)).unwrap_or(0))
    }

    /// Get a record by id
    pub fn get_record(&self, id: u64) -> Result<Option<IntelRecord>, RegistryError> {
        match self.records.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(decode_record(&value)?)),
            None => Ok(None),
        }
    }

    /// Whether a (record, voter) vote marker exists
    pub fn has_vote(&self, id: u64, voter: &str) -> Result<bool, RegistryError> {
        Ok(self.votes.contains_key(vote_key(id, voter))?)
    }

    /// Number of successful submissions by an identity
    pub fn submission_count(&self, submitter: &str) -> Result<u64, RegistryError> {
        Ok(self
            .submitters
            .get(submitter.as_bytes())?
            .map(|v| decode_u64(&v))
            .unwrap_or(0))
    }

    /// Iterate all records newest-first (descending id)
    pub fn iter_records_desc(
        &self,
    ) -> impl Iterator<Item = Result<IntelRecord, RegistryError>> + '_ {
        self.records.iter().rev().map(|item| {
            let (_, value) = item?;
            decode_record(&value)
        })
    }

    /// Commit a new submission atomically: record row, submitter counter,
    /// id and clock watermarks
    pub fn commit_submission(&self, record: &IntelRecord) -> Result<(), RegistryError> {
        let id_key = record.id.to_be_bytes().to_vec();
        let value = encode_record(record)?;
        let submitter_key = record.submitter.as_bytes().to_vec();
        let created_at = record.created_at.to_be_bytes().to_vec();

        (&self.records, &self.submitters, &self.meta)
            .transaction(|(records, submitters, meta)| {
                records.insert(id_key.clone(), value.clone())?;

                let count = submitters
                    .get(submitter_key.clone())?
                    .map(|v| decode_u64(&v))
                    .unwrap_or(0)
                    + 1;
                submitters.insert(submitter_key.clone(), count.to_be_bytes().to_vec())?;

                meta.insert(META_LAST_ID.to_vec(), id_key.clone())?;
                meta.insert(META_CLOCK.to_vec(), created_at.clone())?;

                Ok::<_, ConflictableTransactionError<RegistryError>>(())
            })
            .map_err(unwrap_txn_error)
    }

    /// Commit a vote atomically: updated tallies plus the vote marker
    pub fn commit_vote(
        &self,
        record: &IntelRecord,
        voter: &str,
    ) -> Result<(), RegistryError> {
        let id_key = record.id.to_be_bytes().to_vec();
        let value = encode_record(record)?;
        let marker_key = vote_key(record.id, voter);

        (&self.records, &self.votes)
            .transaction(|(records, votes)| {
                records.insert(id_key.clone(), value.clone())?;
                votes.insert(marker_key.clone(), vec![1u8])?;
                Ok::<_, ConflictableTransactionError<RegistryError>>(())
            })
            .map_err(unwrap_txn_error)
    }

    /// Flip the soft-delete flag on a record
    ///
    /// Reserved moderation hook: no registry operation drives this yet.
    /// Inactive records stay in the table but become invisible to lookup,
    /// voting, scoring, and listing.
    pub fn set_active(&self, id: u64, active: bool) -> Result<(), RegistryError> {
        if let Some(mut record) = self.get_record(id)? {
            record.active = active;
            self.records.insert(id.to_be_bytes(), encode_record(&record)?)?;
        }
        Ok(())
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StoreStats, RegistryError> {
        let mut total_records = 0u64;
        let mut active_records = 0u64;
        for item in self.records.iter() {
            let (_, value) = item?;
            let record = decode_record(&value)?;
            total_records += 1;
            if record.active {
                active_records += 1;
            }
        }

        Ok(StoreStats {
            total_records,
            active_records,
            total_votes: self.votes.len() as u64,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub total_records: u64,
    pub active_records: u64,
    pub total_votes: u64,
}

fn vote_key(id: u64, voter: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + voter.len());
    key.extend_from_slice(&id.to_be_bytes());
    key.extend_from_slice(voter.as_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[8 - len..].copy_from_slice(&bytes[..len]);
    u64::from_be_bytes(buf)
}

fn encode_record(record: &IntelRecord) -> Result<Vec<u8>, RegistryError> {
    rmp_serde::to_vec(record)
        .map_err(|e| RegistryError::Encoding(format!("Serialization error: {}", e)))
}

fn decode_record(bytes: &[u8]) -> Result<IntelRecord, RegistryError> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| RegistryError::Encoding(format!("Deserialization error: {}", e)))
}

fn unwrap_txn_error(err: TransactionError<RegistryError>) -> RegistryError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => RegistryError::Database(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record(id: u64, submitter: &str) -> IntelRecord {
        IntelRecord {
            id,
            submitter: submitter.to_string(),
            content_ref: format!("sha256-{:04}", id),
            category: "Malware".to_string(),
            title: format!("Report {}", id),
            created_at: 1_000 + id,
            upvotes: 0,
            downvotes: 0,
            active: true,
        }
    }

    fn open_temp() -> (RegistryDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = RegistryDb::open(dir.path().join("registry.sled")).expect("open");
        (db, dir)
    }

    #[test]
    fn test_submission_roundtrip_and_watermarks() {
        let (db, _dir) = open_temp();
        assert_eq!(db.last_id().unwrap(), 0);

        let record = test_record(1, "agent-x");
        db.commit_submission(&record).unwrap();

        assert_eq!(db.last_id().unwrap(), 1);
        assert_eq!(db.clock_watermark().unwrap(), 1_001);
        assert_eq!(db.get_record(1).unwrap(), Some(record));
        assert_eq!(db.submission_count("agent-x").unwrap(), 1);
        assert_eq!(db.submission_count("agent-y").unwrap(), 0);
    }

    #[test]
    fn test_descending_iteration_order() {
        let (db, _dir) = open_temp();
        for id in 1..=5 {
            db.commit_submission(&test_record(id, "agent-x")).unwrap();
        }

        let ids: Vec<u64> = db
            .iter_records_desc()
            .map(|r| r.unwrap().id)
            .collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_vote_marker_and_tallies_commit_together() {
        let (db, _dir) = open_temp();
        let mut record = test_record(1, "agent-x");
        db.commit_submission(&record).unwrap();

        record.upvotes += 1;
        db.commit_vote(&record, "agent-y").unwrap();

        assert!(db.has_vote(1, "agent-y").unwrap());
        assert!(!db.has_vote(1, "agent-z").unwrap());
        assert_eq!(db.get_record(1).unwrap().unwrap().upvotes, 1);
    }

    #[test]
    fn test_set_active_flips_flag_only() {
        let (db, _dir) = open_temp();
        db.commit_submission(&test_record(1, "agent-x")).unwrap();

        db.set_active(1, false).unwrap();
        let record = db.get_record(1).unwrap().unwrap();
        assert!(!record.active);
        assert_eq!(record.title, "Report 1");

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.active_records, 0);
    }
}
