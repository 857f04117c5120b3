//! Sentinel Registry - community threat-intelligence ledger core
//!
//! Records community-submitted intelligence entries and lets peers vote on
//! their credibility. The registry stores only a content-store handle per
//! record, never payload bytes; caller identity is supplied by the embedding
//! layer and trusted as given.
//!
//! ## Architecture
//!
//! - **Registry**: append-mostly ledger keyed by sequential id, with
//!   per-record vote tallies and a soft-delete flag
//! - **RegistryDb**: sled-backed tables (records, vote markers, submitter
//!   counters, watermarks); big-endian id keys make newest-first listing a
//!   reverse range scan
//! - **Signals**: broadcast channel publishing `Submitted` / `Voted` after
//!   each committed mutation, consumed by external indexers and UIs
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/sentinel-registry/
//! ├── registry.sled/         # Records, votes, counters, watermarks
//! └── config.toml            # Configuration
//! ```
//!
//! ## Concurrency
//!
//! One write guard serializes all mutations; reads share a read guard and
//! observe committed state only. A failed operation leaves prior state
//! completely unchanged.

pub mod config;
pub mod error;
pub mod record;
pub mod registry;
pub mod signals;
pub mod store;

// Re-exports
pub use config::Config;
pub use error::RegistryError;
pub use record::IntelRecord;
pub use registry::{Registry, MAX_PAGE_LIMIT};
pub use signals::{RegistrySignal, SignalBroadcaster};
pub use store::{RegistryDb, StoreStats};
