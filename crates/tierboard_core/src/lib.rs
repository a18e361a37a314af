//! Core domain logic for Tierboard.
//! This crate is the single source of truth for board invariants.

pub mod config;
pub mod db;
pub mod drag;
pub mod logging;
pub mod model;
pub mod outcome;
pub mod repo;
pub mod service;
pub mod snapshot;

pub use config::{BoardConfig, ConfigError};
pub use drag::executor::{apply_in_memory, MoveEffect, MoveExecutor, MoveReport};
pub use drag::resolver::{
    filtered_sequence, resolve_insertion_index, Hover, HoveredItem, ItemBounds, ResolvedTarget,
};
pub use drag::session::{ActiveDrag, DragSession, PendingMove, SessionPhase};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::collection::CollectionState;
pub use model::container::{ContainerId, DropTarget, Tier, DEFAULT_TIERS};
pub use model::ids::{ItemId, TierId};
pub use outcome::{Outcome, SkipReason, SyncStatus};
pub use repo::record_store::{
    ClearedStore, Namespace, RecordStore, SqliteRecordStore, StoreError, StoreResult, StoredRecord,
};
pub use service::board_service::{BoardError, BoardOptions, BoardService, ImportSummary};
pub use service::handles::{
    DisplayHandle, HandleCache, HandleProvider, HandleReleaseError, ObjectUrlHandles,
};
pub use service::view::{BoardView, TierView, ViewEntry};
pub use snapshot::codec::{decode_snapshot, encode_snapshot, DecodedSnapshot, SNAPSHOT_VERSION};
pub use snapshot::SnapshotError;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
