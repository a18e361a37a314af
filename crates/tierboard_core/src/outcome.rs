//! Non-failure outcomes of board operations.
//!
//! # Invariants
//! - A `Skipped` outcome never mutated state.
//! - Stale references and calls without an active drag session are skips,
//!   never errors.

use crate::model::container::ContainerId;
use crate::model::ids::{ItemId, TierId};
use std::fmt::{Display, Formatter};

/// Why an operation became a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Referenced item is no longer present where expected.
    ItemNotFound(ItemId),
    /// Referenced container is no longer present.
    ContainerNotFound(ContainerId),
    /// Referenced tier is no longer present.
    TierNotFound(TierId),
    /// Operation needs an active drag session and none is running.
    NoActiveSession,
    /// Drop released without any resolved target.
    NoTarget,
    /// An export capture window is open; mutations are held off.
    CaptureWindowOpen,
}

impl SkipReason {
    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ItemNotFound(_) => "item_not_found",
            Self::ContainerNotFound(_) => "container_not_found",
            Self::TierNotFound(_) => "tier_not_found",
            Self::NoActiveSession => "no_active_session",
            Self::NoTarget => "no_target",
            Self::CaptureWindowOpen => "capture_window_open",
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::ContainerNotFound(id) => write!(f, "container not found: {id}"),
            Self::TierNotFound(id) => write!(f, "tier not found: {id}"),
            Self::NoActiveSession => write!(f, "no active drag session"),
            Self::NoTarget => write!(f, "drop had no resolved target"),
            Self::CaptureWindowOpen => write!(f, "capture window is open"),
        }
    }
}

/// Durability state of the in-memory board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Synced,
    /// The last write failed; memory is ahead of the store until the next
    /// successful write.
    Unsynced { reason: String },
}

impl SyncStatus {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }
}

/// Result of a facade operation that cannot fail in the caller's sense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Self::Applied(_) => None,
            Self::Skipped(reason) => Some(reason),
        }
    }
}
