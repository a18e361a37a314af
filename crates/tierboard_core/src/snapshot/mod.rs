//! Portable snapshot import/export format.
//!
//! # Invariants
//! - Decoding validates everything before any caller touches the store.
//! - Payloads are base64 (standard alphabet) inside a JSON document.

pub mod codec;

use crate::model::ids::{ItemId, TierId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Snapshot validation and encoding errors.
#[derive(Debug)]
pub enum SnapshotError {
    /// Document is not valid JSON.
    Syntax(serde_json::Error),
    /// Top level is not a JSON object.
    NotAnObject,
    /// A required top-level field is absent.
    MissingField(&'static str),
    /// A field has the wrong shape.
    Malformed(String),
    UnsupportedVersion {
        found: u32,
        supported: u32,
    },
    /// One payload is not valid base64.
    InvalidPayload {
        item_id: ItemId,
        reason: String,
    },
    /// An item id appears in more than one container position.
    DuplicateItem(ItemId),
    DuplicateTier(TierId),
    /// A container references an item with no payload entry.
    MissingPayload(ItemId),
    /// Export serialization failed.
    Encode(serde_json::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(err) => write!(f, "snapshot is not valid JSON: {err}"),
            Self::NotAnObject => write!(f, "snapshot must be a JSON object"),
            Self::MissingField(field) => write!(f, "snapshot is missing required field `{field}`"),
            Self::Malformed(message) => write!(f, "malformed snapshot: {message}"),
            Self::UnsupportedVersion { found, supported } => write!(
                f,
                "snapshot version {found} is newer than supported {supported}"
            ),
            Self::InvalidPayload { item_id, reason } => {
                write!(f, "payload of item {item_id} is not valid base64: {reason}")
            }
            Self::DuplicateItem(id) => write!(f, "item {id} is placed more than once"),
            Self::DuplicateTier(id) => write!(f, "tier {id} is declared more than once"),
            Self::MissingPayload(id) => write!(f, "item {id} has no payload entry"),
            Self::Encode(err) => write!(f, "cannot encode snapshot: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Syntax(err) | Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}
