//! Snapshot encoding and validated decoding.

use crate::model::collection::CollectionState;
use crate::model::container::{normalize_color, normalize_label, Tier};
use crate::model::ids::ItemId;
use crate::snapshot::SnapshotError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Version assumed for documents written without a `version` field.
const FIRST_VERSION: u32 = 1;

fn first_version() -> u32 {
    FIRST_VERSION
}

/// Wire shape of a snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub tiers: Vec<Tier>,
    #[serde(default)]
    pub sidebar_item_ids: Vec<ItemId>,
    /// Item id -> base64 payload.
    pub items: BTreeMap<ItemId, String>,
}

/// Fully validated snapshot content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSnapshot {
    pub version: u32,
    pub created_at: Option<DateTime<Utc>>,
    /// Layout with every referenced id backed by a payload. Payloads not
    /// placed in any container are appended to the sidebar.
    pub state: CollectionState,
    pub payloads: BTreeMap<ItemId, Vec<u8>>,
}

/// Encodes a layout and its payloads as a pretty-printed JSON document.
pub fn encode_snapshot(
    state: &CollectionState,
    payloads: &BTreeMap<ItemId, Vec<u8>>,
    created_at: DateTime<Utc>,
) -> Result<Vec<u8>, SnapshotError> {
    let document = SnapshotDocument {
        version: SNAPSHOT_VERSION,
        created_at: Some(created_at),
        tiers: state.tiers.clone(),
        sidebar_item_ids: state.sidebar.clone(),
        items: payloads
            .iter()
            .map(|(id, bytes)| (id.clone(), STANDARD.encode(bytes)))
            .collect(),
    };
    serde_json::to_vec_pretty(&document).map_err(SnapshotError::Encode)
}

/// Decodes and validates a snapshot document.
///
/// `tiers` and `items` must be present. `sidebarItemIds` defaults to empty
/// and a missing `version` reads as the first format version. Tier labels
/// and colors must pass the same checks as tier edits.
pub fn decode_snapshot(bytes: &[u8]) -> Result<DecodedSnapshot, SnapshotError> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(SnapshotError::Syntax)?;
    let object = value.as_object().ok_or(SnapshotError::NotAnObject)?;
    for field in ["tiers", "items"] {
        if !object.contains_key(field) {
            return Err(SnapshotError::MissingField(field));
        }
    }

    let document: SnapshotDocument =
        serde_json::from_value(value).map_err(|err| SnapshotError::Malformed(err.to_string()))?;
    if document.version > SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: document.version,
            supported: SNAPSHOT_VERSION,
        });
    }

    let mut payloads = BTreeMap::new();
    for (item_id, encoded) in &document.items {
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|err| SnapshotError::InvalidPayload {
                item_id: item_id.clone(),
                reason: err.to_string(),
            })?;
        payloads.insert(item_id.clone(), bytes);
    }

    let mut tier_ids = HashSet::new();
    for tier in &document.tiers {
        if !tier_ids.insert(&tier.id) {
            return Err(SnapshotError::DuplicateTier(tier.id.clone()));
        }
    }

    let mut tiers = document.tiers;
    for tier in &mut tiers {
        tier.label = normalize_label(&tier.label).ok_or_else(|| {
            SnapshotError::Malformed(format!("tier {} has a blank label", tier.id))
        })?;
        tier.color = normalize_color(&tier.color).ok_or_else(|| {
            SnapshotError::Malformed(format!(
                "tier {} color must be #rrggbb, got `{}`",
                tier.id, tier.color
            ))
        })?;
    }

    let mut state = CollectionState {
        tiers,
        sidebar: document.sidebar_item_ids,
    };
    if let Err(duplicate) = state.check_conservation() {
        return Err(SnapshotError::DuplicateItem(duplicate.item_id));
    }
    let placed: HashSet<ItemId> = state.all_item_ids().into_iter().collect();
    if let Some(missing) = placed.iter().find(|id| !payloads.contains_key(*id)) {
        return Err(SnapshotError::MissingPayload(missing.clone()));
    }
    for item_id in payloads.keys() {
        if !placed.contains(item_id) {
            state.sidebar.push(item_id.clone());
        }
    }

    Ok(DecodedSnapshot {
        version: document.version,
        created_at: document.created_at,
        state,
        payloads,
    })
}
