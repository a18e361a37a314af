//! Board layout <-> config record mapping.
//!
//! # Invariants
//! - The layout is always written as one `put_all` over the `tiers` and
//!   `sidebar` keys, never record by record.
//! - A store without a `tiers` record holds no layout.

use crate::model::collection::CollectionState;
use crate::model::container::Tier;
use crate::model::ids::ItemId;
use crate::repo::record_store::{Namespace, RecordStore, StoreError, StoreResult, StoredRecord};

pub const TIERS_KEY: &str = "tiers";
pub const SIDEBAR_KEY: &str = "sidebar";

/// Encodes the layout into its config records.
pub fn encode_layout(state: &CollectionState) -> StoreResult<Vec<StoredRecord>> {
    let tiers = serde_json::to_vec(&state.tiers)
        .map_err(|err| StoreError::InvalidData(format!("cannot encode tiers: {err}")))?;
    let sidebar = serde_json::to_vec(&state.sidebar)
        .map_err(|err| StoreError::InvalidData(format!("cannot encode sidebar: {err}")))?;
    Ok(vec![
        StoredRecord::new(TIERS_KEY, tiers),
        StoredRecord::new(SIDEBAR_KEY, sidebar),
    ])
}

/// Decodes config records back into a layout.
///
/// Returns `Ok(None)` when the `tiers` record is absent. A missing
/// `sidebar` record decodes as an empty sidebar.
pub fn decode_layout(records: &[StoredRecord]) -> StoreResult<Option<CollectionState>> {
    let Some(tiers_record) = records.iter().find(|record| record.key == TIERS_KEY) else {
        return Ok(None);
    };
    let tiers: Vec<Tier> = serde_json::from_slice(&tiers_record.payload)
        .map_err(|err| StoreError::InvalidData(format!("config.{TIERS_KEY}: {err}")))?;
    let sidebar: Vec<ItemId> = match records.iter().find(|record| record.key == SIDEBAR_KEY) {
        Some(record) => serde_json::from_slice(&record.payload)
            .map_err(|err| StoreError::InvalidData(format!("config.{SIDEBAR_KEY}: {err}")))?,
        None => Vec::new(),
    };
    Ok(Some(CollectionState { tiers, sidebar }))
}

/// Writes the full layout as one logical write.
pub fn persist_layout<S: RecordStore + ?Sized>(
    store: &S,
    state: &CollectionState,
) -> StoreResult<()> {
    let records = encode_layout(state)?;
    store.put_all(Namespace::Config, &records)
}

/// Loads the persisted layout, if any.
pub fn load_layout<S: RecordStore + ?Sized>(store: &S) -> StoreResult<Option<CollectionState>> {
    let records = store.get_all(Namespace::Config)?;
    decode_layout(&records)
}
