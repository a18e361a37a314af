//! Board use-case service.
//!
//! # Responsibility
//! - Own the authoritative layout, the drag session and the handle cache.
//! - Orchestrate item creation, drags, tier edits, reset and
//!   snapshot import/export against a record store.
//!
//! # Invariants
//! - Every mutation completes in memory before any store call is issued.
//! - A rejected write leaves memory authoritative and the board `Unsynced`
//!   until the next successful write.
//! - While a capture window is open no mutation is applied.
//! - A display handle is released exactly when its payload is deleted.

use crate::drag::executor::{MoveEffect, MoveExecutor};
use crate::drag::resolver::Hover;
use crate::drag::session::{DragSession, SessionPhase};
use crate::model::collection::CollectionState;
use crate::model::container::{normalize_color, normalize_label, ContainerId, DropTarget, Tier};
use crate::model::ids::{ItemId, TierId};
use crate::outcome::{Outcome, SkipReason, SyncStatus};
use crate::repo::layout_repo::{encode_layout, load_layout, persist_layout};
use crate::repo::record_store::{Namespace, RecordStore, StoreError, StoreResult, StoredRecord};
use crate::service::handles::{DisplayHandle, HandleCache, HandleProvider};
use crate::service::view::{build_view, BoardView};
use crate::snapshot::codec::{decode_snapshot, encode_snapshot};
use crate::snapshot::SnapshotError;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors surfaced by board operations.
///
/// Stale references and calls without a drag session are not errors; see
/// [`SkipReason`].
#[derive(Debug)]
pub enum BoardError {
    /// Snapshot failed validation; nothing was changed.
    Validation(SnapshotError),
    /// Store failure that could not be absorbed into `Unsynced`.
    Store(StoreError),
    /// Tier label is blank after trim.
    InvalidLabel,
    /// Tier color is not `#rrggbb`.
    InvalidColor(String),
}

impl Display for BoardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidLabel => write!(f, "tier label must not be blank"),
            Self::InvalidColor(value) => write!(f, "tier color must be #rrggbb, got `{value}`"),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::InvalidLabel | Self::InvalidColor(_) => None,
        }
    }
}

impl From<SnapshotError> for BoardError {
    fn from(value: SnapshotError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for BoardError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Board behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardOptions {
    /// Seed the default S..D tiers when the store holds no layout.
    pub seed_default_tiers: bool,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            seed_default_tiers: true,
        }
    }
}

/// Counts reported after a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub tier_count: usize,
    pub item_count: usize,
    pub created_at: Option<DateTime<Utc>>,
}

/// Board facade over a record store and a handle provider.
pub struct BoardService<S: RecordStore, P: HandleProvider> {
    store: S,
    options: BoardOptions,
    state: CollectionState,
    session: DragSession,
    handles: HandleCache<P>,
    /// Payloads whose blob write was rejected, kept until a write succeeds.
    pending_blobs: BTreeMap<ItemId, Vec<u8>>,
    /// Blobs whose delete may not have reached the store.
    pending_deletes: BTreeSet<ItemId>,
    sync: SyncStatus,
    capture_open: bool,
}

impl<S: RecordStore, P: HandleProvider> BoardService<S, P> {
    /// Loads the board from `store`.
    ///
    /// A store with no layout starts empty, or seeded with default tiers.
    /// Layout ids without a payload are dropped and payloads without a
    /// position are appended to the sidebar.
    pub fn open(store: S, provider: P, options: BoardOptions) -> Result<Self, BoardError> {
        let mut service = Self {
            store,
            options,
            state: CollectionState::default(),
            session: DragSession::new(),
            handles: HandleCache::new(provider),
            pending_blobs: BTreeMap::new(),
            pending_deletes: BTreeSet::new(),
            sync: SyncStatus::Synced,
            capture_open: false,
        };
        service.reload_from_store()?;
        info!(
            "event=board_open module=service status=ok tiers={} items={}",
            service.state.tiers.len(),
            service.state.item_count()
        );
        Ok(service)
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    pub fn sync_status(&self) -> &SyncStatus {
        &self.sync
    }

    pub fn session_phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn is_capture_window_open(&self) -> bool {
        self.capture_open
    }

    pub fn handle(&self, item_id: &ItemId) -> Option<&DisplayHandle> {
        self.handles.get(item_id)
    }

    /// Point-in-time copy of the item id -> display handle mapping.
    pub fn display_handles(&self) -> BTreeMap<ItemId, DisplayHandle> {
        self.handles.snapshot()
    }

    pub fn handle_provider(&self) -> &P {
        self.handles.provider()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current presentation view, including the drag ghost.
    pub fn view(&self) -> BoardView {
        build_view(&self.state, &self.session, &self.handles.snapshot())
    }

    /// Stores a new payload under a fresh id appended to the sidebar.
    pub fn add_item(&mut self, payload: Vec<u8>) -> Outcome<ItemId> {
        if let Err(reason) = self.ensure_mutable("add_item") {
            return Outcome::Skipped(reason);
        }
        let item_id = ItemId::generate();
        self.state.sidebar.push(item_id.clone());
        self.handles.ensure(&item_id, &payload);
        let size = payload.len();

        let blob = StoredRecord::new(item_id.as_str(), payload);
        let result = self
            .store
            .put(Namespace::Blobs, &blob)
            .and_then(|()| persist_layout(&self.store, &self.state));
        if result.is_err() {
            self.pending_blobs.insert(item_id.clone(), blob.payload);
        }
        self.record_write("add_item", result);
        info!("event=item_add module=service status=ok item={item_id} bytes={size}");
        Outcome::Applied(item_id)
    }

    /// Starts dragging `item_id` out of `source`.
    pub fn begin_drag(&mut self, item_id: ItemId, source: ContainerId) -> Outcome<()> {
        match self.session.begin(&self.state, item_id, source) {
            Ok(()) => Outcome::Applied(()),
            Err(reason) => skipped("drag_begin", reason),
        }
    }

    /// Updates the drag target from a pointer hover report.
    ///
    /// Returns `Applied(true)` only when the resolved target changed.
    pub fn update_drag_target(&mut self, hover: &Hover) -> Outcome<bool> {
        match self.session.update_target(&self.state, hover) {
            Ok(changed) => Outcome::Applied(changed),
            Err(reason) => skipped("drag_update", reason),
        }
    }

    /// Releases the drag on its resolved target.
    ///
    /// The session is idle afterwards whatever the outcome.
    pub fn drop_drag(&mut self) -> Outcome<MoveEffect> {
        let pending = match self.session.drop() {
            Ok(pending) => pending,
            Err(reason) => return skipped("drag_drop", reason),
        };
        if let Err(reason) = self.ensure_mutable("drag_drop") {
            return Outcome::Skipped(reason);
        }

        let report = match MoveExecutor::new(&self.store).apply(&self.state, &pending) {
            Ok(report) => report,
            Err(reason) => return skipped("drag_drop", reason),
        };
        self.state = report.state;

        if let MoveEffect::Deleted { item_id, .. } = &report.effect {
            self.pending_blobs.remove(item_id);
            self.handles.release(item_id);
            if report.persist_error.is_some() {
                self.pending_deletes.insert(item_id.clone());
            }
        }
        match report.persist_error {
            Some(err) => self.mark_unsynced("drag_drop", &err),
            None if matches!(report.effect, MoveEffect::Unchanged { .. }) => {}
            None => self.record_write("drag_drop", Ok(())),
        }
        Outcome::Applied(report.effect)
    }

    /// Abandons any drag gesture. Safe to call on every gesture exit path.
    pub fn cancel_drag(&mut self) -> bool {
        self.session.cancel()
    }

    /// Handles an external payload dropped onto the board.
    ///
    /// Any active drag is cancelled; the payload becomes a new item.
    pub fn external_payload_drop(&mut self, payload: Vec<u8>) -> Outcome<ItemId> {
        if self.session.cancel() {
            debug!("event=external_drop module=service status=ok cancelled_session=true");
        }
        self.add_item(payload)
    }

    /// Appends a new empty tier.
    pub fn create_tier(
        &mut self,
        label: &str,
        color: &str,
    ) -> Result<Outcome<TierId>, BoardError> {
        let label = normalize_label(label).ok_or(BoardError::InvalidLabel)?;
        let color = normalize_color(color).ok_or_else(|| BoardError::InvalidColor(color.to_string()))?;
        if let Err(reason) = self.ensure_mutable("tier_create") {
            return Ok(Outcome::Skipped(reason));
        }
        let tier = Tier::new(label, color);
        let tier_id = tier.id.clone();
        self.state.tiers.push(tier);
        self.persist_current_layout("tier_create");
        Ok(Outcome::Applied(tier_id))
    }

    pub fn rename_tier(&mut self, tier_id: &TierId, label: &str) -> Result<Outcome<()>, BoardError> {
        let label = normalize_label(label).ok_or(BoardError::InvalidLabel)?;
        Ok(self.edit_tier("tier_rename", tier_id, |tier| tier.label = label))
    }

    pub fn recolor_tier(&mut self, tier_id: &TierId, color: &str) -> Result<Outcome<()>, BoardError> {
        let normalized =
            normalize_color(color).ok_or_else(|| BoardError::InvalidColor(color.to_string()))?;
        Ok(self.edit_tier("tier_recolor", tier_id, |tier| tier.color = normalized))
    }

    /// Moves a tier to `target_index` in the tier order (clamped).
    pub fn reorder_tier(&mut self, tier_id: &TierId, target_index: usize) -> Outcome<usize> {
        if let Err(reason) = self.ensure_mutable("tier_reorder") {
            return Outcome::Skipped(reason);
        }
        let Some(applied) = self.state.reorder_tier(tier_id, target_index) else {
            return skipped("tier_reorder", SkipReason::TierNotFound(tier_id.clone()));
        };
        self.persist_current_layout("tier_reorder");
        Outcome::Applied(applied)
    }

    /// Deletes a tier after returning its items to the sidebar.
    pub fn delete_tier(&mut self, tier_id: &TierId) -> Outcome<()> {
        if let Err(reason) = self.ensure_mutable("tier_delete") {
            return Outcome::Skipped(reason);
        }
        let Some(removed) = self.state.dissolve_tier(tier_id) else {
            return skipped("tier_delete", SkipReason::TierNotFound(tier_id.clone()));
        };
        let tier_container = ContainerId::Tier(tier_id.clone());
        let touches_tier = self.session.active().is_some_and(|drag| drag.source == tier_container)
            || self
                .session
                .target()
                .is_some_and(|resolved| resolved.target == DropTarget::Container(tier_container.clone()));
        if touches_tier {
            self.session.cancel();
        }
        info!(
            "event=tier_delete module=service status=ok tier={} label={}",
            removed.id, removed.label
        );
        self.persist_current_layout("tier_delete");
        Outcome::Applied(())
    }

    /// Reissues pending deletes, rewrites pending payloads, then writes the
    /// full layout.
    pub fn retry_sync(&mut self) -> Result<(), BoardError> {
        let pending: Vec<StoredRecord> = self
            .pending_blobs
            .iter()
            .map(|(id, bytes)| StoredRecord::new(id.as_str(), bytes.clone()))
            .collect();
        let result = self
            .pending_deletes
            .iter()
            .try_for_each(|item_id| self.store.delete(Namespace::Blobs, item_id.as_str()))
            .and_then(|()| self.store.put_all(Namespace::Blobs, &pending))
            .and_then(|()| persist_layout(&self.store, &self.state));
        match result {
            Ok(()) => {
                self.pending_deletes.clear();
                self.pending_blobs.clear();
                self.sync = SyncStatus::Synced;
                info!("event=sync_retry module=service status=ok");
                Ok(())
            }
            Err(err) => {
                self.mark_unsynced("sync_retry", &err);
                Err(BoardError::Store(err))
            }
        }
    }

    /// Purges every item and tier, then starts over from defaults.
    pub fn reset(&mut self) -> Outcome<()> {
        if let Err(reason) = self.ensure_mutable("reset") {
            return Outcome::Skipped(reason);
        }
        self.session.cancel();
        let released = self.handles.release_all();
        let mut purged: BTreeSet<ItemId> = self.state.all_item_ids().into_iter().collect();
        purged.extend(std::mem::take(&mut self.pending_blobs).into_keys());
        self.state = self.fresh_state();

        let result = self.store.clear_all().and_then(|cleared| {
            let config = encode_layout(&self.state)?;
            self.store.repopulate(cleared, &config, &[])
        });
        match &result {
            Ok(()) => self.pending_deletes.clear(),
            // The old blobs may still be stored; retry purges them.
            Err(_) => self.pending_deletes.extend(purged),
        }
        self.record_write("reset", result);
        info!("event=board_reset module=service status=ok released_handles={released}");
        Outcome::Applied(())
    }

    /// Informs the core that an export capture started.
    pub fn open_capture_window(&mut self) -> BoardView {
        self.capture_open = true;
        debug!("event=capture_window module=service status=open");
        self.view()
    }

    pub fn close_capture_window(&mut self) {
        self.capture_open = false;
        debug!("event=capture_window module=service status=closed");
    }

    /// Encodes the current board and payloads as a snapshot document.
    ///
    /// The layout is copied before any payload is read. Items whose payload
    /// cannot be found are left out with a warning.
    pub fn export_snapshot(&self, created_at: DateTime<Utc>) -> Result<Vec<u8>, BoardError> {
        let mut layout = self.state.clone();
        let mut payloads = BTreeMap::new();
        let mut missing = HashSet::new();
        for item_id in layout.all_item_ids() {
            if let Some(bytes) = self.pending_blobs.get(&item_id) {
                payloads.insert(item_id, bytes.clone());
                continue;
            }
            match self.store.get(Namespace::Blobs, item_id.as_str())? {
                Some(record) => {
                    payloads.insert(item_id, record.payload);
                }
                None => {
                    warn!("event=snapshot_export module=service status=skip reason=missing_payload item={item_id}");
                    missing.insert(item_id);
                }
            }
        }
        if !missing.is_empty() {
            layout.sidebar.retain(|id| !missing.contains(id));
            for tier in &mut layout.tiers {
                tier.item_ids.retain(|id| !missing.contains(id));
            }
        }

        let bytes = encode_snapshot(&layout, &payloads, created_at)?;
        info!(
            "event=snapshot_export module=service status=ok tiers={} items={} bytes={}",
            layout.tiers.len(),
            payloads.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Replaces the whole board with a snapshot.
    ///
    /// Validation happens before anything is touched. The store is cleared,
    /// then repopulated, then the board is reloaded from it.
    pub fn import_snapshot(&mut self, bytes: &[u8]) -> Result<Outcome<ImportSummary>, BoardError> {
        let decoded = match decode_snapshot(bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("event=snapshot_import module=service status=error error_code=validation error={err}");
                return Err(BoardError::Validation(err));
            }
        };
        if let Err(reason) = self.ensure_mutable("snapshot_import") {
            return Ok(Outcome::Skipped(reason));
        }

        let config = encode_layout(&decoded.state)?;
        let blobs: Vec<StoredRecord> = decoded
            .payloads
            .iter()
            .map(|(id, payload)| StoredRecord::new(id.as_str(), payload.clone()))
            .collect();

        // Nothing has changed yet, so a failed clear is reported to the caller.
        let cleared = self.store.clear_all().map_err(|err| {
            warn!("event=snapshot_import module=service status=error error_code=clear_failed error={err}");
            err
        })?;
        self.session.cancel();
        self.handles.release_all();
        self.pending_blobs.clear();
        self.pending_deletes.clear();

        let summary = ImportSummary {
            tier_count: decoded.state.tiers.len(),
            item_count: decoded.payloads.len(),
            created_at: decoded.created_at,
        };

        if let Err(err) = self.store.repopulate(cleared, &config, &blobs) {
            // The store is empty now; keep the snapshot in memory instead.
            self.mark_unsynced("snapshot_import", &err);
            for (item_id, payload) in &decoded.payloads {
                self.handles.ensure(item_id, payload);
            }
            self.pending_blobs = decoded.payloads;
            self.state = decoded.state;
            return Ok(Outcome::Applied(summary));
        }

        self.reload_from_store()?;
        self.sync = SyncStatus::Synced;
        info!(
            "event=snapshot_import module=service status=ok tiers={} items={}",
            summary.tier_count, summary.item_count
        );
        Ok(Outcome::Applied(summary))
    }

    fn reload_from_store(&mut self) -> Result<(), BoardError> {
        let layout = load_layout(&self.store)?;
        let blobs = self.store.get_all(Namespace::Blobs)?;

        let (mut state, needs_write) = match layout {
            Some(state) => (state, false),
            None => (self.fresh_state(), self.options.seed_default_tiers),
        };
        let repaired = repair_layout(&mut state, &blobs);

        self.handles.release_all();
        for blob in &blobs {
            self.handles.ensure(&ItemId::from(blob.key.as_str()), &blob.payload);
        }
        self.state = state;
        if needs_write || repaired {
            self.persist_current_layout("board_load");
        }
        Ok(())
    }

    fn fresh_state(&self) -> CollectionState {
        if self.options.seed_default_tiers {
            CollectionState::with_default_tiers()
        } else {
            CollectionState::default()
        }
    }

    fn edit_tier(
        &mut self,
        operation: &'static str,
        tier_id: &TierId,
        edit: impl FnOnce(&mut Tier),
    ) -> Outcome<()> {
        if let Err(reason) = self.ensure_mutable(operation) {
            return Outcome::Skipped(reason);
        }
        let Some(tier) = self.state.tier_mut(tier_id) else {
            return skipped(operation, SkipReason::TierNotFound(tier_id.clone()));
        };
        edit(tier);
        self.persist_current_layout(operation);
        Outcome::Applied(())
    }

    fn ensure_mutable(&self, operation: &'static str) -> Result<(), SkipReason> {
        if self.capture_open {
            debug!("event={operation} module=service status=skip reason=capture_window_open");
            return Err(SkipReason::CaptureWindowOpen);
        }
        Ok(())
    }

    fn persist_current_layout(&mut self, operation: &'static str) {
        let result = persist_layout(&self.store, &self.state);
        self.record_write(operation, result);
    }

    fn record_write(&mut self, operation: &'static str, result: StoreResult<()>) {
        match result {
            Ok(()) if !self.has_pending_writes() => self.sync = SyncStatus::Synced,
            Ok(()) => {}
            Err(err) => self.mark_unsynced(operation, &err),
        }
    }

    fn has_pending_writes(&self) -> bool {
        !self.pending_blobs.is_empty() || !self.pending_deletes.is_empty()
    }

    fn mark_unsynced(&mut self, operation: &'static str, err: &StoreError) {
        warn!("event={operation} module=service status=error error_code=store_write_failed error={err}");
        self.sync = SyncStatus::Unsynced {
            reason: err.to_string(),
        };
    }
}

fn skipped<T>(operation: &'static str, reason: SkipReason) -> Outcome<T> {
    debug!(
        "event={operation} module=service status=skip reason={} detail={reason}",
        reason.code()
    );
    Outcome::Skipped(reason)
}

/// Drops ids without a payload and adopts unplaced payloads onto the
/// sidebar end. Returns whether anything changed.
fn repair_layout(state: &mut CollectionState, blobs: &[StoredRecord]) -> bool {
    let stored: HashSet<&str> = blobs.iter().map(|blob| blob.key.as_str()).collect();
    let mut seen: HashSet<ItemId> = HashSet::new();
    let mut changed = false;

    let mut keep = |id: &ItemId| {
        let ok = stored.contains(id.as_str()) && seen.insert(id.clone());
        if !ok {
            warn!("event=board_load module=service status=repair reason=dangling_or_duplicate item={id}");
            changed = true;
        }
        ok
    };
    for tier in &mut state.tiers {
        tier.item_ids.retain(&mut keep);
    }
    state.sidebar.retain(&mut keep);

    for blob in blobs {
        let item_id = ItemId::from(blob.key.as_str());
        if !seen.contains(&item_id) {
            warn!("event=board_load module=service status=repair reason=orphan_payload item={item_id}");
            state.sidebar.push(item_id.clone());
            seen.insert(item_id);
            changed = true;
        }
    }
    changed
}
