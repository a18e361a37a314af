//! Display-handle cache.
//!
//! # Responsibility
//! - Cache one display handle per item id for the presentation layer.
//! - Release each handle exactly once, when its item's payload goes away.
//!
//! # Invariants
//! - A cached handle is released at most once; after release it is no
//!   longer reachable through the cache.
//! - Release failures are logged and swallowed.

use crate::model::ids::ItemId;
use log::warn;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Presentation-side reference to a decoded item payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayHandle(String);

impl DisplayHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DisplayHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider refused to release a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleReleaseError {
    pub handle: DisplayHandle,
    pub reason: String,
}

impl Display for HandleReleaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot release handle {}: {}", self.handle, self.reason)
    }
}

impl Error for HandleReleaseError {}

/// Creates and releases display handles.
pub trait HandleProvider {
    fn acquire(&mut self, item_id: &ItemId, payload: &[u8]) -> DisplayHandle;
    fn release(&mut self, handle: &DisplayHandle) -> Result<(), HandleReleaseError>;
}

/// Default provider issuing object-URL style handles.
#[derive(Debug, Default)]
pub struct ObjectUrlHandles {
    next_serial: u64,
    live: HashSet<DisplayHandle>,
}

impl ObjectUrlHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl HandleProvider for ObjectUrlHandles {
    fn acquire(&mut self, item_id: &ItemId, _payload: &[u8]) -> DisplayHandle {
        self.next_serial += 1;
        let handle = DisplayHandle::new(format!("blob:tierboard/{item_id}#{}", self.next_serial));
        self.live.insert(handle.clone());
        handle
    }

    fn release(&mut self, handle: &DisplayHandle) -> Result<(), HandleReleaseError> {
        if self.live.remove(handle) {
            return Ok(());
        }
        Err(HandleReleaseError {
            handle: handle.clone(),
            reason: "handle is not live".to_string(),
        })
    }
}

/// Per-item handle cache over a provider.
#[derive(Debug)]
pub struct HandleCache<P: HandleProvider> {
    provider: P,
    handles: HashMap<ItemId, DisplayHandle>,
}

impl<P: HandleProvider> HandleCache<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            handles: HashMap::new(),
        }
    }

    /// Returns the cached handle, acquiring one on first use.
    pub fn ensure(&mut self, item_id: &ItemId, payload: &[u8]) -> DisplayHandle {
        if let Some(handle) = self.handles.get(item_id) {
            return handle.clone();
        }
        let handle = self.provider.acquire(item_id, payload);
        self.handles.insert(item_id.clone(), handle.clone());
        handle
    }

    pub fn get(&self, item_id: &ItemId) -> Option<&DisplayHandle> {
        self.handles.get(item_id)
    }

    /// Releases and forgets the handle of `item_id`.
    ///
    /// Returns `false` when no handle was cached.
    pub fn release(&mut self, item_id: &ItemId) -> bool {
        let Some(handle) = self.handles.remove(item_id) else {
            return false;
        };
        if let Err(err) = self.provider.release(&handle) {
            warn!("event=handle_release module=service status=error item={item_id} error={err}");
        }
        true
    }

    /// Releases every cached handle.
    pub fn release_all(&mut self) -> usize {
        let item_ids: Vec<ItemId> = self.handles.keys().cloned().collect();
        item_ids
            .iter()
            .filter(|item_id| self.release(item_id))
            .count()
    }

    /// Point-in-time copy of the id -> handle mapping.
    pub fn snapshot(&self) -> BTreeMap<ItemId, DisplayHandle> {
        self.handles
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}
