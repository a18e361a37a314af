//! Insertion index resolution.
//!
//! Pure functions mapping the hovered container, the hovered item and the
//! pointer position to a destination index.
//!
//! # Invariants
//! - Indices describe the destination sequence with the dragged item
//!   already removed.
//! - The result is always within `[0, filtered_len]`.

use crate::model::collection::CollectionState;
use crate::model::container::{ContainerId, DropTarget};
use crate::model::ids::ItemId;

/// Horizontal extent of a rendered item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemBounds {
    pub left: f64,
    pub width: f64,
}

impl ItemBounds {
    pub fn midpoint_x(&self) -> f64 {
        self.left + self.width / 2.0
    }
}

/// Item currently under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct HoveredItem {
    pub item_id: ItemId,
    pub pointer_x: f64,
    pub bounds: ItemBounds,
}

/// Pointer hover report from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Hover {
    pub target: DropTarget,
    /// `None` while hovering empty container space.
    pub item: Option<HoveredItem>,
}

impl Hover {
    /// Hover over empty space of a container.
    pub fn container(container: ContainerId) -> Self {
        Self {
            target: DropTarget::Container(container),
            item: None,
        }
    }

    /// Hover over one item of a container.
    pub fn item(container: ContainerId, item: HoveredItem) -> Self {
        Self {
            target: DropTarget::Container(container),
            item: Some(item),
        }
    }

    pub fn trash() -> Self {
        Self {
            target: DropTarget::Trash,
            item: None,
        }
    }
}

/// A resolved drop location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedTarget {
    pub target: DropTarget,
    pub index: usize,
}

/// Returns `sequence` without `dragged`.
pub fn filtered_sequence(sequence: &[ItemId], dragged: &ItemId) -> Vec<ItemId> {
    sequence.iter().filter(|id| *id != dragged).cloned().collect()
}

/// Resolves the insertion index within an already filtered sequence.
///
/// Left of the hovered item's midpoint inserts before it, at or right of
/// the midpoint inserts after it. Empty space, or a hovered id missing from
/// `filtered`, appends.
pub fn resolve_insertion_index(filtered: &[ItemId], hovered: Option<&HoveredItem>) -> usize {
    let Some(hovered) = hovered else {
        return filtered.len();
    };
    let Some(position) = filtered.iter().position(|id| *id == hovered.item_id) else {
        return filtered.len();
    };
    if hovered.pointer_x < hovered.bounds.midpoint_x() {
        position
    } else {
        position + 1
    }
}

/// Resolves a hover report against the board for the dragged item.
///
/// Returns `None` when the hovered container no longer exists.
pub fn resolve(state: &CollectionState, dragged: &ItemId, hover: &Hover) -> Option<ResolvedTarget> {
    match &hover.target {
        DropTarget::Trash => Some(ResolvedTarget {
            target: DropTarget::Trash,
            index: 0,
        }),
        DropTarget::Container(container) => {
            let filtered = filtered_sequence(state.sequence(container)?, dragged);
            Some(ResolvedTarget {
                target: hover.target.clone(),
                index: resolve_insertion_index(&filtered, hover.item.as_ref()),
            })
        }
    }
}
