//! Presentation read model.
//!
//! The dragged item is hidden from its source and a ghost marks the
//! resolved insertion point, so the view already shows the post-drop order.

use crate::drag::session::DragSession;
use crate::model::collection::CollectionState;
use crate::model::container::{ContainerId, DropTarget};
use crate::model::ids::{ItemId, TierId};
use crate::service::handles::DisplayHandle;
use std::collections::BTreeMap;

/// One rendered slot of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEntry {
    Item {
        item_id: ItemId,
        handle: Option<DisplayHandle>,
    },
    /// Placeholder at the resolved drop position.
    Ghost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierView {
    pub tier_id: TierId,
    pub label: String,
    pub color: String,
    pub entries: Vec<ViewEntry>,
}

/// Frozen, owned view of the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub tiers: Vec<TierView>,
    pub sidebar: Vec<ViewEntry>,
}

impl BoardView {
    /// Item ids in display order, ghosts skipped.
    pub fn sidebar_item_ids(&self) -> Vec<ItemId> {
        item_ids(&self.sidebar)
    }

    pub fn tier_item_ids(&self, index: usize) -> Vec<ItemId> {
        self.tiers
            .get(index)
            .map(|tier| item_ids(&tier.entries))
            .unwrap_or_default()
    }

    pub fn ghost_position(&self) -> Option<(Option<usize>, usize)> {
        if let Some(index) = self.sidebar.iter().position(|entry| *entry == ViewEntry::Ghost) {
            return Some((None, index));
        }
        self.tiers.iter().enumerate().find_map(|(tier_index, tier)| {
            tier.entries
                .iter()
                .position(|entry| *entry == ViewEntry::Ghost)
                .map(|index| (Some(tier_index), index))
        })
    }
}

fn item_ids(entries: &[ViewEntry]) -> Vec<ItemId> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            ViewEntry::Item { item_id, .. } => Some(item_id.clone()),
            ViewEntry::Ghost => None,
        })
        .collect()
}

/// Builds the view for the current layout and gesture.
pub fn build_view(
    state: &CollectionState,
    session: &DragSession,
    handles: &BTreeMap<ItemId, DisplayHandle>,
) -> BoardView {
    let dragged = session.active().map(|drag| &drag.item_id);
    let ghost = session.target().and_then(|resolved| match &resolved.target {
        DropTarget::Container(container) => Some((container, resolved.index)),
        DropTarget::Trash => None,
    });

    let entries_for = |container: &ContainerId, sequence: &[ItemId]| -> Vec<ViewEntry> {
        let mut entries: Vec<ViewEntry> = sequence
            .iter()
            .filter(|id| Some(*id) != dragged)
            .map(|id| ViewEntry::Item {
                item_id: id.clone(),
                handle: handles.get(id).cloned(),
            })
            .collect();
        if let Some((target, index)) = ghost {
            if target == container {
                let index = index.min(entries.len());
                entries.insert(index, ViewEntry::Ghost);
            }
        }
        entries
    };

    BoardView {
        tiers: state
            .tiers
            .iter()
            .map(|tier| TierView {
                tier_id: tier.id.clone(),
                label: tier.label.clone(),
                color: tier.color.clone(),
                entries: entries_for(&ContainerId::Tier(tier.id.clone()), &tier.item_ids),
            })
            .collect(),
        sidebar: entries_for(&ContainerId::Sidebar, &state.sidebar),
    }
}
