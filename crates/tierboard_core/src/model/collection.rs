//! Authoritative in-memory board layout.
//!
//! # Responsibility
//! - Hold the ordered tiers and the sidebar pool as one explicit value.
//! - Provide the primitive sequence edits the drag engine and tier
//!   operations are built from.
//!
//! # Invariants
//! - An item id appears in at most one container sequence.
//! - Insert positions are clamped to `[0, len]` of the destination.

use crate::model::container::{ContainerId, Tier, DEFAULT_TIERS};
use crate::model::ids::{ItemId, TierId};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Ordered tiers plus the unassigned sidebar pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    /// Tiers in user-controlled display order.
    pub tiers: Vec<Tier>,
    /// Unassigned items in display order.
    pub sidebar: Vec<ItemId>,
}

/// Conservation failure detected by [`CollectionState::check_conservation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateItem {
    pub item_id: ItemId,
}

impl Display for DuplicateItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "item {} appears in more than one position", self.item_id)
    }
}

impl CollectionState {
    /// Builds an empty board carrying the default S..D tiers.
    pub fn with_default_tiers() -> Self {
        Self {
            tiers: DEFAULT_TIERS
                .iter()
                .map(|(label, color)| Tier::new(*label, *color))
                .collect(),
            sidebar: Vec::new(),
        }
    }

    /// Returns the ordered ids of one container.
    pub fn sequence(&self, container: &ContainerId) -> Option<&[ItemId]> {
        match container {
            ContainerId::Sidebar => Some(self.sidebar.as_slice()),
            ContainerId::Tier(tier_id) => self.tier(tier_id).map(|tier| tier.item_ids.as_slice()),
        }
    }

    fn sequence_mut(&mut self, container: &ContainerId) -> Option<&mut Vec<ItemId>> {
        match container {
            ContainerId::Sidebar => Some(&mut self.sidebar),
            ContainerId::Tier(tier_id) => self
                .tiers
                .iter_mut()
                .find(|tier| tier.id == *tier_id)
                .map(|tier| &mut tier.item_ids),
        }
    }

    pub fn tier(&self, tier_id: &TierId) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.id == *tier_id)
    }

    pub fn tier_mut(&mut self, tier_id: &TierId) -> Option<&mut Tier> {
        self.tiers.iter_mut().find(|tier| tier.id == *tier_id)
    }

    pub fn tier_index(&self, tier_id: &TierId) -> Option<usize> {
        self.tiers.iter().position(|tier| tier.id == *tier_id)
    }

    pub fn has_container(&self, container: &ContainerId) -> bool {
        self.sequence(container).is_some()
    }

    /// Finds the container and position currently holding `item_id`.
    pub fn locate(&self, item_id: &ItemId) -> Option<(ContainerId, usize)> {
        if let Some(index) = self.sidebar.iter().position(|id| id == item_id) {
            return Some((ContainerId::Sidebar, index));
        }
        self.tiers.iter().find_map(|tier| {
            tier.item_ids
                .iter()
                .position(|id| id == item_id)
                .map(|index| (ContainerId::Tier(tier.id.clone()), index))
        })
    }

    pub fn contains_item(&self, item_id: &ItemId) -> bool {
        self.locate(item_id).is_some()
    }

    /// Every item id in display order: tiers top to bottom, then sidebar.
    pub fn all_item_ids(&self) -> Vec<ItemId> {
        self.tiers
            .iter()
            .flat_map(|tier| tier.item_ids.iter())
            .chain(self.sidebar.iter())
            .cloned()
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.tiers.iter().map(|tier| tier.item_ids.len()).sum::<usize>() + self.sidebar.len()
    }

    /// Removes `item_id` from `container`, returning its former position.
    pub fn remove_item(&mut self, container: &ContainerId, item_id: &ItemId) -> Option<usize> {
        let sequence = self.sequence_mut(container)?;
        let index = sequence.iter().position(|id| id == item_id)?;
        sequence.remove(index);
        Some(index)
    }

    /// Inserts `item_id` into `container` at `index` clamped to the
    /// sequence length. Returns the applied index, or `None` when the
    /// container does not exist.
    pub fn insert_item(
        &mut self,
        container: &ContainerId,
        index: usize,
        item_id: ItemId,
    ) -> Option<usize> {
        let sequence = self.sequence_mut(container)?;
        let applied = index.min(sequence.len());
        sequence.insert(applied, item_id);
        Some(applied)
    }

    /// Removes the tier after returning its items to the sidebar end in
    /// their tier order.
    pub fn dissolve_tier(&mut self, tier_id: &TierId) -> Option<Tier> {
        let index = self.tier_index(tier_id)?;
        let mut tier = self.tiers.remove(index);
        self.sidebar.append(&mut tier.item_ids);
        Some(tier)
    }

    /// Moves a tier to `target_index` in the tier order (clamped).
    pub fn reorder_tier(&mut self, tier_id: &TierId, target_index: usize) -> Option<usize> {
        let index = self.tier_index(tier_id)?;
        let tier = self.tiers.remove(index);
        let applied = target_index.min(self.tiers.len());
        self.tiers.insert(applied, tier);
        Some(applied)
    }

    /// Verifies that no item id is held twice.
    pub fn check_conservation(&self) -> Result<(), DuplicateItem> {
        let mut seen = HashSet::new();
        for item_id in self
            .tiers
            .iter()
            .flat_map(|tier| tier.item_ids.iter())
            .chain(self.sidebar.iter())
        {
            if !seen.insert(item_id) {
                return Err(DuplicateItem {
                    item_id: item_id.clone(),
                });
            }
        }
        Ok(())
    }
}
