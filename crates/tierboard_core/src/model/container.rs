//! Container kinds and tier records.
//!
//! # Invariants
//! - `ContainerId` only names persisted containers (tiers and the sidebar).
//! - `DropTarget::Trash` is the only way to address the trash sink.

use crate::model::ids::{ItemId, TierId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static TIER_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid tier color regex"));

/// Labels and colors of the tiers seeded into an empty board.
pub const DEFAULT_TIERS: &[(&str, &str)] = &[
    ("S", "#ff7f7f"),
    ("A", "#ffbf7f"),
    ("B", "#ffdf7f"),
    ("C", "#ffff7f"),
    ("D", "#bfff7f"),
];

/// Persisted container address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContainerId {
    /// One user-defined ranked tier.
    Tier(TierId),
    /// The unassigned pool.
    Sidebar,
}

impl Display for ContainerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tier(id) => write!(f, "tier:{id}"),
            Self::Sidebar => write!(f, "sidebar"),
        }
    }
}

/// Where a dragged item can be released.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DropTarget {
    Container(ContainerId),
    /// Virtual sink that deletes whatever is dropped on it.
    Trash,
}

impl From<ContainerId> for DropTarget {
    fn from(value: ContainerId) -> Self {
        Self::Container(value)
    }
}

impl Display for DropTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container(container) => write!(f, "{container}"),
            Self::Trash => write!(f, "trash"),
        }
    }
}

/// One ranked tier: label, color and ordered item ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub id: TierId,
    pub label: String,
    pub color: String,
    pub item_ids: Vec<ItemId>,
}

impl Tier {
    /// Creates an empty tier with a generated id.
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: TierId::generate(),
            label: label.into(),
            color: color.into(),
            item_ids: Vec::new(),
        }
    }
}

/// Returns the trimmed label, or `None` when it is blank.
pub fn normalize_label(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Returns the lowercase `#rrggbb` color, or `None` when malformed.
pub fn normalize_color(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if !TIER_COLOR_RE.is_match(trimmed) {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{normalize_color, normalize_label, ContainerId, DropTarget, DEFAULT_TIERS};

    #[test]
    fn default_tier_colors_are_valid() {
        for (_, color) in DEFAULT_TIERS {
            assert!(normalize_color(color).is_some(), "{color} should be valid");
        }
    }

    #[test]
    fn normalize_color_rejects_short_and_named_colors() {
        assert_eq!(normalize_color(" #FFAA00 ").as_deref(), Some("#ffaa00"));
        assert!(normalize_color("#fa0").is_none());
        assert!(normalize_color("red").is_none());
    }

    #[test]
    fn normalize_label_trims_and_rejects_blank() {
        assert_eq!(normalize_label("  S+ ").as_deref(), Some("S+"));
        assert!(normalize_label(" \t ").is_none());
    }

    #[test]
    fn drop_target_display_is_stable() {
        assert_eq!(DropTarget::Trash.to_string(), "trash");
        assert_eq!(DropTarget::from(ContainerId::Sidebar).to_string(), "sidebar");
    }
}
