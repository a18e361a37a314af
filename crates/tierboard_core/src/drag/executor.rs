//! Move executor.
//!
//! # Responsibility
//! - Apply a released drag to the board layout, producing the next layout.
//! - Record the resulting layout durably.
//!
//! # Invariants
//! - The dragged id leaves its source before it is placed, so a same
//!   container move sees the same filtered sequence the resolver used.
//! - A skipped move leaves the input layout untouched.
//! - A failed write never rolls back the in-memory result.

use crate::drag::session::PendingMove;
use crate::model::collection::CollectionState;
use crate::model::container::{ContainerId, DropTarget};
use crate::model::ids::ItemId;
use crate::outcome::SkipReason;
use crate::repo::layout_repo::persist_layout;
use crate::repo::record_store::{Namespace, RecordStore, StoreError};
use log::{debug, info, warn};

/// What a move did to the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveEffect {
    /// Item changed container or position.
    Moved {
        item_id: ItemId,
        from: ContainerId,
        from_index: usize,
        to: ContainerId,
        to_index: usize,
    },
    /// Item was dropped back onto its own position.
    Unchanged {
        item_id: ItemId,
        container: ContainerId,
        index: usize,
    },
    /// Item was dropped onto the trash sink.
    Deleted {
        item_id: ItemId,
        from: ContainerId,
        from_index: usize,
    },
}

/// Next layout plus the durability result of recording it.
#[derive(Debug)]
pub struct MoveReport {
    pub state: CollectionState,
    pub effect: MoveEffect,
    /// Set when the write was rejected; `state` is still authoritative.
    pub persist_error: Option<StoreError>,
}

/// Applies a move to a copy of `state`, without touching the store.
pub fn apply_in_memory(
    state: &CollectionState,
    pending: &PendingMove,
) -> Result<(CollectionState, MoveEffect), SkipReason> {
    if let DropTarget::Container(destination) = &pending.target.target {
        if !state.has_container(destination) {
            return Err(SkipReason::ContainerNotFound(destination.clone()));
        }
    }

    let mut next = state.clone();
    let from_index = next
        .remove_item(&pending.source, &pending.item_id)
        .ok_or_else(|| SkipReason::ItemNotFound(pending.item_id.clone()))?;

    let effect = match &pending.target.target {
        DropTarget::Trash => MoveEffect::Deleted {
            item_id: pending.item_id.clone(),
            from: pending.source.clone(),
            from_index,
        },
        DropTarget::Container(destination) => {
            let to_index = next
                .insert_item(destination, pending.target.index, pending.item_id.clone())
                .ok_or_else(|| SkipReason::ContainerNotFound(destination.clone()))?;
            if *destination == pending.source && to_index == from_index {
                MoveEffect::Unchanged {
                    item_id: pending.item_id.clone(),
                    container: destination.clone(),
                    index: to_index,
                }
            } else {
                MoveEffect::Moved {
                    item_id: pending.item_id.clone(),
                    from: pending.source.clone(),
                    from_index,
                    to: destination.clone(),
                    to_index,
                }
            }
        }
    };
    Ok((next, effect))
}

/// Executes released drags against a record store.
pub struct MoveExecutor<'s, S: RecordStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: RecordStore + ?Sized> MoveExecutor<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Applies `pending` and persists the full resulting layout.
    ///
    /// Trash drops purge the payload before the layout is written. An
    /// unchanged drop issues no write.
    pub fn apply(
        &self,
        state: &CollectionState,
        pending: &PendingMove,
    ) -> Result<MoveReport, SkipReason> {
        let (next, effect) = apply_in_memory(state, pending)?;

        let persist_error = match &effect {
            MoveEffect::Unchanged { item_id, .. } => {
                debug!("event=move_apply module=drag status=ok effect=unchanged item={item_id}");
                None
            }
            MoveEffect::Moved {
                item_id,
                from,
                to,
                to_index,
                ..
            } => {
                info!(
                    "event=move_apply module=drag status=ok effect=moved item={item_id} from={from} to={to} index={to_index}"
                );
                persist_layout(self.store, &next).err()
            }
            MoveEffect::Deleted { item_id, from, .. } => {
                info!("event=move_apply module=drag status=ok effect=deleted item={item_id} from={from}");
                self.store
                    .delete(Namespace::Blobs, item_id.as_str())
                    .and_then(|()| persist_layout(self.store, &next))
                    .err()
            }
        };

        if let Some(err) = &persist_error {
            warn!("event=move_persist module=drag status=error error={err}");
        }

        Ok(MoveReport {
            state: next,
            effect,
            persist_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_in_memory, MoveEffect};
    use crate::drag::resolver::ResolvedTarget;
    use crate::drag::session::PendingMove;
    use crate::model::collection::CollectionState;
    use crate::model::container::{ContainerId, DropTarget, Tier};
    use crate::model::ids::ItemId;
    use crate::outcome::SkipReason;

    fn ids(values: &[&str]) -> Vec<ItemId> {
        values.iter().map(|value| ItemId::from(*value)).collect()
    }

    fn board() -> (CollectionState, ContainerId) {
        let mut tier = Tier::new("S", "#ff7f7f");
        tier.item_ids = ids(&["a", "b", "c"]);
        let container = ContainerId::Tier(tier.id.clone());
        (
            CollectionState {
                tiers: vec![tier],
                sidebar: ids(&["d"]),
            },
            container,
        )
    }

    fn pending(item: &str, source: ContainerId, target: DropTarget, index: usize) -> PendingMove {
        PendingMove {
            item_id: ItemId::from(item),
            source,
            target: ResolvedTarget { target, index },
        }
    }

    #[test]
    fn same_container_move_uses_filtered_indices() {
        let (state, s) = board();
        // Drag `a` after `c`: filtered [b, c], index 2.
        let mv = pending("a", s.clone(), DropTarget::Container(s.clone()), 2);
        let (next, effect) = apply_in_memory(&state, &mv).unwrap();
        assert_eq!(next.sequence(&s).unwrap(), ids(&["b", "c", "a"]).as_slice());
        assert!(matches!(effect, MoveEffect::Moved { to_index: 2, .. }));
    }

    #[test]
    fn index_is_clamped_to_destination_length() {
        let (state, s) = board();
        let mv = pending("d", ContainerId::Sidebar, DropTarget::Container(s.clone()), 42);
        let (next, _) = apply_in_memory(&state, &mv).unwrap();
        assert_eq!(next.sequence(&s).unwrap(), ids(&["a", "b", "c", "d"]).as_slice());
        assert!(next.sidebar.is_empty());
    }

    #[test]
    fn dropping_at_own_position_is_unchanged() {
        let (state, s) = board();
        let mv = pending("b", s.clone(), DropTarget::Container(s.clone()), 1);
        let (next, effect) = apply_in_memory(&state, &mv).unwrap();
        assert_eq!(next, state);
        assert!(matches!(effect, MoveEffect::Unchanged { index: 1, .. }));
    }

    #[test]
    fn trash_removes_from_every_container() {
        let (state, s) = board();
        let mv = pending("b", s, DropTarget::Trash, 0);
        let (next, effect) = apply_in_memory(&state, &mv).unwrap();
        assert!(!next.contains_item(&ItemId::from("b")));
        assert!(matches!(effect, MoveEffect::Deleted { from_index: 1, .. }));
    }

    #[test]
    fn stale_source_is_skipped_without_mutation() {
        let (state, s) = board();
        let mv = pending("d", s, DropTarget::Trash, 0);
        let err = apply_in_memory(&state, &mv).unwrap_err();
        assert_eq!(err, SkipReason::ItemNotFound(ItemId::from("d")));
    }
}
