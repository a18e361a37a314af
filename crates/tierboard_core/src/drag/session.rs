//! Drag session controller.
//!
//! # Responsibility
//! - Track one in-progress drag gesture apart from the board layout.
//! - Deduplicate high-frequency target updates.
//!
//! # Invariants
//! - At most one gesture is active at a time.
//! - `drop` and `cancel` always leave the controller idle.
//! - State is read and written synchronously; there is no deferred write.

use crate::drag::resolver::{resolve, Hover, ResolvedTarget};
use crate::model::collection::CollectionState;
use crate::model::container::{ContainerId, DropTarget};
use crate::model::ids::ItemId;
use crate::outcome::SkipReason;
use log::debug;

/// State of one active gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDrag {
    pub item_id: ItemId,
    pub source: ContainerId,
    pub target: Option<ResolvedTarget>,
}

/// Move handed to the executor when a gesture is released on a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub item_id: ItemId,
    pub source: ContainerId,
    pub target: ResolvedTarget,
}

/// Observable controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Active { has_target: bool },
}

/// Drag gesture controller. `Idle` is represented by `None`.
#[derive(Debug, Default)]
pub struct DragSession {
    active: Option<ActiveDrag>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        match &self.active {
            None => SessionPhase::Idle,
            Some(drag) => SessionPhase::Active {
                has_target: drag.target.is_some(),
            },
        }
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        self.active.as_ref()
    }

    pub fn target(&self) -> Option<&ResolvedTarget> {
        self.active.as_ref().and_then(|drag| drag.target.as_ref())
    }

    /// Starts a gesture for `item_id` held by `source`.
    ///
    /// A still-active earlier gesture is discarded first.
    pub fn begin(
        &mut self,
        state: &CollectionState,
        item_id: ItemId,
        source: ContainerId,
    ) -> Result<(), SkipReason> {
        let Some(sequence) = state.sequence(&source) else {
            return Err(SkipReason::ContainerNotFound(source));
        };
        if !sequence.contains(&item_id) {
            return Err(SkipReason::ItemNotFound(item_id));
        }
        if let Some(stale) = self.active.take() {
            debug!(
                "event=drag_begin module=drag status=skip reason=stale_session_discarded item={}",
                stale.item_id
            );
        }
        debug!("event=drag_begin module=drag status=ok item={item_id} source={source}");
        self.active = Some(ActiveDrag {
            item_id,
            source,
            target: None,
        });
        Ok(())
    }

    /// Resolves `hover` and stores it as the target.
    ///
    /// Returns `Ok(true)` only when the stored target changed, so repeated
    /// identical pointer events cause no further work.
    pub fn update_target(
        &mut self,
        state: &CollectionState,
        hover: &Hover,
    ) -> Result<bool, SkipReason> {
        let Some(drag) = self.active.as_mut() else {
            return Err(SkipReason::NoActiveSession);
        };
        let Some(resolved) = resolve(state, &drag.item_id, hover) else {
            return Err(match &hover.target {
                DropTarget::Container(container) => SkipReason::ContainerNotFound(container.clone()),
                DropTarget::Trash => SkipReason::NoTarget,
            });
        };
        if drag.target.as_ref() == Some(&resolved) {
            return Ok(false);
        }
        drag.target = Some(resolved);
        Ok(true)
    }

    /// Ends the gesture and returns the move to apply.
    ///
    /// The controller is idle afterwards whatever the result. A drop with no
    /// resolved target is a cancel.
    pub fn drop(&mut self) -> Result<PendingMove, SkipReason> {
        let Some(drag) = self.active.take() else {
            return Err(SkipReason::NoActiveSession);
        };
        let Some(target) = drag.target else {
            debug!(
                "event=drag_drop module=drag status=skip reason=no_target item={}",
                drag.item_id
            );
            return Err(SkipReason::NoTarget);
        };
        Ok(PendingMove {
            item_id: drag.item_id,
            source: drag.source,
            target,
        })
    }

    /// Clears any gesture. Safe to call when idle.
    ///
    /// Returns whether a gesture was active.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(drag) => {
                debug!("event=drag_cancel module=drag status=ok item={}", drag.item_id);
                true
            }
            None => false,
        }
    }
}
