//! Drag-and-drop transfer state machine.
//!
//! ```text
//! Idle -> Dragging -> (Hover)* -> Dropped -> Idle
//!            \-------------------> Idle (drag end without drop)
//! ```
//!
//! Driven synchronously by gesture events from any front end. Hover is
//! tracked with per-target enter/leave counters so nested elements firing
//! several enter/leave events count as one logical hover.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PalletError, Result};
use crate::model::{Assignment, Pallet, PalletId, PieceId, PieceSpec, PieceType};
use crate::validation::can_add;

/// Where a drag gesture picks its pieces up.
#[derive(Debug, Clone, Copy)]
pub enum DragSource<'a> {
    /// Unassigned stock of a piece type.
    Pool(&'a PieceType),
    /// One piece type already on a pallet.
    Pallet {
        pallet: &'a Pallet,
        piece_id: PieceId,
    },
}

/// Payload carried by one drag gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragItem {
    pub piece: PieceSpec,
    /// Entire quantity available at the source.
    pub quantity: u32,
    /// Pallet the pieces come from, `None` for the unassigned pool.
    pub source: Option<PalletId>,
}

/// Request for the planning service to move units between pallets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source: Option<PalletId>,
    pub target: PalletId,
    pub piece_id: PieceId,
    pub quantity: u32,
}

/// Observable phase of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragPhase {
    Idle,
    Dragging,
    Hover,
}

/// Why an event was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoopReason {
    IdleWithoutGesture,
    LeaveWithoutEnter,
}

/// Effect produced by one event.
#[derive(Debug, Clone, PartialEq)]
pub enum DragEffect {
    Started { piece_id: PieceId, quantity: u32 },
    HoverChanged { target: PalletId, hovered: bool },
    /// Drop refused locally; nothing is sent.
    Rejected { target: PalletId, reason: String },
    /// Drop accepted; the request is handed to the caller to dispatch.
    Transfer(TransferRequest),
    Cancelled,
    Noop(NoopReason),
}

/// One state-machine step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: DragPhase,
    pub to: DragPhase,
    pub effect: DragEffect,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Dragging {
        item: DragItem,
        hover: BTreeMap<PalletId, u32>,
    },
}

/// Single-gesture transfer machine.
#[derive(Debug, Default)]
pub struct TransferMachine {
    state: State,
}

impl TransferMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> DragPhase {
        match &self.state {
            State::Idle => DragPhase::Idle,
            State::Dragging { hover, .. } if hover.values().any(|&n| n > 0) => DragPhase::Hover,
            State::Dragging { .. } => DragPhase::Dragging,
        }
    }

    /// Whether a gesture is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Dragging { .. })
    }

    /// Item being dragged, if any.
    pub fn drag_item(&self) -> Option<&DragItem> {
        match &self.state {
            State::Idle => None,
            State::Dragging { item, .. } => Some(item),
        }
    }

    /// Whether the pointer is currently over `target`.
    pub fn is_hovered(&self, target: PalletId) -> bool {
        match &self.state {
            State::Idle => false,
            State::Dragging { hover, .. } => hover.get(&target).is_some_and(|&n| n > 0),
        }
    }

    /// Whether `target` should be highlighted as a drop target.
    ///
    /// The source pallet is tracked while hovered but never valid.
    pub fn is_valid_target(&self, target: PalletId) -> bool {
        match &self.state {
            State::Idle => false,
            State::Dragging { item, .. } => item.source != Some(target) && self.is_hovered(target),
        }
    }

    /// Begin a gesture carrying the entire quantity at `source`.
    ///
    /// Fails while another gesture is active; the machine is left untouched.
    pub fn start(&mut self, source: DragSource<'_>) -> Result<Transition> {
        if self.is_active() {
            return Err(PalletError::GestureInProgress);
        }

        let item = match source {
            DragSource::Pool(piece) => DragItem {
                piece: piece.spec.clone(),
                quantity: piece.available(),
                source: None,
            },
            DragSource::Pallet { pallet, piece_id } => {
                pallet.ensure_open()?;
                let assignment = pallet
                    .assignment(piece_id)
                    .ok_or(PalletError::PieceNotFound { piece_id })?;
                DragItem {
                    piece: assignment.piece.clone(),
                    quantity: assignment.quantity,
                    source: Some(pallet.id),
                }
            }
        };

        if item.quantity == 0 {
            return Err(PalletError::NothingToMove {
                piece_id: item.piece.id,
            });
        }

        debug!(
            piece = %item.piece.id,
            quantity = item.quantity,
            source = ?item.source,
            "drag started"
        );
        let effect = DragEffect::Started {
            piece_id: item.piece.id,
            quantity: item.quantity,
        };
        self.state = State::Dragging {
            item,
            hover: BTreeMap::new(),
        };
        Ok(Transition {
            from: DragPhase::Idle,
            to: DragPhase::Dragging,
            effect,
        })
    }

    /// Pointer entered `target` (or one of its nested elements).
    pub fn enter(&mut self, target: PalletId) -> Transition {
        let from = self.phase();
        let State::Dragging { hover, .. } = &mut self.state else {
            return noop(from, NoopReason::IdleWithoutGesture);
        };

        *hover.entry(target).or_insert(0) += 1;
        self.step(
            from,
            DragEffect::HoverChanged {
                target,
                hovered: true,
            },
        )
    }

    /// Pointer left `target` (or one of its nested elements).
    pub fn leave(&mut self, target: PalletId) -> Transition {
        let from = self.phase();
        let State::Dragging { hover, .. } = &mut self.state else {
            return noop(from, NoopReason::IdleWithoutGesture);
        };

        let Some(count) = hover.get_mut(&target).filter(|n| **n > 0) else {
            return noop(from, NoopReason::LeaveWithoutEnter);
        };
        *count -= 1;
        let hovered = *count > 0;
        if !hovered {
            hover.remove(&target);
        }
        self.step(from, DragEffect::HoverChanged { target, hovered })
    }

    /// Drop the dragged item on `target`. Always ends the gesture.
    ///
    /// Dropping on the source pallet, on a closed pallet, or beyond the
    /// target's limits is rejected with a reason and no request. Otherwise
    /// a [`TransferRequest`] is returned for the caller to dispatch; the
    /// machine does not wait for its outcome.
    pub fn drop_on(&mut self, target: &Pallet) -> Transition {
        let from = self.phase();
        let State::Dragging { item, .. } = std::mem::take(&mut self.state) else {
            return noop(from, NoopReason::IdleWithoutGesture);
        };

        let effect = match check_drop(&item, target) {
            Err(reason) => {
                debug!(target = %target.id, %reason, "drop rejected");
                DragEffect::Rejected {
                    target: target.id,
                    reason,
                }
            }
            Ok(()) => {
                debug!(
                    target = %target.id,
                    piece = %item.piece.id,
                    quantity = item.quantity,
                    "drop accepted"
                );
                DragEffect::Transfer(TransferRequest {
                    source: item.source,
                    target: target.id,
                    piece_id: item.piece.id,
                    quantity: item.quantity,
                })
            }
        };

        Transition {
            from,
            to: DragPhase::Idle,
            effect,
        }
    }

    /// Gesture ended without a drop. Clears the item and every hover counter.
    pub fn end(&mut self) -> Transition {
        let from = self.phase();
        if !self.is_active() {
            return noop(from, NoopReason::IdleWithoutGesture);
        }
        self.state = State::Idle;
        debug!("drag cancelled");
        Transition {
            from,
            to: DragPhase::Idle,
            effect: DragEffect::Cancelled,
        }
    }

    fn step(&self, from: DragPhase, effect: DragEffect) -> Transition {
        Transition {
            from,
            to: self.phase(),
            effect,
        }
    }
}

fn noop(phase: DragPhase, reason: NoopReason) -> Transition {
    Transition {
        from: phase,
        to: phase,
        effect: DragEffect::Noop(reason),
    }
}

fn check_drop(item: &DragItem, target: &Pallet) -> std::result::Result<(), String> {
    if item.source == Some(target.id) {
        return Err(format!("Already on this pallet ({})", target.number));
    }
    if target.is_closed() {
        return Err(format!("Pallet {} is closed", target.number));
    }
    let candidate = Assignment::new(item.piece.clone(), item.quantity);
    let verdict = can_add(
        &target.assignments,
        std::slice::from_ref(&candidate),
        target.max_weight_kg,
        target.max_height_mm,
    );
    match verdict.reason {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}
