//! Interactive transfer of units between pallets.

mod machine;

pub use machine::{
    DragEffect, DragItem, DragPhase, DragSource, NoopReason, TransferMachine, TransferRequest,
    Transition,
};
