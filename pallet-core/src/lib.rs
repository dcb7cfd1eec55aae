//! pallet-core - Capacity model and load-assignment engine for panel pallets.
//!
//! Cut panels (formatki) are loaded onto transport pallets under a weight and
//! a stack height limit. This crate estimates weight and height from piece
//! geometry, checks and suggests quantities, and drives the interactive
//! transfer of units between pallets against a remote planning service.
//!
//! # Example
//!
//! ```
//! use pallet_core::{max_addable, Assignment, PieceSpec};
//!
//! let board = PieceSpec::new(1, 400.0, 300.0);
//! let on_pallet = vec![Assignment::new(board.clone(), 120)];
//! let more = max_addable(&board, &on_pallet, 1_000, 700.0, 1440.0);
//! assert!(more > 0);
//! ```

pub mod advisor;
pub mod cache;
pub mod capacity;
pub mod config;
pub mod error;
pub mod model;
pub mod planning;
pub mod transfer;
pub mod validation;

// Re-exports for convenience
pub use advisor::{advise, can_merge, max_addable, Limiting, QuantityAdvice};
pub use cache::{CacheEntry, CacheStats, PalletCache, RefreshSchedule, SyncState};
pub use capacity::{levels_for, stacked_height, stacked_weight, unit_weight};
pub use config::PalletConfig;
pub use error::{ErrorKind, PalletError, Result};
pub use model::{
    Assignment, Destination, OrderId, Pallet, PalletId, PalletStatus, PieceId, PieceSpec,
    PieceType, PositionId,
};
pub use planning::{
    CreatedPallet, LineItem, MemoryPlanner, NewPallet, OrderBook, PalletEdit, PalletStats,
    PlanRequest, PlanningError, PlanningService,
};
pub use transfer::{
    DragEffect, DragItem, DragPhase, DragSource, TransferMachine, TransferRequest, Transition,
};
pub use validation::{can_add, evaluate, review_order, LimitReport, ValidationResult, Verdict};
