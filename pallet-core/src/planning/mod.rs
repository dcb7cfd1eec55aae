//! Planning service seam.
//!
//! The planning service owns authoritative pallet state and runs behind a
//! remote boundary. The engine only sees the operations below and trusts
//! their results.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PalletError;
use crate::model::{Destination, OrderId, Pallet, PalletId, PieceId, PieceType, PositionId};
use crate::transfer::TransferRequest;

pub use memory::{MemoryPlanner, OrderBook};

/// Failure reported by (or on the way to) the planning service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("not found")]
    NotFound,

    #[error("{reason}")]
    Rejected { reason: String },
}

impl PlanningError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        PlanningError::Rejected {
            reason: reason.into(),
        }
    }
}

impl From<PlanningError> for PalletError {
    fn from(err: PlanningError) -> Self {
        match err {
            PlanningError::Connection(message) => PalletError::Connection { message },
            PlanningError::NotFound => PalletError::Service {
                reason: "Not found".into(),
            },
            PlanningError::Rejected { reason } => PalletError::Service { reason },
        }
    }
}

/// One piece type and quantity in a create or edit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub piece_id: PieceId,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(piece_id: impl Into<PieceId>, quantity: u32) -> Self {
        Self {
            piece_id: piece_id.into(),
            quantity,
        }
    }
}

/// Request to create a pallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPallet {
    pub position: PositionId,
    pub destination: Destination,
    pub items: Vec<LineItem>,
    pub max_weight_kg: f64,
    pub max_height_mm: f64,
    #[serde(default)]
    pub notes: String,
}

/// Request to replace a pallet's contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PalletEdit {
    pub pallet_id: PalletId,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub destination: Option<Destination>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to plan pallets for every unassigned piece of a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub position: PositionId,
    pub destination: Destination,
    pub max_weight_kg: f64,
    pub max_height_mm: f64,
}

/// Aggregates of one pallet as computed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PalletStats {
    pub pieces: u32,
    pub weight_kg: f64,
    pub height_mm: f64,
}

impl From<&Pallet> for PalletStats {
    fn from(pallet: &Pallet) -> Self {
        Self {
            pieces: pallet.total_pieces(),
            weight_kg: pallet.total_weight(),
            height_mm: pallet.stack_height(),
        }
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreatedPallet {
    pub pallet_id: PalletId,
    pub number: u32,
    pub stats: PalletStats,
}

/// Operations the engine consumes from the planning service.
///
/// Calls are issued from one thread and interleave only at `.await` points.
#[async_trait(?Send)]
pub trait PlanningService {
    /// All pallets of an order.
    async fn fetch_pallets(&self, order: OrderId) -> Result<Vec<Pallet>, PlanningError>;

    /// All piece types of an order, with `assigned` recomputed.
    async fn fetch_pieces(&self, order: OrderId) -> Result<Vec<PieceType>, PlanningError>;

    async fn create_pallet(&self, request: NewPallet) -> Result<CreatedPallet, PlanningError>;

    async fn edit_pallet(&self, request: PalletEdit) -> Result<PalletStats, PlanningError>;

    async fn delete_pallet(&self, pallet_id: PalletId) -> Result<(), PlanningError>;

    async fn close_pallet(
        &self,
        pallet_id: PalletId,
        notes: Option<String>,
    ) -> Result<(), PlanningError>;

    async fn transfer_units(&self, request: &TransferRequest) -> Result<(), PlanningError>;

    /// Create pallets for the unassigned pieces of a position.
    async fn plan_pallets(&self, request: PlanRequest) -> Result<Vec<PalletId>, PlanningError>;
}
