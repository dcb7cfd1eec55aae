//! Pallet - a transport unit holding piece-type assignments.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{PalletId, PieceId, PieceSpec};
use crate::capacity;
use crate::config::{DEFAULT_MAX_HEIGHT_MM, DEFAULT_MAX_WEIGHT_KG};
use crate::error::{PalletError, Result};
use crate::validation::{can_add, evaluate, LimitReport};

/// Next production stage a pallet is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Destination {
    Warehouse,
    Edgebanding,
    Drilling,
    Cutting,
    Shipping,
}

impl Destination {
    /// All destinations in display order.
    pub const ALL: [Destination; 5] = [
        Destination::Warehouse,
        Destination::Edgebanding,
        Destination::Drilling,
        Destination::Cutting,
        Destination::Shipping,
    ];

    /// Wire name of the destination.
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Warehouse => "WAREHOUSE",
            Destination::Edgebanding => "EDGEBANDING",
            Destination::Drilling => "DRILLING",
            Destination::Cutting => "CUTTING",
            Destination::Shipping => "SHIPPING",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = PalletError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        Destination::ALL
            .into_iter()
            .find(|d| d.as_str() == upper)
            .ok_or_else(|| PalletError::UnknownDestination {
                value: s.to_string(),
            })
    }
}

/// Pallet lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PalletStatus {
    #[default]
    Open,
    Closed,
}

/// A quantity of one piece type, either placed on a pallet or proposed for one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub piece: PieceSpec,
    pub quantity: u32,
}

impl Assignment {
    pub fn new(piece: PieceSpec, quantity: u32) -> Self {
        Self { piece, quantity }
    }

    pub fn piece_id(&self) -> PieceId {
        self.piece.id
    }
}

fn default_max_weight() -> f64 {
    DEFAULT_MAX_WEIGHT_KG
}

fn default_max_height() -> f64 {
    DEFAULT_MAX_HEIGHT_MM
}

/// A transport pallet and its assignments.
///
/// Weight, height, piece count and colors are always derived from
/// `assignments`; nothing aggregate is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pallet {
    /// Pallet identifier.
    pub id: PalletId,
    /// Display number within the order.
    #[serde(default)]
    pub number: u32,
    /// Destination stage.
    pub destination: Destination,
    /// Lifecycle status.
    #[serde(default)]
    pub status: PalletStatus,
    /// Weight limit in kg.
    #[serde(default = "default_max_weight")]
    pub max_weight_kg: f64,
    /// Stack height limit in mm.
    #[serde(default = "default_max_height")]
    pub max_height_mm: f64,
    /// Free-form operator notes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    /// Piece-type assignments, at most one per piece type.
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl Pallet {
    /// Create an empty open pallet with default limits.
    pub fn new(id: impl Into<PalletId>, number: u32, destination: Destination) -> Self {
        Self {
            id: id.into(),
            number,
            destination,
            status: PalletStatus::Open,
            max_weight_kg: DEFAULT_MAX_WEIGHT_KG,
            max_height_mm: DEFAULT_MAX_HEIGHT_MM,
            notes: String::new(),
            assignments: Vec::new(),
        }
    }

    /// Set weight and height limits.
    pub fn with_limits(mut self, max_weight_kg: f64, max_height_mm: f64) -> Self {
        self.max_weight_kg = max_weight_kg;
        self.max_height_mm = max_height_mm;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.status == PalletStatus::Closed
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Total number of pieces on the pallet.
    pub fn total_pieces(&self) -> u32 {
        self.assignments.iter().map(|a| a.quantity).sum()
    }

    /// Total estimated weight in kg.
    pub fn total_weight(&self) -> f64 {
        capacity::stacked_weight(&self.assignments)
    }

    /// Estimated stack height in mm.
    pub fn stack_height(&self) -> f64 {
        capacity::stacked_height(&self.assignments)
    }

    /// Distinct material colors present.
    pub fn colors(&self) -> BTreeSet<&str> {
        self.assignments
            .iter()
            .map(|a| a.piece.color.as_str())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Whether all pieces share one color.
    pub fn is_color_homogeneous(&self) -> bool {
        self.colors().len() <= 1
    }

    /// Utilization against this pallet's limits.
    pub fn limit_report(&self) -> LimitReport {
        evaluate(
            self.total_weight(),
            self.stack_height(),
            self.max_weight_kg,
            self.max_height_mm,
        )
    }

    /// Assignment for one piece type.
    pub fn assignment(&self, piece_id: PieceId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.piece_id() == piece_id)
    }

    /// Quantity of one piece type on this pallet (0 if absent).
    pub fn quantity_of(&self, piece_id: PieceId) -> u32 {
        self.assignment(piece_id).map_or(0, |a| a.quantity)
    }

    /// Add pieces, merging into an existing assignment of the same type.
    ///
    /// Fails on a closed pallet, a zero quantity, or when the addition would
    /// exceed the weight or height limit.
    pub fn add(&mut self, addition: Assignment) -> Result<()> {
        self.ensure_open()?;
        if addition.quantity == 0 {
            return Err(PalletError::InvalidQuantity {
                piece_id: addition.piece_id(),
            });
        }

        let verdict = can_add(
            &self.assignments,
            std::slice::from_ref(&addition),
            self.max_weight_kg,
            self.max_height_mm,
        );
        if let Some(reason) = verdict.reason {
            return Err(PalletError::LimitExceeded { reason });
        }

        match self
            .assignments
            .iter_mut()
            .find(|a| a.piece_id() == addition.piece_id())
        {
            Some(existing) => existing.quantity += addition.quantity,
            None => self.assignments.push(addition),
        }
        Ok(())
    }

    /// Remove up to `quantity` pieces of one type. Returns how many were removed.
    ///
    /// An assignment that drops to zero is deleted.
    pub fn remove(&mut self, piece_id: PieceId, quantity: u32) -> Result<u32> {
        self.ensure_open()?;
        let idx = self
            .assignments
            .iter()
            .position(|a| a.piece_id() == piece_id)
            .ok_or(PalletError::PieceNotFound { piece_id })?;

        let assignment = &mut self.assignments[idx];
        let removed = quantity.min(assignment.quantity);
        assignment.quantity -= removed;
        if assignment.quantity == 0 {
            self.assignments.remove(idx);
        }
        Ok(removed)
    }

    /// Mark the pallet closed. Its assignments become immutable.
    pub fn close(&mut self) {
        self.status = PalletStatus::Closed;
    }

    /// Fail if the pallet is closed.
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(PalletError::PalletClosed { pallet_id: self.id });
        }
        Ok(())
    }
}
