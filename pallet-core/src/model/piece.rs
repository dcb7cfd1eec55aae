//! Piece type (formatka) definitions: geometry and production counters.

use serde::{Deserialize, Serialize};

use super::{PieceId, PositionId};
use crate::config::DEFAULT_THICKNESS_MM;

fn default_thickness() -> f64 {
    DEFAULT_THICKNESS_MM
}

/// Geometry and material of one cut-panel shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceSpec {
    /// Piece type identifier.
    pub id: PieceId,
    /// Length in mm.
    pub length_mm: f64,
    /// Width in mm.
    pub width_mm: f64,
    /// Thickness in mm.
    #[serde(default = "default_thickness")]
    pub thickness_mm: f64,
    /// Material color or label.
    #[serde(default)]
    pub color: String,
    /// Known weight of one piece, overriding the density estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_weight_kg: Option<f64>,
}

impl PieceSpec {
    /// Create a new piece spec with default thickness and no color.
    pub fn new(id: impl Into<PieceId>, length_mm: f64, width_mm: f64) -> Self {
        Self {
            id: id.into(),
            length_mm,
            width_mm,
            thickness_mm: DEFAULT_THICKNESS_MM,
            color: String::new(),
            unit_weight_kg: None,
        }
    }

    /// Set thickness.
    pub fn with_thickness(mut self, thickness_mm: f64) -> Self {
        self.thickness_mm = thickness_mm;
        self
    }

    /// Set material color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Set an explicit per-unit weight.
    pub fn with_unit_weight(mut self, kg: f64) -> Self {
        self.unit_weight_kg = Some(kg);
        self
    }

    /// Face area in square meters.
    pub fn area_m2(&self) -> f64 {
        self.length_mm * self.width_mm / 1_000_000.0
    }

    /// First dimension that is not strictly positive, with its value.
    pub fn invalid_dimension(&self) -> Option<(&'static str, f64)> {
        [
            ("length_mm", self.length_mm),
            ("width_mm", self.width_mm),
            ("thickness_mm", self.thickness_mm),
        ]
        .into_iter()
        .find(|(_, value)| value.is_nan() || *value <= 0.0)
    }

    /// Check that all dimensions are strictly positive.
    pub fn has_valid_geometry(&self) -> bool {
        self.invalid_dimension().is_none()
    }
}

/// A piece type within one order position, with its production counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceType {
    #[serde(flatten)]
    pub spec: PieceSpec,
    /// Order position the piece type belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionId>,
    /// Planned quantity.
    pub planned: u32,
    /// Quantity already produced.
    #[serde(default)]
    pub produced: u32,
    /// Quantity assigned to any pallet, as reported by the planning service.
    #[serde(default)]
    pub assigned: u32,
}

impl PieceType {
    /// Create a piece type with nothing produced or assigned yet.
    pub fn new(spec: PieceSpec, planned: u32) -> Self {
        Self {
            spec,
            position: None,
            planned,
            produced: 0,
            assigned: 0,
        }
    }

    /// Set the owning order position.
    pub fn with_position(mut self, position: impl Into<PositionId>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Piece type identifier.
    pub fn id(&self) -> PieceId {
        self.spec.id
    }

    /// Quantity not yet on any pallet.
    pub fn available(&self) -> u32 {
        self.planned.saturating_sub(self.assigned)
    }

    /// Check `assigned <= planned`.
    pub fn is_consistent(&self) -> bool {
        self.assigned <= self.planned
    }

    /// Whether every planned piece is on a pallet.
    pub fn is_fully_assigned(&self) -> bool {
        self.available() == 0
    }
}
