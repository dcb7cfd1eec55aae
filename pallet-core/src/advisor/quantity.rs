//! Quantity advisor: the largest quantity of one piece type that still fits.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capacity::{piece_count, stacked_height, stacked_weight, unit_weight};
use crate::config::{EPS, UNITS_PER_LEVEL};
use crate::model::{Assignment, PieceSpec};

/// Which bound decided the suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limiting {
    Availability,
    Weight,
    Height,
}

/// Per-constraint bounds behind a quantity suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityAdvice {
    pub available: u32,
    pub by_weight: u32,
    pub by_height: u32,
    pub max: u32,
    pub limiting: Limiting,
}

/// Pieces allowed by the remaining weight budget.
fn weight_bound(piece: &PieceSpec, existing: &[Assignment], max_weight: f64) -> u32 {
    let budget = max_weight - stacked_weight(existing);
    if budget <= 0.0 {
        return 0;
    }
    let per_piece = unit_weight(piece);
    if per_piece <= 0.0 {
        return u32::MAX;
    }
    to_count(((budget + EPS) / per_piece).floor())
}

/// Pieces allowed by the remaining height.
///
/// Assumes the new piece type can fill the partially used top level, which
/// over-estimates when thicknesses differ.
fn height_bound(piece: &PieceSpec, existing: &[Assignment], max_height: f64) -> u32 {
    if piece.thickness_mm <= 0.0 {
        return 0;
    }
    let remaining_levels = ((max_height - stacked_height(existing) + EPS) / piece.thickness_mm)
        .floor()
        .max(0.0);
    let partial = i64::from(piece_count(existing) % UNITS_PER_LEVEL);
    let slots = (remaining_levels as i64).saturating_mul(i64::from(UNITS_PER_LEVEL)) - partial;
    u32::try_from(slots.max(0)).unwrap_or(u32::MAX)
}

fn to_count(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}

/// Compute every bound for adding `piece` to a pallet holding `existing`.
pub fn advise(
    piece: &PieceSpec,
    existing: &[Assignment],
    available: u32,
    max_weight: f64,
    max_height: f64,
) -> QuantityAdvice {
    let by_weight = weight_bound(piece, existing, max_weight);
    let by_height = height_bound(piece, existing, max_height);

    let (max, limiting) = [
        (available, Limiting::Availability),
        (by_weight, Limiting::Weight),
        (by_height, Limiting::Height),
    ]
    .into_iter()
    .min_by_key(|(bound, _)| *bound)
    .unwrap_or((0, Limiting::Availability));

    debug!(
        piece = %piece.id,
        available,
        by_weight,
        by_height,
        max,
        "quantity advice"
    );

    QuantityAdvice {
        available,
        by_weight,
        by_height,
        max,
        limiting,
    }
}

/// Maximum quantity of `piece` addable without breaking any limit.
pub fn max_addable(
    piece: &PieceSpec,
    existing: &[Assignment],
    available: u32,
    max_weight: f64,
    max_height: f64,
) -> u32 {
    advise(piece, existing, available, max_weight, max_height).max
}
