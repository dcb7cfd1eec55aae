//! Capacity model: piece geometry to weight, piece count to stack height.
//!
//! Pieces are laid side by side, [`UNITS_PER_LEVEL`] per level, so the
//! height only grows when a level fills up. Every item on one pallet is
//! assumed to share the thickness of the first item.

use crate::config::{DENSITY_PARTICLEBOARD, UNITS_PER_LEVEL};
use crate::model::{Assignment, PieceSpec};

/// Weight of one piece in kg.
///
/// Uses the explicit weight when known, otherwise volume times particleboard
/// density. Callers must pass positive dimensions.
pub fn unit_weight(piece: &PieceSpec) -> f64 {
    if let Some(kg) = piece.unit_weight_kg {
        return kg;
    }
    let thickness_m = piece.thickness_mm / 1000.0;
    let volume_m3 = piece.area_m2() * thickness_m;
    volume_m3 * DENSITY_PARTICLEBOARD
}

/// Total weight of a list of items in kg.
pub fn stacked_weight(items: &[Assignment]) -> f64 {
    items
        .iter()
        .map(|item| unit_weight(&item.piece) * f64::from(item.quantity))
        .sum()
}

/// Total piece count of a list of items.
pub fn piece_count(items: &[Assignment]) -> u32 {
    items.iter().map(|item| item.quantity).sum()
}

/// Stack height of a list of items in mm.
pub fn stacked_height(items: &[Assignment]) -> f64 {
    let Some(first) = items.first() else {
        return 0.0;
    };
    f64::from(levels_for(piece_count(items))) * first.piece.thickness_mm
}

/// Number of stack levels needed for `piece_count` pieces.
pub fn levels_for(piece_count: u32) -> u32 {
    piece_count.div_ceil(UNITS_PER_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::float_cmp::approx_eq;

    fn board(id: u64, quantity: u32) -> Assignment {
        Assignment::new(PieceSpec::new(id, 400.0, 300.0), quantity)
    }

    #[test]
    fn test_unit_weight_from_geometry() {
        let piece = PieceSpec::new(1, 400.0, 300.0);
        assert!(approx_eq(unit_weight(&piece), 1.404));
    }

    #[test]
    fn test_unit_weight_explicit() {
        let piece = PieceSpec::new(1, 400.0, 300.0).with_unit_weight(2.5);
        assert_eq!(unit_weight(&piece), 2.5);
    }

    #[test]
    fn test_stacked_weight() {
        let items = vec![
            board(1, 10),
            Assignment::new(PieceSpec::new(2, 100.0, 100.0).with_unit_weight(1.0), 3),
        ];
        assert!(approx_eq(stacked_weight(&items), 14.04 + 3.0));
    }

    #[test]
    fn test_stacked_weight_monotonic() {
        let mut items = vec![board(1, 0), board(2, 5)];
        let mut last = stacked_weight(&items);
        for _ in 0..20 {
            items[0].quantity += 1;
            let next = stacked_weight(&items);
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn test_levels_for() {
        assert_eq!(levels_for(0), 0);
        assert_eq!(levels_for(1), 1);
        assert_eq!(levels_for(49), 1);
        assert_eq!(levels_for(50), 1);
        assert_eq!(levels_for(51), 2);
        assert_eq!(levels_for(120), 3);
    }

    #[test]
    fn test_stacked_height_steps_per_level() {
        assert_eq!(stacked_height(&[board(1, 1)]), 18.0);
        assert_eq!(stacked_height(&[board(1, 49)]), 18.0);
        assert_eq!(stacked_height(&[board(1, 50)]), 18.0);
        assert_eq!(stacked_height(&[board(1, 51)]), 36.0);
    }

    #[test]
    fn test_stacked_height_120_pieces() {
        assert_eq!(stacked_height(&[board(1, 120)]), 54.0);
    }

    #[test]
    fn test_stacked_height_empty() {
        assert_eq!(stacked_height(&[]), 0.0);
    }

    #[test]
    fn test_stacked_height_uses_first_thickness() {
        // Mixed thickness is not modelled: the first item decides.
        let items = vec![
            Assignment::new(PieceSpec::new(1, 400.0, 300.0).with_thickness(10.0), 30),
            Assignment::new(PieceSpec::new(2, 400.0, 300.0).with_thickness(25.0), 30),
        ];
        assert_eq!(stacked_height(&items), 20.0);
    }
}
