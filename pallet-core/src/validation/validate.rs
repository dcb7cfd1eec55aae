//! Submission validation and pallet review.

use std::collections::HashSet;

use crate::config::float_cmp;
use crate::error::{PalletError, Result};
use crate::model::{Assignment, Destination, Pallet, PieceType};

/// Review result with warnings.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Whether validation passed.
    pub passed: bool,
    /// Warning messages.
    pub warnings: Vec<String>,
    /// Error messages.
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Create a passing result.
    pub fn ok() -> Self {
        Self {
            passed: true,
            ..Default::default()
        }
    }

    /// Add a warning.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Add an error.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.passed = false;
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
        if !other.passed {
            self.passed = false;
        }
    }
}

/// Validate a create/edit submission before it is sent anywhere.
///
/// Rejects a missing destination, zero quantities and duplicate piece types.
pub fn validate_submission(destination: Option<Destination>, items: &[Assignment]) -> Result<()> {
    if destination.is_none() {
        return Err(PalletError::MissingDestination);
    }
    validate_items(items)
}

/// Validate submitted items: positive quantities, one entry per piece type.
pub fn validate_items(items: &[Assignment]) -> Result<()> {
    let mut seen = HashSet::new();
    for item in items {
        if item.quantity == 0 {
            return Err(PalletError::InvalidQuantity {
                piece_id: item.piece_id(),
            });
        }
        if !seen.insert(item.piece_id()) {
            return Err(PalletError::DuplicatePiece {
                piece_id: item.piece_id(),
            });
        }
    }
    Ok(())
}

/// Check that every item fits within the available stock of its piece type.
///
/// `already_on_pallet` returns the quantity the target pallet holds now, which
/// is given back when a pallet's contents are replaced by an edit.
pub fn validate_against_stock(
    items: &[Assignment],
    pieces: &[PieceType],
    already_on_pallet: impl Fn(&Assignment) -> u32,
) -> Result<()> {
    for item in items {
        let piece = pieces
            .iter()
            .find(|p| p.id() == item.piece_id())
            .ok_or(PalletError::PieceNotFound {
                piece_id: item.piece_id(),
            })?;
        let available = piece.available() + already_on_pallet(item);
        if item.quantity > available {
            return Err(PalletError::Overcommitted {
                piece_id: item.piece_id(),
                requested: item.quantity,
                available,
            });
        }
    }
    Ok(())
}

/// Review one pallet's contents against its limits and grouping rules.
pub fn review_pallet(pallet: &Pallet) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let report = pallet.limit_report();

    if report.over_weight {
        result.add_error(format!(
            "Pallet {}: weight {:.1} kg exceeds {:.1} kg",
            pallet.number,
            pallet.total_weight(),
            pallet.max_weight_kg
        ));
    } else if report.warn_weight {
        result.add_warning(format!(
            "Pallet {}: weight at {:.0}% of limit",
            pallet.number, report.weight_percent
        ));
    }

    if report.over_height {
        result.add_error(format!(
            "Pallet {}: height {:.0} mm exceeds {:.0} mm",
            pallet.number,
            pallet.stack_height(),
            pallet.max_height_mm
        ));
    } else if report.warn_height {
        result.add_warning(format!(
            "Pallet {}: height at {:.0}% of limit",
            pallet.number, report.height_percent
        ));
    }

    if !pallet.is_color_homogeneous() {
        let colors: Vec<&str> = pallet.colors().into_iter().collect();
        result.add_warning(format!(
            "Pallet {}: mixed colors ({})",
            pallet.number,
            colors.join(", ")
        ));
    }

    // Height assumes one thickness per pallet.
    if let Some(first) = pallet.assignments.first() {
        let mixed = pallet
            .assignments
            .iter()
            .any(|a| !float_cmp::approx_eq(a.piece.thickness_mm, first.piece.thickness_mm));
        if mixed {
            result.add_warning(format!(
                "Pallet {}: mixed thicknesses, height is an estimate",
                pallet.number
            ));
        }
    }

    if pallet.is_empty() {
        result.add_warning(format!("Pallet {}: empty", pallet.number));
    }

    result
}

/// Review all pallets and the piece counters of an order.
pub fn review_order(pallets: &[Pallet], pieces: &[PieceType]) -> ValidationResult {
    let mut result = ValidationResult::ok();

    for pallet in pallets {
        result.merge(review_pallet(pallet));
    }

    for piece in pieces {
        if !piece.is_consistent() {
            result.add_error(format!(
                "Piece {}: assigned {} exceeds planned {}",
                piece.id(),
                piece.assigned,
                piece.planned
            ));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PieceId, PieceSpec};

    fn item(id: u64, quantity: u32) -> Assignment {
        Assignment::new(PieceSpec::new(id, 400.0, 300.0), quantity)
    }

    // ==================== ValidationResult tests ====================

    #[test]
    fn test_validation_result_merge() {
        let mut result1 = ValidationResult::ok();
        result1.add_warning("Warning 1");

        let mut result2 = ValidationResult::ok();
        result2.add_error("Error 1");

        result1.merge(result2);
        assert!(!result1.passed);
        assert_eq!(result1.warnings.len(), 1);
        assert_eq!(result1.errors.len(), 1);
    }

    // ==================== validate_submission tests ====================

    #[test]
    fn test_submission_missing_destination() {
        let result = validate_submission(None, &[item(1, 1)]);
        assert!(matches!(result, Err(PalletError::MissingDestination)));
    }

    #[test]
    fn test_submission_zero_quantity() {
        let result = validate_submission(Some(Destination::Warehouse), &[item(1, 0)]);
        assert!(matches!(
            result,
            Err(PalletError::InvalidQuantity { piece_id: PieceId(1) })
        ));
    }

    #[test]
    fn test_submission_duplicate_piece() {
        let result = validate_submission(Some(Destination::Warehouse), &[item(1, 2), item(1, 3)]);
        assert!(matches!(
            result,
            Err(PalletError::DuplicatePiece { piece_id: PieceId(1) })
        ));
    }

    #[test]
    fn test_submission_ok() {
        assert!(validate_submission(Some(Destination::Cutting), &[item(1, 2), item(2, 3)]).is_ok());
    }

    // ==================== validate_against_stock tests ====================

    #[test]
    fn test_stock_overcommitted() {
        let mut piece = PieceType::new(PieceSpec::new(1, 400.0, 300.0), 10);
        piece.assigned = 8;
        let result = validate_against_stock(&[item(1, 3)], &[piece], |_| 0);
        assert!(matches!(
            result,
            Err(PalletError::Overcommitted {
                requested: 3,
                available: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_stock_counts_quantity_already_on_pallet() {
        let mut piece = PieceType::new(PieceSpec::new(1, 400.0, 300.0), 10);
        piece.assigned = 8;
        assert!(validate_against_stock(&[item(1, 5)], &[piece], |_| 4).is_ok());
    }

    #[test]
    fn test_stock_unknown_piece() {
        let result = validate_against_stock(&[item(9, 1)], &[], |_| 0);
        assert!(matches!(result, Err(PalletError::PieceNotFound { .. })));
    }

    // ==================== review tests ====================

    #[test]
    fn test_review_mixed_colors_and_thickness() {
        let mut pallet = Pallet::new(1, 3, Destination::Drilling);
        pallet
            .add(Assignment::new(PieceSpec::new(1, 400.0, 300.0).with_color("white"), 5))
            .unwrap();
        pallet
            .add(Assignment::new(
                PieceSpec::new(2, 400.0, 300.0)
                    .with_color("oak")
                    .with_thickness(25.0),
                5,
            ))
            .unwrap();

        let result = review_pallet(&pallet);
        assert!(result.passed);
        assert!(result.warnings.iter().any(|w| w.contains("mixed colors")));
        assert!(result.warnings.iter().any(|w| w.contains("mixed thicknesses")));
    }

    #[test]
    fn test_review_over_limit_is_error() {
        let mut pallet = Pallet::new(1, 1, Destination::Drilling);
        pallet.assignments.push(Assignment::new(
            PieceSpec::new(1, 400.0, 300.0).with_unit_weight(100.0),
            8,
        ));
        let result = review_pallet(&pallet);
        assert!(!result.passed);
        assert!(result.errors[0].contains("exceeds"));
    }

    #[test]
    fn test_review_order_inconsistent_piece() {
        let mut piece = PieceType::new(PieceSpec::new(1, 400.0, 300.0), 5);
        piece.assigned = 6;
        let result = review_order(&[], &[piece]);
        assert!(!result.passed);
    }
}
