//! Limit checks and submission validation.

mod limits;
mod validate;

pub use limits::{can_add, evaluate, LimitReport, Verdict};
pub use validate::{
    review_order, review_pallet, validate_against_stock, validate_items, validate_submission,
    ValidationResult,
};
