//! Advisors: how much more fits on a pallet, and whether two pallets combine.

mod merge;
mod quantity;

pub use merge::can_merge;
pub use quantity::{advise, max_addable, Limiting, QuantityAdvice};
