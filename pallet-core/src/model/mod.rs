//! Data model types for pallet planning.

mod ids;
mod pallet;
mod piece;

pub use ids::{OrderId, PalletId, PieceId, PositionId};
pub use pallet::{Assignment, Destination, Pallet, PalletStatus};
pub use piece::{PieceSpec, PieceType};
