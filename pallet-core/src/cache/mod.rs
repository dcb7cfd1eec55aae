//! Pallet cache and reconciliation against the planning service.

mod reconciler;
mod schedule;
mod stats;

pub use reconciler::{CacheEntry, PalletCache, SyncState};
pub use schedule::RefreshSchedule;
pub use stats::CacheStats;
