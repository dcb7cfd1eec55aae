//! Error types for pallet planning.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{PalletId, PieceId};

/// Broad category of a failure, used to pick how it is surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any network call, shown inline.
    Validation,
    /// Weight or height limit exceeded.
    Constraint,
    /// Planning service unreachable, worth retrying.
    Network,
    /// Planning service answered with a failure.
    Service,
    /// Local IO or decoding problem.
    Io,
}

/// Main error type for pallet operations.
#[derive(Debug, Error)]
pub enum PalletError {
    #[error("Quantity must be greater than zero for piece {piece_id}")]
    InvalidQuantity { piece_id: PieceId },

    #[error("Piece {piece_id} appears more than once in one submission")]
    DuplicatePiece { piece_id: PieceId },

    #[error("Pallet destination is missing")]
    MissingDestination,

    #[error("Unknown destination '{value}'")]
    UnknownDestination { value: String },

    #[error("Pallet {pallet_id} is closed")]
    PalletClosed { pallet_id: PalletId },

    #[error("Pallet {pallet_id} not found")]
    PalletNotFound { pallet_id: PalletId },

    #[error("Piece {piece_id} not found")]
    PieceNotFound { piece_id: PieceId },

    #[error("Piece {piece_id}: requested {requested}, only {available} available")]
    Overcommitted {
        piece_id: PieceId,
        requested: u32,
        available: u32,
    },

    #[error("Already on this pallet ({pallet_id})")]
    SamePallet { pallet_id: PalletId },

    #[error("Piece {piece_id}: {field} must be positive, got {value}")]
    InvalidGeometry {
        piece_id: PieceId,
        field: &'static str,
        value: f64,
    },

    #[error("Nothing to move: piece {piece_id} has no quantity at the source")]
    NothingToMove { piece_id: PieceId },

    #[error("A drag gesture is already in progress")]
    GestureInProgress,

    #[error("{reason}")]
    LimitExceeded { reason: String },

    #[error("Connection to planning service failed: {message}. Try again.")]
    Connection { message: String },

    #[error("{reason}")]
    Service { reason: String },

    #[error("Invalid configuration value for '{field}': {value}")]
    InvalidConfig { field: String, value: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PalletError {
    /// Get the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PalletError::InvalidQuantity { .. }
            | PalletError::DuplicatePiece { .. }
            | PalletError::MissingDestination
            | PalletError::UnknownDestination { .. }
            | PalletError::PalletClosed { .. }
            | PalletError::PalletNotFound { .. }
            | PalletError::PieceNotFound { .. }
            | PalletError::Overcommitted { .. }
            | PalletError::SamePallet { .. }
            | PalletError::InvalidGeometry { .. }
            | PalletError::NothingToMove { .. }
            | PalletError::GestureInProgress
            | PalletError::InvalidConfig { .. } => ErrorKind::Validation,
            PalletError::LimitExceeded { .. } => ErrorKind::Constraint,
            PalletError::Connection { .. } => ErrorKind::Network,
            PalletError::Service { .. } => ErrorKind::Service,
            PalletError::FileNotFound { .. } | PalletError::Io(_) | PalletError::Json(_) => {
                ErrorKind::Io
            }
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }

    /// Whether the error was produced without contacting the planning service.
    pub fn is_local(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::Constraint)
    }
}

/// Result type alias for pallet operations.
pub type Result<T> = std::result::Result<T, PalletError>;
