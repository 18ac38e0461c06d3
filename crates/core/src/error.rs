//! Error types surfaced by squad operations and the persistence layer.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use crate::models::{Faction, SlotKind};

/// Kind of record an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RecordKind {
    Ship,
    Pilot,
    Upgrade,
    Squad,
    Member,
    EquippedUpgrade,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordKind::Ship => "ship",
            RecordKind::Pilot => "pilot",
            RecordKind::Upgrade => "upgrade",
            RecordKind::Squad => "squad",
            RecordKind::Member => "member",
            RecordKind::EquippedUpgrade => "equipped upgrade",
        };
        f.write_str(label)
    }
}

/// Recoverable failures of catalog lookups and squad mutations.
///
/// Every variant except [`SquadError::Persistence`] is a rejected user action:
/// the squad it was aimed at is left untouched.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SquadError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("{card} belongs to {found}, squad is {expected}")]
    FactionMismatch {
        card: String,
        expected: Faction,
        found: Faction,
    },
    #[error("{card} is not legal in hyperspace-only squads")]
    HyperspaceIllegal { card: String },
    #[error("no open {slot} slot")]
    SlotUnavailable { slot: SlotKind },
    #[error("no more copies of {card} allowed")]
    DuplicateRestricted { card: String },
    #[error("pilot '{pilot}' does not fly ship '{ship}'")]
    PilotShipMismatch { pilot: String, ship: String },
    #[error("{0}")]
    IllegalState(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl SquadError {
    pub(crate) fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        SquadError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Failures reading or writing the stored squad collection.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The storage location could not be read or written.
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        /// File involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Stored data exists but does not decode as a squad list.
    #[error("malformed squad data in {}: {source}", .path.display())]
    Malformed {
        /// File holding the malformed document.
        path: PathBuf,
        /// Decoder error.
        source: serde_json::Error,
    },
    /// The squad list could not be encoded.
    #[error("failed to encode squads: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Result alias used throughout the squad model.
pub type SquadResult<T> = Result<T, SquadError>;
