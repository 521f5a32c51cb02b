//! Load-time and intent validation errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{EnemyTypeId, TowerId, TowerTypeId, TrinketId};

/// Failure raised while loading catalog or map data.
///
/// A session cannot start from data that fails to load; the error is
/// reported once and never retried.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document is not valid JSON for the expected schema.
    #[error("malformed definition: {0}")]
    Parse(#[source] serde_json::Error),
    /// A required table holds no entries.
    #[error("table `{0}` must not be empty")]
    Empty(&'static str),
    /// Two records in a table share an identifier.
    #[error("duplicate id {id} in table `{table}`")]
    DuplicateId {
        /// Table containing the duplicate.
        table: &'static str,
        /// Duplicated identifier.
        id: u32,
    },
    /// A numeric field holds a value outside its permitted range.
    #[error("invalid {field} for `{owner}`: {value}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Record holding the field.
        owner: String,
        /// Rejected value.
        value: f32,
    },
    /// The enemy path is degenerate or leaves the grid.
    #[error("enemy path is invalid: {0}")]
    InvalidPath(&'static str),
    /// A wave references an enemy type the catalog does not define.
    #[error("wave {wave} references unknown enemy type {enemy:?}")]
    UnknownEnemy {
        /// Zero-based wave position.
        wave: usize,
        /// Missing enemy type.
        enemy: EnemyTypeId,
    },
    /// A wave's spawn offsets are negative or decreasing.
    #[error("wave {wave} spawn offsets must be non-negative and ordered")]
    UnorderedWave {
        /// Zero-based wave position.
        wave: usize,
    },
    /// The map schedules no waves at all.
    #[error("map schedules no waves")]
    NoWaves,
}

/// Reason a player intent was rejected without mutating the session.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentRejection {
    /// The tower type is not in the catalog.
    #[error("unknown tower type {kind:?}")]
    UnknownTowerType {
        /// Requested tower type.
        kind: TowerTypeId,
    },
    /// No tower with this id exists.
    #[error("unknown tower {tower:?}")]
    UnknownTower {
        /// Requested tower.
        tower: TowerId,
    },
    /// The trinket is not in the catalog.
    #[error("unknown trinket {trinket:?}")]
    UnknownTrinket {
        /// Requested trinket.
        trinket: TrinketId,
    },
    /// The placement cell lies outside the grid.
    #[error("cell is outside the grid")]
    OutOfBounds,
    /// The placement cell is build-restricted or crossed by the path.
    #[error("cell is restricted")]
    Restricted,
    /// The placement cell already holds a tower.
    #[error("cell is occupied")]
    Occupied,
    /// The purchase would overdraw the player's currency.
    #[error("insufficient currency: {required} required, {available} available")]
    InsufficientCurrency {
        /// Cost of the purchase.
        required: u32,
        /// Currency held at validation time.
        available: u32,
    },
    /// The tower is already at its highest level.
    #[error("tower is at max level")]
    MaxLevel,
    /// Every trinket slot of the tower is filled.
    #[error("tower has no free trinket slot")]
    TrinketSlotsFull,
    /// The trinket requires an element the tower does not have.
    #[error("trinket is incompatible with the tower element")]
    TrinketIncompatible,
    /// No tower identifiers are left to assign.
    #[error("tower limit reached")]
    TowerLimit,
    /// A wave is already running or about to start.
    #[error("a wave is already active")]
    WaveAlreadyActive,
    /// The session has reached a terminal state.
    #[error("session has concluded")]
    SessionConcluded,
}
