//! Wire messages exchanged between clients and a session host.

use serde::{Deserialize, Serialize};
use siege_core::{
    CellCoord, EnemyId, EnemySnapshot, Event, Intent, IntentRejection, MapDefinition, PlayerId,
    ProjectileId, ProjectileSnapshot, TowerId, TowerSnapshot, TowerTypeId, TrinketId,
    WaveProgress,
};
use siege_session::SessionSnapshot;
use thiserror::Error;

/// Messages sent by clients, as newline-delimited JSON tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Enters the named room, creating it when absent.
    Join {
        /// Room to join.
        room: String,
    },
    /// Places a tower.
    #[serde(rename_all = "camelCase")]
    Place {
        /// Client sequence number.
        seq: u64,
        /// Tower type to build.
        tower_type: TowerTypeId,
        /// Grid cell to build on.
        position: CellCoord,
    },
    /// Upgrades a tower by one level.
    #[serde(rename_all = "camelCase")]
    Upgrade {
        /// Client sequence number.
        seq: u64,
        /// Tower to upgrade.
        tower_id: TowerId,
    },
    /// Sockets a trinket into a tower.
    #[serde(rename_all = "camelCase")]
    SocketTrinket {
        /// Client sequence number.
        seq: u64,
        /// Receiving tower.
        tower_id: TowerId,
        /// Trinket to socket.
        trinket_id: TrinketId,
    },
    /// Ends the preparation countdown early.
    StartWave {
        /// Client sequence number.
        seq: u64,
    },
}

impl ClientMessage {
    /// Sequence number and intent carried by the message, if it is a game action.
    #[must_use]
    pub fn intent(&self) -> Option<(u64, Intent)> {
        match *self {
            Self::Join { .. } => None,
            Self::Place {
                seq,
                tower_type,
                position,
            } => Some((
                seq,
                Intent::PlaceTower {
                    kind: tower_type,
                    cell: position,
                },
            )),
            Self::Upgrade { seq, tower_id } => Some((seq, Intent::UpgradeTower { tower: tower_id })),
            Self::SocketTrinket {
                seq,
                tower_id,
                trinket_id,
            } => Some((
                seq,
                Intent::SocketTrinket {
                    tower: tower_id,
                    trinket: trinket_id,
                },
            )),
            Self::StartWave { seq } => Some((seq, Intent::StartNextWave)),
        }
    }
}

/// Identifier of any entity carried in a delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    /// A tower.
    Tower(TowerId),
    /// An enemy.
    Enemy(EnemyId),
    /// A projectile.
    Projectile(ProjectileId),
}

/// Current state of an entity that changed since the previous delta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityUpdate {
    /// Tower state.
    Tower(TowerSnapshot),
    /// Enemy state.
    Enemy(EnemySnapshot),
    /// Projectile state.
    Projectile(ProjectileSnapshot),
}

impl EntityUpdate {
    /// Identifier of the updated entity.
    #[must_use]
    pub fn entity(&self) -> EntityRef {
        match self {
            Self::Tower(tower) => EntityRef::Tower(tower.id),
            Self::Enemy(enemy) => EntityRef::Enemy(enemy.id),
            Self::Projectile(projectile) => EntityRef::Projectile(projectile.id),
        }
    }
}

/// Per-tick change set broadcast to every client of a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    /// Tick the delta describes.
    pub tick: u64,
    /// Entities removed since the previous delta.
    pub removed_ids: Vec<EntityRef>,
    /// Entities added or changed since the previous delta.
    pub updated_entities: Vec<EntityUpdate>,
    /// Currency after the tick.
    pub currency: u32,
    /// Lives after the tick.
    pub lives: u32,
    /// Wave timeline after the tick.
    pub wave_state: WaveProgress,
    /// Events emitted during the tick.
    pub events: Vec<Event>,
}

/// Messages sent by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms a join and names the player id assigned to the connection.
    Welcome {
        /// Room joined.
        room: String,
        /// Identifier of the joining player.
        player: PlayerId,
    },
    /// Full state, sent once on join.
    Snapshot {
        /// Map the room plays on.
        map: Box<MapDefinition>,
        /// Complete session state.
        state: Box<SessionSnapshot>,
    },
    /// Incremental update.
    Delta(Delta),
    /// Outcome of a submitted intent, addressed to its sender only.
    Reply {
        /// Whether the intent was applied.
        ok: bool,
        /// Client sequence number of the intent.
        seq: u64,
        /// Reason for a rejection.
        reason: Option<IntentRejection>,
    },
    /// Message the host could not act on.
    Error {
        /// Human readable description.
        message: String,
    },
}

impl ServerMessage {
    /// Acknowledges an applied intent.
    #[must_use]
    pub fn accepted(seq: u64) -> Self {
        Self::Reply {
            ok: true,
            seq,
            reason: None,
        }
    }

    /// Reports a rejected intent.
    #[must_use]
    pub fn rejected(seq: u64, reason: IntentRejection) -> Self {
        Self::Reply {
            ok: false,
            seq,
            reason: Some(reason),
        }
    }
}

/// Failures while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON payload was malformed.
    #[error("invalid json message: {0}")]
    Json(#[from] serde_json::Error),
    /// Binary payload was malformed.
    #[error("invalid binary message: {0}")]
    Bincode(#[from] bincode::Error),
    /// Payload does not fit a `u32` length prefix.
    #[error("frame of {length} bytes exceeds the length prefix")]
    Oversized {
        /// Payload size.
        length: usize,
    },
    /// Binary frame is shorter than its length prefix claims.
    #[error("truncated frame: expected {expected} bytes, found {found}")]
    Truncated {
        /// Bytes announced by the prefix.
        expected: usize,
        /// Bytes available.
        found: usize,
    },
}

/// Encoding used for server messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Codec {
    /// One JSON document per line.
    #[default]
    Json,
    /// Little-endian `u32` length prefix followed by a bincode payload.
    Bincode,
}

const LENGTH_PREFIX: usize = 4;

impl Codec {
    /// Encodes a server message into a self-delimiting frame.
    pub fn encode(self, message: &ServerMessage) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Json => {
                let mut frame = serde_json::to_vec(message)?;
                frame.push(b'\n');
                Ok(frame)
            }
            Self::Bincode => {
                let payload = bincode::serialize(message)?;
                let length = u32::try_from(payload.len()).map_err(|_| CodecError::Oversized {
                    length: payload.len(),
                })?;
                let mut frame = Vec::with_capacity(LENGTH_PREFIX + payload.len());
                frame.extend_from_slice(&length.to_le_bytes());
                frame.extend_from_slice(&payload);
                Ok(frame)
            }
        }
    }

    /// Decodes one frame produced by [`Codec::encode`].
    pub fn decode(self, frame: &[u8]) -> Result<ServerMessage, CodecError> {
        match self {
            Self::Json => Ok(serde_json::from_slice(trim_newline(frame))?),
            Self::Bincode => {
                let Some((prefix, payload)) = frame.split_first_chunk::<LENGTH_PREFIX>() else {
                    return Err(CodecError::Truncated {
                        expected: LENGTH_PREFIX,
                        found: frame.len(),
                    });
                };
                let expected = u32::from_le_bytes(*prefix) as usize;
                if payload.len() < expected {
                    return Err(CodecError::Truncated {
                        expected,
                        found: payload.len(),
                    });
                }
                Ok(bincode::deserialize(&payload[..expected])?)
            }
        }
    }
}

/// Parses one line of client JSON.
pub fn decode_client(line: &str) -> Result<ClientMessage, CodecError> {
    Ok(serde_json::from_str(line.trim())?)
}

fn trim_newline(frame: &[u8]) -> &[u8] {
    frame.strip_suffix(b"\n").unwrap_or(frame)
}
