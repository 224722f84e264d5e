//! Broadcast events for the lockstep session channel.
//!
//! These are the payloads exchanged between the two clients of a game.
//! `TurnResolved`, `GameEnded`, and `StateUpdate` always carry a full
//! [`BoardSnapshot`], never a diff, so a receiver with no prior context
//! (or one that missed intermediate messages) converges on receipt.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, Round, WireError};

/// An opaque full-board snapshot.
///
/// The sync engine delivers board state, it never interprets it. The
/// bytes are whatever encoding the game layer chose.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BoardSnapshot(Vec<u8>);

impl BoardSnapshot {
    /// Wrap raw board bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw board bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the encoded board in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for BoardSnapshot {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for BoardSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoardSnapshot([{} bytes])", self.0.len())
    }
}

/// All broadcast events on a session channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// Full board snapshot push
    StateUpdate(StateUpdate),
    /// An in-game action outside the turn cycle
    PlayerAction(PlayerAction),
    /// One player's move for a round
    TurnSubmitted(TurnSubmitted),
    /// Authoritative result of a completed round
    TurnResolved(TurnResolved),
    /// Terminal game result
    GameEnded(GameEnded),
}

impl GameEvent {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        rmp_serde::to_vec(self).map_err(WireError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        rmp_serde::from_slice(bytes).map_err(WireError::Deserialization)
    }
}

/// Full board snapshot push (e.g. seeding a late joiner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// The round the board is at
    pub round: Round,
    /// Full board snapshot
    pub board: BoardSnapshot,
    /// Whose turn marker is active
    pub active_player: PlayerId,
}

/// An in-game action that is not part of the turn cycle (emotes,
/// cursor movement, forfeit offers). Opaque to the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAction {
    /// Who performed the action
    pub player: PlayerId,
    /// Opaque action payload
    pub action: Vec<u8>,
}

/// One player's move for a round.
///
/// The broadcast copy is the source of truth for submission state on
/// both clients, including the sender's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSubmitted {
    /// Who submitted
    pub player: PlayerId,
    /// The round this move belongs to
    pub round: Round,
    /// Opaque turn payload
    pub turn: Vec<u8>,
}

/// Authoritative result of a completed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResolved {
    /// The round that was resolved
    pub round: Round,
    /// Full board snapshot after resolution
    pub board: BoardSnapshot,
    /// Whose turn marker is active for the next round
    pub active_player: PlayerId,
}

/// Terminal game result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEnded {
    /// The winner, or None for a draw
    pub winner: Option<PlayerId>,
    /// Final board snapshot
    pub board: BoardSnapshot,
}
