//! Identity and ordering types for lockstep.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for one game instance.
///
/// UUID v4 format (16 bytes). One realtime session is scoped to one GameId.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(uuid::Uuid);

impl GameId {
    /// Create a new random GameId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Create a GameId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        uuid::Uuid::from_slice(bytes).ok().map(Self)
    }

    /// Get the raw bytes of this GameId.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameId({})", self.0)
    }
}

/// A participant identity on a session channel.
///
/// Presence rosters key on these, so the representation is the opaque
/// string identity handed out by the auth layer, not something we mint.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a PlayerId from an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

/// A monotonically increasing round number.
///
/// One round is one exchange of moves from both players followed by a
/// resolution. Rounds order submissions more reliably than timestamps
/// because client clocks drift.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Round(u32);

impl Round {
    /// Create a new Round with the given value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the numeric value of this Round.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The first round of a game.
    pub fn first() -> Self {
        Self(0)
    }

    /// The round after this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_id_is_uuid_v4() {
        let id = GameId::new();
        assert_eq!(id.as_bytes().len(), 16);
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn game_id_roundtrip() {
        let original = GameId::new();
        let bytes = original.as_bytes();
        let restored = GameId::from_bytes(bytes).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn game_id_from_invalid_length_fails() {
        assert!(GameId::from_bytes(&[0u8; 5]).is_none());
        assert!(GameId::from_bytes(&[0u8; 32]).is_none());
    }

    #[test]
    fn player_id_preserves_identity_string() {
        let id = PlayerId::new("auth0|12345");
        assert_eq!(id.as_str(), "auth0|12345");
        assert_eq!(id.to_string(), "auth0|12345");
    }

    #[test]
    fn player_id_equality() {
        assert_eq!(PlayerId::from("p1"), PlayerId::new("p1"));
        assert_ne!(PlayerId::from("p1"), PlayerId::from("p2"));
    }

    #[test]
    fn round_ordering() {
        let r1 = Round::new(4);
        let r2 = Round::new(5);
        assert!(r1 < r2);
        assert!(r2 > r1);
    }

    #[test]
    fn round_next() {
        let r = Round::new(7);
        assert_eq!(r.next().value(), 8);
    }

    #[test]
    fn round_first() {
        assert_eq!(Round::first().value(), 0);
    }

    #[test]
    fn round_saturating_add() {
        let r = Round::new(u32::MAX);
        assert_eq!(r.next().value(), u32::MAX); // Saturates, doesn't wrap
    }
}
