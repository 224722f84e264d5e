//! Presence roster and channel status types.

use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// One connected identity on a session channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    /// The participant identity
    pub player: PlayerId,
    /// When this identity joined, unix millis
    pub online_at: u64,
}

impl PresenceEntry {
    /// Create a presence entry.
    pub fn new(player: PlayerId, online_at: u64) -> Self {
        Self { player, online_at }
    }
}

/// A snapshot of every identity currently on the channel.
///
/// Delivered on every presence sync/join/leave signal. A participant may
/// appear more than once (multiple tabs/devices); any entry counts as
/// online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Roster {
    /// The connected identities
    pub entries: Vec<PresenceEntry>,
}

impl Roster {
    /// An empty roster.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a roster from entries.
    pub fn new(entries: Vec<PresenceEntry>) -> Self {
        Self { entries }
    }

    /// All entries for a given participant.
    pub fn entries_for<'a>(
        &'a self,
        player: &'a PlayerId,
    ) -> impl Iterator<Item = &'a PresenceEntry> {
        self.entries.iter().filter(move |e| &e.player == player)
    }

    /// Whether the roster contains any entry for the participant.
    pub fn contains(&self, player: &PlayerId) -> bool {
        self.entries.iter().any(|e| &e.player == player)
    }
}

/// Transport status signals for a channel subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    /// Subscription confirmed
    Subscribed,
    /// Channel-level error; the error text travels alongside
    ChannelError,
    /// Subscription attempt timed out
    TimedOut,
    /// Channel closed cleanly (not an error)
    Closed,
}
