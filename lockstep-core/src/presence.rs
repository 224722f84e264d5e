//! Opponent liveness derived from presence roster snapshots.

use lockstep_types::{PlayerId, Roster};

/// Opponent online/last-seen status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpponentStatus {
    /// Whether the roster currently holds any entry for the opponent.
    pub online: bool,
    /// Newest join timestamp observed for the opponent, unix millis.
    /// Monotonic: never regresses to None once set, never moves backward.
    pub last_seen_ms: Option<u64>,
}

/// Derive the opponent status from a roster snapshot.
///
/// Pure: the previous status is an explicit input so the monotonic
/// last-seen guarantee holds across offline snapshots.
pub fn opponent_status(
    prev: &OpponentStatus,
    roster: &Roster,
    opponent_id: &PlayerId,
) -> OpponentStatus {
    let newest = roster
        .entries_for(opponent_id)
        .map(|entry| entry.online_at)
        .max();

    match newest {
        Some(seen) => OpponentStatus {
            online: true,
            last_seen_ms: Some(prev.last_seen_ms.map_or(seen, |prior| prior.max(seen))),
        },
        None => OpponentStatus {
            online: false,
            last_seen_ms: prev.last_seen_ms,
        },
    }
}

/// Tracks the opponent's presence across roster snapshots.
///
/// Invoked on every presence sync/join/leave signal, and once eagerly
/// after a successful connect (the opponent may have joined first).
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    self_id: PlayerId,
    opponent_id: PlayerId,
    status: OpponentStatus,
}

impl PresenceTracker {
    /// Create a tracker for the given pairing.
    pub fn new(self_id: PlayerId, opponent_id: PlayerId) -> Self {
        Self {
            self_id,
            opponent_id,
            status: OpponentStatus::default(),
        }
    }

    /// Apply a roster snapshot. Returns the new status when it changed.
    pub fn observe(&mut self, roster: &Roster) -> Option<OpponentStatus> {
        let next = opponent_status(&self.status, roster, &self.opponent_id);
        if next == self.status {
            None
        } else {
            self.status = next.clone();
            Some(next)
        }
    }

    /// The opponent status as of the last observation.
    pub fn status(&self) -> &OpponentStatus {
        &self.status
    }

    /// The local participant identity.
    pub fn self_id(&self) -> &PlayerId {
        &self.self_id
    }

    /// The opponent identity this tracker watches.
    pub fn opponent_id(&self) -> &PlayerId {
        &self.opponent_id
    }
}
