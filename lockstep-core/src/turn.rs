//! Turn submission reconciliation.
//!
//! Two clients broadcast `TurnSubmitted` events independently; this module
//! reconciles them into exactly one resolution per round, tolerant of
//! duplicated and out-of-round arrivals. It is pure bookkeeping: the
//! caller performs the resolution itself (via the game state store) when
//! [`SubmitOutcome::Complete`] comes back and this client is the resolver.
//!
//! Resolution is single-writer: only the client whose local player is
//! player1 triggers it (see [`TurnTracker::resolves_locally`]). The other
//! client waits for the authoritative `TurnResolved` broadcast, which both
//! sides apply unconditionally.

use lockstep_types::{PlayerId, Round};

/// Result of recording one `TurnSubmitted` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// First submission of the pair recorded; waiting for the other player.
    Recorded,
    /// This player already submitted for the round. Idempotent no-op.
    Duplicate,
    /// The submission's round does not match the active round, or the
    /// round's pair already completed. Discarded.
    OutOfRound {
        /// The round the event carried.
        submitted: Round,
        /// The round this client is at.
        current: Round,
    },
    /// The player is neither participant of this game. Discarded.
    UnknownPlayer,
    /// Both submissions are in. Submission state has been cleared and the
    /// round latched; exactly one client acts on this (the resolver).
    Complete {
        /// The completed round.
        round: Round,
        /// Player1's opaque turn payload.
        player1_turn: Vec<u8>,
        /// Player2's opaque turn payload.
        player2_turn: Vec<u8>,
    },
    /// The game already ended; submissions are no longer meaningful.
    GameOver,
}

/// Per-round submission state for one client's local replica.
#[derive(Debug, Clone)]
pub struct TurnTracker {
    player1: PlayerId,
    player2: PlayerId,
    round: Round,
    player1_turn: Option<Vec<u8>>,
    player2_turn: Option<Vec<u8>>,
    /// Latched between pair completion and the authoritative
    /// `TurnResolved` advancing the round. While latched, further
    /// submissions for the round are discarded, so a replayed pair can
    /// never complete twice.
    resolving: bool,
    ended: bool,
}

impl TurnTracker {
    /// Create a tracker for the two participants, starting at `round`.
    pub fn new(player1: PlayerId, player2: PlayerId, round: Round) -> Self {
        Self {
            player1,
            player2,
            round,
            player1_turn: None,
            player2_turn: None,
            resolving: false,
            ended: false,
        }
    }

    /// The round submissions are currently accepted for.
    pub fn current_round(&self) -> Round {
        self.round
    }

    /// Whether the game reached its terminal state.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Whether a completed pair is awaiting its `TurnResolved` broadcast.
    pub fn is_resolving(&self) -> bool {
        self.resolving
    }

    /// Whether this client is the one that triggers resolution.
    ///
    /// Fixed priority: player1's client resolves. The receive path is
    /// idempotent, so the rule only has to be deterministic, not enforced.
    pub fn resolves_locally(&self, local: &PlayerId) -> bool {
        local == &self.player1
    }

    /// Record a `TurnSubmitted` event.
    ///
    /// The event is the single source of truth: a client's own echo goes
    /// through here exactly like the opponent's submissions.
    pub fn submit(&mut self, player: &PlayerId, round: Round, turn: Vec<u8>) -> SubmitOutcome {
        if self.ended {
            return SubmitOutcome::GameOver;
        }
        if round != self.round || self.resolving {
            return SubmitOutcome::OutOfRound {
                submitted: round,
                current: self.round,
            };
        }

        let slot = if player == &self.player1 {
            &mut self.player1_turn
        } else if player == &self.player2 {
            &mut self.player2_turn
        } else {
            return SubmitOutcome::UnknownPlayer;
        };

        if slot.is_some() {
            return SubmitOutcome::Duplicate;
        }
        *slot = Some(turn);

        if self.player1_turn.is_some() && self.player2_turn.is_some() {
            // Clear submission state before anyone resolves, so a
            // redundant late submit event cannot re-trigger.
            let player1_turn = self.player1_turn.take().unwrap_or_default();
            let player2_turn = self.player2_turn.take().unwrap_or_default();
            self.resolving = true;
            SubmitOutcome::Complete {
                round: self.round,
                player1_turn,
                player2_turn,
            }
        } else {
            SubmitOutcome::Recorded
        }
    }

    /// Apply an authoritative `TurnResolved` snapshot for `round`.
    ///
    /// Unconditional, last-writer-wins: the snapshot supersedes any
    /// partially-applied local state. Clears stale submission flags and
    /// advances to the following round.
    pub fn apply_resolved(&mut self, round: Round) -> Round {
        self.round = round.next();
        self.player1_turn = None;
        self.player2_turn = None;
        self.resolving = false;
        self.round
    }

    /// Adopt a full `StateUpdate` snapshot's round.
    pub fn sync_round(&mut self, round: Round) {
        self.round = round;
        self.player1_turn = None;
        self.player2_turn = None;
        self.resolving = false;
    }

    /// Transition to the terminal game state.
    pub fn end_game(&mut self) {
        self.ended = true;
        self.player1_turn = None;
        self.player2_turn = None;
        self.resolving = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p1() -> PlayerId {
        PlayerId::from("p1")
    }

    fn p2() -> PlayerId {
        PlayerId::from("p2")
    }

    fn tracker_at(round: u32) -> TurnTracker {
        TurnTracker::new(p1(), p2(), Round::new(round))
    }

    #[test]
    fn first_submission_is_recorded() {
        let mut tracker = tracker_at(0);
        let outcome = tracker.submit(&p1(), Round::new(0), vec![1]);
        assert_eq!(outcome, SubmitOutcome::Recorded);
    }

    #[test]
    fn second_submission_completes_the_pair() {
        let mut tracker = tracker_at(0);
        tracker.submit(&p1(), Round::new(0), vec![1]);
        let outcome = tracker.submit(&p2(), Round::new(0), vec![2]);

        assert_eq!(
            outcome,
            SubmitOutcome::Complete {
                round: Round::new(0),
                player1_turn: vec![1],
                player2_turn: vec![2],
            }
        );
    }

    #[test]
    fn completion_order_does_not_matter() {
        let mut tracker = tracker_at(3);
        tracker.submit(&p2(), Round::new(3), vec![2]);
        let outcome = tracker.submit(&p1(), Round::new(3), vec![1]);

        assert!(matches!(outcome, SubmitOutcome::Complete { .. }));
    }

    #[test]
    fn duplicate_submission_is_idempotent() {
        let mut tracker = tracker_at(0);
        tracker.submit(&p1(), Round::new(0), vec![1]);
        let outcome = tracker.submit(&p1(), Round::new(0), vec![1]);

        assert_eq!(outcome, SubmitOutcome::Duplicate);
        // The pair still completes normally afterwards
        assert!(matches!(
            tracker.submit(&p2(), Round::new(0), vec![2]),
            SubmitOutcome::Complete { .. }
        ));
    }

    #[test]
    fn duplicate_keeps_the_first_payload() {
        let mut tracker = tracker_at(0);
        tracker.submit(&p1(), Round::new(0), vec![1]);
        tracker.submit(&p1(), Round::new(0), vec![9, 9, 9]);

        match tracker.submit(&p2(), Round::new(0), vec![2]) {
            SubmitOutcome::Complete { player1_turn, .. } => assert_eq!(player1_turn, vec![1]),
            other => panic!("expected Complete, got {:?}", other),
        }
    }

    #[test]
    fn at_most_one_resolution_per_round() {
        // Player A submits round 7, a duplicate of the same submission
        // arrives, then player B submits round 7: exactly one Complete,
        // submission state cleared after it.
        let mut tracker = tracker_at(7);

        assert_eq!(tracker.submit(&p1(), Round::new(7), vec![1]), SubmitOutcome::Recorded);
        assert_eq!(tracker.submit(&p1(), Round::new(7), vec![1]), SubmitOutcome::Duplicate);
        assert!(matches!(
            tracker.submit(&p2(), Round::new(7), vec![2]),
            SubmitOutcome::Complete { .. }
        ));

        // Redundant late arrivals cannot complete the round again
        assert!(matches!(
            tracker.submit(&p1(), Round::new(7), vec![1]),
            SubmitOutcome::OutOfRound { .. }
        ));
        assert!(matches!(
            tracker.submit(&p2(), Round::new(7), vec![2]),
            SubmitOutcome::OutOfRound { .. }
        ));
    }

    #[test]
    fn replayed_pair_cannot_complete_twice() {
        let mut tracker = tracker_at(2);
        tracker.submit(&p1(), Round::new(2), vec![1]);
        tracker.submit(&p2(), Round::new(2), vec![2]);
        assert!(tracker.is_resolving());

        // The transport redelivers the entire pair
        for player in [p1(), p2()] {
            assert!(matches!(
                tracker.submit(&player, Round::new(2), vec![0]),
                SubmitOutcome::OutOfRound { .. }
            ));
        }
    }

    #[test]
    fn stale_round_is_discarded_without_mutation() {
        // A TurnSubmitted for round 4 arriving after round 5 resolved.
        let mut tracker = tracker_at(5);
        tracker.apply_resolved(Round::new(5));
        assert_eq!(tracker.current_round(), Round::new(6));

        let outcome = tracker.submit(&p1(), Round::new(4), vec![1]);
        assert_eq!(
            outcome,
            SubmitOutcome::OutOfRound {
                submitted: Round::new(4),
                current: Round::new(6),
            }
        );
        // No flag was set: a fresh pair for the current round still works
        tracker.submit(&p1(), Round::new(6), vec![1]);
        assert!(matches!(
            tracker.submit(&p2(), Round::new(6), vec![2]),
            SubmitOutcome::Complete { .. }
        ));
    }

    #[test]
    fn future_round_is_discarded() {
        // A submission ahead of the local round means this client missed a
        // TurnResolved; convergence comes from the next snapshot, not from
        // the stray submission.
        let mut tracker = tracker_at(3);
        assert!(matches!(
            tracker.submit(&p1(), Round::new(8), vec![1]),
            SubmitOutcome::OutOfRound { .. }
        ));
    }

    #[test]
    fn unknown_player_is_discarded() {
        let mut tracker = tracker_at(0);
        let outcome = tracker.submit(&PlayerId::from("spectator"), Round::new(0), vec![1]);
        assert_eq!(outcome, SubmitOutcome::UnknownPlayer);
    }

    #[test]
    fn apply_resolved_advances_and_unlatches() {
        let mut tracker = tracker_at(7);
        tracker.submit(&p1(), Round::new(7), vec![1]);
        tracker.submit(&p2(), Round::new(7), vec![2]);
        assert!(tracker.is_resolving());

        let next = tracker.apply_resolved(Round::new(7));
        assert_eq!(next, Round::new(8));
        assert!(!tracker.is_resolving());
        assert_eq!(tracker.submit(&p1(), Round::new(8), vec![1]), SubmitOutcome::Recorded);
    }

    #[test]
    fn apply_resolved_clears_partial_submissions() {
        // Opponent resolved using state we only partially observed; the
        // snapshot supersedes the half-filled pair.
        let mut tracker = tracker_at(4);
        tracker.submit(&p1(), Round::new(4), vec![1]);

        tracker.apply_resolved(Round::new(4));
        assert_eq!(tracker.current_round(), Round::new(5));
        assert_eq!(tracker.submit(&p1(), Round::new(5), vec![1]), SubmitOutcome::Recorded);
    }

    #[test]
    fn sync_round_adopts_snapshot() {
        let mut tracker = tracker_at(1);
        tracker.submit(&p1(), Round::new(1), vec![1]);

        tracker.sync_round(Round::new(9));
        assert_eq!(tracker.current_round(), Round::new(9));
        assert_eq!(tracker.submit(&p1(), Round::new(9), vec![1]), SubmitOutcome::Recorded);
    }

    #[test]
    fn submissions_after_game_end_are_ignored() {
        let mut tracker = tracker_at(5);
        tracker.end_game();

        assert!(tracker.is_ended());
        assert_eq!(tracker.submit(&p1(), Round::new(5), vec![1]), SubmitOutcome::GameOver);
    }

    #[test]
    fn player1_client_is_the_resolver() {
        let tracker = tracker_at(0);
        assert!(tracker.resolves_locally(&p1()));
        assert!(!tracker.resolves_locally(&p2()));
    }
}
