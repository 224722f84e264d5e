//! Game state store collaborator.
//!
//! The sync engine never owns game state; it delivers agreement. The
//! store is the single sink for resolved state and the single source of
//! locally-initiated resolution. Protocol handlers talk to it through
//! typed outcomes, never through shared global state.

use thiserror::Error;

use lockstep_types::{BoardSnapshot, GameId, PlayerId, Round};

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not resolve the round from the two submissions.
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// The store has no game loaded.
    #[error("no active game")]
    NoGame,
}

/// Lifecycle status of a game record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Moves are being exchanged.
    Active,
    /// A terminal result has been recorded.
    Ended,
}

/// The record-store seed for a session: participant identities and
/// status. Read-only from the sync engine's perspective.
#[derive(Debug, Clone)]
pub struct GameRecord {
    /// The game this session is scoped to.
    pub game_id: GameId,
    /// First participant. By convention, player1's client is the
    /// resolution writer.
    pub player1: PlayerId,
    /// Second participant.
    pub player2: PlayerId,
    /// Current lifecycle status.
    pub status: GameStatus,
}

/// Outcome of resolving one round from both submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The game continues.
    Continue {
        /// Full board snapshot after applying both turns.
        board: BoardSnapshot,
        /// Whose turn marker is active next.
        active_player: PlayerId,
    },
    /// The resolution produced a terminal result.
    Ended {
        /// Final board snapshot.
        board: BoardSnapshot,
        /// The winner, or None for a draw.
        winner: Option<PlayerId>,
    },
}

/// External game state store.
///
/// `resolve_turn` is only invoked on the single resolution-writer client
/// once both submissions are confirmed locally; `apply_*` are invoked on
/// both clients from authoritative broadcasts.
pub trait GameStateStore: Send + Sync {
    /// The game record currently loaded.
    fn current_game(&self) -> Option<GameRecord>;

    /// The current full board snapshot.
    fn board_state(&self) -> BoardSnapshot;

    /// Compute the next board from both players' opaque turn payloads.
    fn resolve_turn(
        &mut self,
        round: Round,
        player1_turn: &[u8],
        player2_turn: &[u8],
    ) -> Result<Resolution, StoreError>;

    /// Replace board state and active-turn marker with a resolved snapshot.
    fn apply_resolved(&mut self, round: Round, board: &BoardSnapshot, active_player: &PlayerId);

    /// Record the terminal result and final board.
    fn apply_ended(&mut self, winner: Option<&PlayerId>, board: &BoardSnapshot);
}

/// In-memory store for tests and examples.
///
/// Resolution is deliberately trivial: the new board is the two turn
/// payloads concatenated, and the active marker alternates. A scripted
/// terminal result can be armed with [`MemoryStore::end_on_next_resolve`].
#[derive(Debug, Clone)]
pub struct MemoryStore {
    record: GameRecord,
    board: BoardSnapshot,
    active_player: PlayerId,
    last_applied_round: Option<Round>,
    winner: Option<Option<PlayerId>>,
    end_on_resolve: Option<Option<PlayerId>>,
}

impl MemoryStore {
    /// Create a store seeded from a game record.
    pub fn new(record: GameRecord) -> Self {
        let active_player = record.player1.clone();
        Self {
            record,
            board: BoardSnapshot::default(),
            active_player,
            last_applied_round: None,
            winner: None,
            end_on_resolve: None,
        }
    }

    /// Arm the next `resolve_turn` call to produce a terminal result.
    pub fn end_on_next_resolve(&mut self, winner: Option<PlayerId>) {
        self.end_on_resolve = Some(winner);
    }

    /// The active-turn marker as last applied.
    pub fn active_player(&self) -> &PlayerId {
        &self.active_player
    }

    /// The most recent round applied via `apply_resolved`.
    pub fn last_applied_round(&self) -> Option<Round> {
        self.last_applied_round
    }

    /// The recorded terminal result, if the game ended.
    pub fn winner(&self) -> Option<&Option<PlayerId>> {
        self.winner.as_ref()
    }
}

impl GameStateStore for MemoryStore {
    fn current_game(&self) -> Option<GameRecord> {
        Some(self.record.clone())
    }

    fn board_state(&self) -> BoardSnapshot {
        self.board.clone()
    }

    fn resolve_turn(
        &mut self,
        _round: Round,
        player1_turn: &[u8],
        player2_turn: &[u8],
    ) -> Result<Resolution, StoreError> {
        let mut combined = Vec::with_capacity(player1_turn.len() + player2_turn.len());
        combined.extend_from_slice(player1_turn);
        combined.extend_from_slice(player2_turn);
        let board = BoardSnapshot::new(combined);

        if let Some(winner) = self.end_on_resolve.take() {
            return Ok(Resolution::Ended { board, winner });
        }

        let active_player = if self.active_player == self.record.player1 {
            self.record.player2.clone()
        } else {
            self.record.player1.clone()
        };
        Ok(Resolution::Continue {
            board,
            active_player,
        })
    }

    fn apply_resolved(&mut self, round: Round, board: &BoardSnapshot, active_player: &PlayerId) {
        self.board = board.clone();
        self.active_player = active_player.clone();
        self.last_applied_round = Some(round);
    }

    fn apply_ended(&mut self, winner: Option<&PlayerId>, board: &BoardSnapshot) {
        self.board = board.clone();
        self.winner = Some(winner.cloned());
        self.record.status = GameStatus::Ended;
    }
}
