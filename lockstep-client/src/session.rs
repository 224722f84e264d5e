//! SessionClient - the connection manager for one game session.
//!
//! Owns the channel lifecycle, drives reconnection through the pure state
//! machine in lockstep-core, and routes inbound signals to the presence
//! tracker and turn protocol. Outbound actions flow through the
//! [`EventBroadcaster`] back onto the same channel.
//!
//! ```text
//! Application → SessionClient → ChannelTransport → network
//!                     ↓
//!              lockstep-core (pure state machines)
//! ```
//!
//! All state transitions are serialized through one inbound signal path:
//! the transport stream plus timer callbacks, both funneled into
//! [`SessionClient::handle_signal`] / the lifecycle driver. Timer
//! callbacks carry an epoch and are discarded when the session they were
//! armed for has been superseded.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use lockstep_core::{
    Action, BackoffPolicy, ConnectionEvent, ConnectionState, OpponentStatus, PresenceTracker,
    RetryPolicy, Signal, SubmitOutcome, TurnTracker,
};
use lockstep_types::{
    BoardSnapshot, ChannelStatus, GameEnded, GameEvent, PlayerAction, PlayerId, PresenceEntry,
    Round, Roster, StateUpdate, TurnResolved, TurnSubmitted,
};

use crate::broadcast::{BroadcastError, EventBroadcaster};
use crate::channel::{ChannelError, ChannelSignal, ChannelTransport};
use crate::store::{GameRecord, GameStateStore, GameStatus, Resolution};

/// Session errors for public operations.
///
/// Connectivity is observed through state, not through errors: transport
/// failures are absorbed into the connection lifecycle and never thrown
/// from public operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A broadcast operation failed; retry is the caller's decision.
    #[error("broadcast failed: {0}")]
    Broadcast(#[from] BroadcastError),

    /// The game already reached its terminal state.
    #[error("game already ended")]
    GameOver,
}

/// Tuning accepted at session start.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whether connection failures schedule automatic reconnects.
    pub auto_reconnect: bool,
    /// Reconnect attempts before the session surfaces a persistent error.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on the reconnect delay in milliseconds.
    pub cap_delay_ms: u64,
    /// Apply the local player's own submission before its echo returns.
    pub optimistic_submit: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            base_delay_ms: lockstep_core::DEFAULT_BASE_DELAY_MS,
            cap_delay_ms: lockstep_core::DEFAULT_CAP_DELAY_MS,
            optimistic_submit: false,
        }
    }
}

impl SessionConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable automatic reconnects.
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the reconnect attempt cap.
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the backoff tuning.
    pub fn with_backoff(mut self, base_delay_ms: u64, cap_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.cap_delay_ms = cap_delay_ms;
        self
    }

    /// Enable optimistic application of the local player's submissions.
    pub fn with_optimistic_submit(mut self, enabled: bool) -> Self {
        self.optimistic_submit = enabled;
        self
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            auto_reconnect: self.auto_reconnect,
            max_attempts: self.max_reconnect_attempts,
            backoff: BackoffPolicy::from_millis(self.base_delay_ms, self.cap_delay_ms),
        }
    }
}

/// Events surfaced to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Subscription confirmed.
    Connected {
        /// Confirmation time, unix millis.
        at_ms: u64,
    },
    /// Transient failure; a reconnect is scheduled.
    Reconnecting {
        /// Which attempt was scheduled.
        attempt: u32,
        /// Delay before it runs.
        delay: Duration,
    },
    /// Attempts exhausted or reconnection disabled; manual action needed.
    ConnectionLost {
        /// The persistent connection error.
        error: String,
    },
    /// Channel released or closed cleanly.
    Disconnected,
    /// Opponent liveness changed.
    OpponentStatus {
        /// Whether the opponent is on the channel.
        online: bool,
        /// Newest join timestamp seen, unix millis.
        last_seen_ms: Option<u64>,
    },
    /// The opponent performed an out-of-turn action.
    OpponentAction {
        /// Who acted.
        player: PlayerId,
        /// Opaque action payload.
        action: Vec<u8>,
    },
    /// A submission was recorded for the active round.
    TurnRecorded {
        /// Who submitted.
        player: PlayerId,
        /// The round it belongs to.
        round: Round,
    },
    /// A round resolved; the store holds the new snapshot.
    TurnResolved {
        /// The resolved round.
        round: Round,
        /// Whose turn marker is active next.
        active_player: PlayerId,
    },
    /// A full snapshot was adopted outside the resolve cycle.
    StateUpdated {
        /// The snapshot's round.
        round: Round,
    },
    /// The game reached its terminal state.
    GameEnded {
        /// The winner, or None for a draw.
        winner: Option<PlayerId>,
    },
}

/// Connection status snapshot for presenting layers.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// The lifecycle state.
    pub state: ConnectionState,
    /// When the subscription was last confirmed, unix millis.
    pub last_connected_ms: Option<u64>,
    /// The most recent connection error message.
    pub last_error: Option<String>,
    /// Consecutive reconnect attempts in flight.
    pub attempts: u32,
}

struct SessionShared {
    conn: ConnectionState,
    presence: PresenceTracker,
    turns: TurnTracker,
    last_roster: Option<Roster>,
    last_connected_ms: Option<u64>,
    last_error: Option<String>,
    announced: bool,
    /// Incremented whenever pending timers become stale (close, manual
    /// reconnect). Timer callbacks from an older epoch are discarded.
    epoch: u64,
    backoff_task: Option<JoinHandle<()>>,
}

struct SessionInner<C: ChannelTransport, S: GameStateStore> {
    config: SessionConfig,
    record: GameRecord,
    self_id: PlayerId,
    channel: Arc<C>,
    store: Mutex<S>,
    state: Mutex<SessionShared>,
    connected: Arc<AtomicBool>,
    broadcaster: EventBroadcaster<C>,
    events_tx: UnboundedSender<SessionEvent>,
    /// Wakes the `run` pump after every lifecycle transition, so it can
    /// park during a backoff window instead of polling.
    wake: Notify,
}

/// The connection manager for one game session.
///
/// Cheap to clone; clones share the session.
pub struct SessionClient<C: ChannelTransport, S: GameStateStore> {
    inner: Arc<SessionInner<C, S>>,
}

impl<C: ChannelTransport, S: GameStateStore> Clone for SessionClient<C, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, S> SessionClient<C, S>
where
    C: ChannelTransport + 'static,
    S: GameStateStore + 'static,
{
    /// Create a session seeded from a game record.
    ///
    /// Returns the client and the application event stream.
    pub fn new(
        config: SessionConfig,
        record: GameRecord,
        self_id: PlayerId,
        channel: C,
        store: S,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let opponent_id = if self_id == record.player1 {
            record.player2.clone()
        } else {
            if self_id != record.player2 {
                warn!(%self_id, "session identity is not a participant of the game record");
            }
            record.player1.clone()
        };

        let mut turns = TurnTracker::new(
            record.player1.clone(),
            record.player2.clone(),
            Round::first(),
        );
        if record.status == GameStatus::Ended {
            turns.end_game();
        }

        let (events_tx, events_rx) = unbounded_channel();
        let channel = Arc::new(channel);
        let connected = Arc::new(AtomicBool::new(false));
        let broadcaster = EventBroadcaster::new(Arc::clone(&channel), Arc::clone(&connected));

        let client = Self {
            inner: Arc::new(SessionInner {
                config,
                record,
                self_id: self_id.clone(),
                channel,
                store: Mutex::new(store),
                state: Mutex::new(SessionShared {
                    conn: ConnectionState::new(),
                    presence: PresenceTracker::new(self_id, opponent_id),
                    turns,
                    last_roster: None,
                    last_connected_ms: None,
                    last_error: None,
                    announced: false,
                    epoch: 0,
                    backoff_task: None,
                }),
                connected,
                broadcaster,
                events_tx,
                wake: Notify::new(),
            }),
        };
        (client, events_rx)
    }

    // ---- lifecycle ------------------------------------------------------

    /// Open the session channel and request subscription.
    ///
    /// Idempotent: a no-op while a subscription is live or in progress.
    /// Connectivity outcomes arrive as [`SessionEvent`]s, not as errors.
    pub async fn open(&self) {
        {
            let state = self.inner.state.lock().await;
            if state.conn.is_connected() || state.conn.is_connecting() {
                return;
            }
        }
        self.drive(Signal::OpenRequested).await;
    }

    /// Release the channel: cancel pending reconnects, unsubscribe, and
    /// transition to Disconnected. Safe from any state, repeatedly.
    pub async fn close(&self) {
        self.drive(Signal::CloseRequested).await;
    }

    /// Manual reconnect: tears down any current subscription, resets the
    /// attempt counter, and re-opens with the same identity.
    pub async fn reconnect(&self) {
        self.drive(Signal::ReconnectRequested).await;
    }

    /// Consume inbound channel signals until the session disconnects or
    /// parks in a persistent error.
    pub async fn run(&self) {
        loop {
            let conn = {
                let state = self.inner.state.lock().await;
                state.conn.clone()
            };
            match conn {
                ConnectionState::Disconnected | ConnectionState::Error { .. } => break,
                // Waiting out a backoff window; the timer task drives the
                // next transition and wakes us.
                ConnectionState::Reconnecting { .. } => {
                    self.inner.wake.notified().await;
                }
                _ => match self.inner.channel.recv().await {
                    Ok(signal) => self.handle_signal(signal).await,
                    Err(ChannelError::Closed) => self.drive(Signal::Closed).await,
                    Err(err) => {
                        self.drive(Signal::ChannelError {
                            error: err.to_string(),
                        })
                        .await
                    }
                },
            }
        }
    }

    /// Process one inbound channel signal.
    ///
    /// This is the single serialized mutation path for the session.
    pub async fn handle_signal(&self, signal: ChannelSignal) {
        match signal {
            ChannelSignal::Status { status, error } => {
                let signal = match status {
                    ChannelStatus::Subscribed => Signal::Subscribed { at_ms: now_ms() },
                    ChannelStatus::ChannelError => Signal::ChannelError {
                        error: error.unwrap_or_else(|| "channel error".to_string()),
                    },
                    ChannelStatus::TimedOut => Signal::TimedOut,
                    ChannelStatus::Closed => Signal::Closed,
                };
                self.drive(signal).await;
            }
            ChannelSignal::Presence(roster) => self.observe_roster(roster).await,
            ChannelSignal::Broadcast(bytes) => match GameEvent::from_bytes(&bytes) {
                Ok(event) => self.apply_event(event).await,
                Err(err) => warn!(%err, "dropping undecodable broadcast"),
            },
        }
    }

    // ---- outbound operations --------------------------------------------

    /// Broadcast the local player's move for the active round.
    ///
    /// With `optimistic_submit` the submission is also applied locally
    /// right away; otherwise the client waits for its own echo, which is
    /// the source of truth either way.
    pub async fn submit_turn(&self, turn: Vec<u8>) -> Result<(), SessionError> {
        let round = {
            let state = self.inner.state.lock().await;
            if state.turns.is_ended() {
                return Err(SessionError::GameOver);
            }
            state.turns.current_round()
        };

        let event = GameEvent::TurnSubmitted(TurnSubmitted {
            player: self.inner.self_id.clone(),
            round,
            turn: turn.clone(),
        });
        self.inner.broadcaster.emit(&event).await?;

        if self.inner.config.optimistic_submit {
            self.apply_submission(self.inner.self_id.clone(), round, turn)
                .await;
        }
        Ok(())
    }

    /// Broadcast an out-of-turn action (opaque to the sync engine).
    pub async fn broadcast_action(&self, action: Vec<u8>) -> Result<(), SessionError> {
        let event = GameEvent::PlayerAction(PlayerAction {
            player: self.inner.self_id.clone(),
            action,
        });
        self.inner.broadcaster.emit(&event).await?;
        Ok(())
    }

    /// Broadcast a full board snapshot at the current round, seeding any
    /// receiver with no prior context.
    pub async fn broadcast_state(
        &self,
        board: BoardSnapshot,
        active_player: PlayerId,
    ) -> Result<(), SessionError> {
        let round = {
            let state = self.inner.state.lock().await;
            state.turns.current_round()
        };
        let event = GameEvent::StateUpdate(StateUpdate {
            round,
            board,
            active_player,
        });
        self.inner.broadcaster.emit(&event).await?;
        Ok(())
    }

    /// Broadcast and record a terminal game result.
    pub async fn end_game(
        &self,
        winner: Option<PlayerId>,
        board: BoardSnapshot,
    ) -> Result<(), SessionError> {
        {
            let state = self.inner.state.lock().await;
            if state.turns.is_ended() {
                return Err(SessionError::GameOver);
            }
        }
        let event = GameEvent::GameEnded(GameEnded {
            winner: winner.clone(),
            board: board.clone(),
        });
        self.inner.broadcaster.emit(&event).await?;
        self.apply_game_end(winner, board).await;
        Ok(())
    }

    // ---- accessors ------------------------------------------------------

    /// Whether the subscription is confirmed.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Snapshot of the connection status for presenting layers.
    pub async fn connection_info(&self) -> ConnectionInfo {
        let state = self.inner.state.lock().await;
        ConnectionInfo {
            attempts: state.conn.attempts(),
            state: state.conn.clone(),
            last_connected_ms: state.last_connected_ms,
            last_error: state.last_error.clone(),
        }
    }

    /// The opponent's liveness as last observed.
    pub async fn opponent_status(&self) -> OpponentStatus {
        let state = self.inner.state.lock().await;
        state.presence.status().clone()
    }

    /// The round submissions are currently accepted for.
    pub async fn current_round(&self) -> Round {
        let state = self.inner.state.lock().await;
        state.turns.current_round()
    }

    /// Access the underlying channel (for testing).
    pub fn channel(&self) -> &C {
        &self.inner.channel
    }

    // ---- lifecycle driver -----------------------------------------------

    /// Run a signal through the pure state machine and execute the
    /// resulting actions. Failures during execution feed back in as
    /// further signals until the machine settles.
    ///
    /// Returns a boxed future: the backoff timer task re-enters this
    /// path, and the recursion through `execute`'s spawn needs a type
    /// boundary for the future to be nameable and `Send`.
    fn drive(&self, signal: Signal) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let policy = self.inner.config.retry_policy();
            let mut pending = Some(signal);
            while let Some(signal) = pending.take() {
                let actions = {
                    let mut state = self.inner.state.lock().await;
                    let (next, actions) = state.conn.clone().on_signal(signal, &policy);
                    state.conn = next;
                    actions
                };
                for action in actions {
                    if let Some(follow_up) = self.execute(action).await {
                        pending = Some(follow_up);
                    }
                }
            }
            // A permit is stored if the pump is mid-iteration, so a
            // transition between its state check and its park is never
            // lost.
            self.inner.wake.notify_one();
        })
    }

    async fn execute(&self, action: Action) -> Option<Signal> {
        match action {
            Action::OpenChannel => {
                {
                    let mut state = self.inner.state.lock().await;
                    // Fresh join: presence must be announced again once
                    // the new subscription confirms.
                    state.announced = false;
                }
                let topic = format!("game:{}", self.inner.record.game_id);
                if let Err(err) = self.inner.channel.open(&topic, &self.inner.self_id).await {
                    return Some(Signal::ChannelError {
                        error: err.to_string(),
                    });
                }
                if let Err(err) = self.inner.channel.subscribe().await {
                    return Some(Signal::ChannelError {
                        error: err.to_string(),
                    });
                }
                None
            }
            Action::TearDown => {
                self.inner.connected.store(false, Ordering::SeqCst);
                // A torn-down session ignores the outcome.
                if let Err(err) = self.inner.channel.close().await {
                    debug!(%err, "channel close failed during teardown");
                }
                None
            }
            Action::StartBackoffTimer { delay, attempt } => {
                let epoch = {
                    let mut state = self.inner.state.lock().await;
                    if let Some(task) = state.backoff_task.take() {
                        task.abort();
                    }
                    state.epoch
                };
                debug!(attempt, ?delay, "scheduling reconnect");
                let client = self.clone();
                let task = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    client.backoff_fired(epoch).await;
                });
                let mut state = self.inner.state.lock().await;
                state.backoff_task = Some(task);
                None
            }
            Action::CancelBackoffTimer => {
                let mut state = self.inner.state.lock().await;
                if let Some(task) = state.backoff_task.take() {
                    task.abort();
                }
                state.epoch += 1;
                None
            }
            Action::AnnouncePresence => {
                let announce = {
                    let mut state = self.inner.state.lock().await;
                    if state.announced {
                        false
                    } else {
                        state.announced = true;
                        true
                    }
                };
                if announce {
                    let entry = PresenceEntry::new(self.inner.self_id.clone(), now_ms());
                    if let Err(err) = self.inner.channel.announce(entry).await {
                        warn!(%err, "presence announce failed");
                    }
                }
                None
            }
            Action::Emit(event) => {
                self.emit_connection_event(event).await;
                None
            }
        }
    }

    async fn emit_connection_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected { at_ms } => {
                let eager = {
                    let mut state = self.inner.state.lock().await;
                    state.last_connected_ms = Some(at_ms);
                    state.last_error = None;
                    state.last_roster.clone().and_then(|roster| {
                        // The opponent may have been on the channel before
                        // we (re)joined; re-derive eagerly.
                        state.presence.observe(&roster)
                    })
                };
                self.inner.connected.store(true, Ordering::SeqCst);
                self.send_event(SessionEvent::Connected { at_ms });
                if let Some(status) = eager {
                    self.send_event(SessionEvent::OpponentStatus {
                        online: status.online,
                        last_seen_ms: status.last_seen_ms,
                    });
                }
            }
            ConnectionEvent::Retrying {
                attempt,
                delay,
                error,
            } => {
                self.inner.connected.store(false, Ordering::SeqCst);
                {
                    let mut state = self.inner.state.lock().await;
                    state.last_error = Some(error);
                }
                self.send_event(SessionEvent::Reconnecting { attempt, delay });
            }
            ConnectionEvent::Lost { error } => {
                self.inner.connected.store(false, Ordering::SeqCst);
                {
                    let mut state = self.inner.state.lock().await;
                    state.last_error = Some(error.clone());
                }
                self.send_event(SessionEvent::ConnectionLost { error });
            }
            ConnectionEvent::Offline => {
                self.inner.connected.store(false, Ordering::SeqCst);
                self.send_event(SessionEvent::Disconnected);
            }
        }
    }

    async fn backoff_fired(&self, epoch: u64) {
        {
            let state = self.inner.state.lock().await;
            if state.epoch != epoch {
                debug!("ignoring reconnect timer from superseded session");
                return;
            }
            if !matches!(state.conn, ConnectionState::Reconnecting { .. }) {
                return;
            }
        }
        self.drive(Signal::BackoffTimerFired).await;
    }

    // ---- inbound routing ------------------------------------------------

    async fn observe_roster(&self, roster: Roster) {
        let changed = {
            let mut state = self.inner.state.lock().await;
            state.last_roster = Some(roster.clone());
            state.presence.observe(&roster)
        };
        if let Some(status) = changed {
            self.send_event(SessionEvent::OpponentStatus {
                online: status.online,
                last_seen_ms: status.last_seen_ms,
            });
        }
    }

    async fn apply_event(&self, event: GameEvent) {
        match event {
            GameEvent::TurnSubmitted(submitted) => {
                self.apply_submission(submitted.player, submitted.round, submitted.turn)
                    .await;
            }
            GameEvent::TurnResolved(resolved) => self.apply_resolution(resolved).await,
            GameEvent::GameEnded(ended) => {
                self.apply_game_end(ended.winner, ended.board).await;
            }
            GameEvent::StateUpdate(update) => {
                {
                    let mut state = self.inner.state.lock().await;
                    state.turns.sync_round(update.round);
                }
                {
                    let mut store = self.inner.store.lock().await;
                    store.apply_resolved(update.round, &update.board, &update.active_player);
                }
                self.send_event(SessionEvent::StateUpdated {
                    round: update.round,
                });
            }
            GameEvent::PlayerAction(action) => {
                // Our own echo carries nothing the app doesn't know.
                if action.player != self.inner.self_id {
                    self.send_event(SessionEvent::OpponentAction {
                        player: action.player,
                        action: action.action,
                    });
                }
            }
        }
    }

    /// Record one `TurnSubmitted` event, whoever sent it; trigger
    /// resolution when this completes the pair and this client is the
    /// resolution writer.
    async fn apply_submission(&self, player: PlayerId, round: Round, turn: Vec<u8>) {
        let outcome = {
            let mut state = self.inner.state.lock().await;
            state.turns.submit(&player, round, turn)
        };
        match outcome {
            SubmitOutcome::Recorded => {
                self.send_event(SessionEvent::TurnRecorded { player, round });
            }
            SubmitOutcome::Duplicate => {
                debug!(%player, %round, "duplicate submission, already recorded");
            }
            SubmitOutcome::OutOfRound { submitted, current } => {
                warn!(%player, %submitted, %current, "discarding out-of-round submission");
            }
            SubmitOutcome::UnknownPlayer => {
                warn!(%player, "discarding submission from non-participant");
            }
            SubmitOutcome::GameOver => {
                debug!(%player, "ignoring submission after game end");
            }
            SubmitOutcome::Complete {
                round,
                player1_turn,
                player2_turn,
            } => {
                self.send_event(SessionEvent::TurnRecorded { player, round });
                let resolves_here = {
                    let state = self.inner.state.lock().await;
                    state.turns.resolves_locally(&self.inner.self_id)
                };
                if resolves_here {
                    self.resolve_round(round, player1_turn, player2_turn).await;
                }
            }
        }
    }

    /// Single-writer resolution path: compute the new snapshot via the
    /// store and broadcast it. Only invoked on player1's client.
    async fn resolve_round(&self, round: Round, player1_turn: Vec<u8>, player2_turn: Vec<u8>) {
        let resolution = {
            let mut store = self.inner.store.lock().await;
            store.resolve_turn(round, &player1_turn, &player2_turn)
        };
        match resolution {
            Ok(Resolution::Continue {
                board,
                active_player,
            }) => {
                {
                    let mut store = self.inner.store.lock().await;
                    store.apply_resolved(round, &board, &active_player);
                }
                {
                    let mut state = self.inner.state.lock().await;
                    state.turns.apply_resolved(round);
                }
                let event = GameEvent::TurnResolved(TurnResolved {
                    round,
                    board,
                    active_player: active_player.clone(),
                });
                if let Err(err) = self.inner.broadcaster.emit(&event).await {
                    warn!(%err, %round, "failed to broadcast round resolution");
                }
                self.send_event(SessionEvent::TurnResolved {
                    round,
                    active_player,
                });
            }
            Ok(Resolution::Ended { board, winner }) => {
                let event = GameEvent::GameEnded(GameEnded {
                    winner: winner.clone(),
                    board: board.clone(),
                });
                if let Err(err) = self.inner.broadcaster.emit(&event).await {
                    warn!(%err, %round, "failed to broadcast game end");
                }
                self.apply_game_end(winner, board).await;
            }
            Err(err) => warn!(%err, %round, "turn resolution failed"),
        }
    }

    /// Apply an authoritative `TurnResolved` snapshot: unconditional
    /// replace, stale submission flags cleared.
    async fn apply_resolution(&self, resolved: TurnResolved) {
        let already_applied = {
            let mut state = self.inner.state.lock().await;
            let applied = state.turns.current_round() == resolved.round.next()
                && !state.turns.is_resolving();
            state.turns.apply_resolved(resolved.round);
            applied
        };
        {
            let mut store = self.inner.store.lock().await;
            store.apply_resolved(resolved.round, &resolved.board, &resolved.active_player);
        }
        // The resolver already surfaced this round when it resolved it;
        // its own echo changes nothing.
        if !already_applied {
            self.send_event(SessionEvent::TurnResolved {
                round: resolved.round,
                active_player: resolved.active_player,
            });
        }
    }

    async fn apply_game_end(&self, winner: Option<PlayerId>, board: BoardSnapshot) {
        let already_ended = {
            let mut state = self.inner.state.lock().await;
            let ended = state.turns.is_ended();
            state.turns.end_game();
            ended
        };
        {
            let mut store = self.inner.store.lock().await;
            store.apply_ended(winner.as_ref(), &board);
        }
        if !already_ended {
            self.send_event(SessionEvent::GameEnded { winner });
        }
    }

    fn send_event(&self, event: SessionEvent) {
        // The application may have dropped its receiver; that is its call.
        let _ = self.inner.events_tx.send(event);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
