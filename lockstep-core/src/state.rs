//! Connection lifecycle state machine for a session channel.
//!
//! This module provides a pure, side-effect-free state machine for managing
//! the channel subscription lifecycle. The machine takes transport signals
//! as input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (opening the channel, arming timers, announcing presence)
//! is performed by lockstep-client, not by this module. This enables
//! instant unit testing without transport mocks.

use std::time::Duration;

use crate::backoff::BackoffPolicy;

/// Reconnection tuning applied on every failure transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Whether connection failures schedule automatic reconnects.
    pub auto_reconnect: bool,
    /// Reconnect attempts allowed before the session parks in `Error`.
    pub max_attempts: u32,
    /// Delay computation between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_attempts: 5,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Connection state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No active subscription.
    Disconnected,
    /// Channel open requested, waiting for subscription confirmation.
    Connecting,
    /// Subscription confirmed.
    Connected {
        /// When the subscription was confirmed, unix millis.
        since_ms: u64,
    },
    /// Waiting out a backoff delay before re-opening the channel.
    Reconnecting {
        /// Consecutive reconnect attempts so far.
        attempt: u32,
    },
    /// Reconnection disabled or attempts exhausted. Terminal for this
    /// session until a manual reconnect.
    Error {
        /// The connection error that parked the session here.
        message: String,
    },
}

impl ConnectionState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process a transport signal and return the new state plus actions.
    ///
    /// Pure function - no side effects. The caller (lockstep-client)
    /// executes the returned actions.
    pub fn on_signal(self, signal: Signal, policy: &RetryPolicy) -> (Self, Vec<Action>) {
        match (self, signal) {
            // Opening a channel
            (Self::Disconnected | Self::Error { .. }, Signal::OpenRequested) => {
                (Self::Connecting, vec![Action::OpenChannel])
            }

            // Subscription confirmed. Arriving here from Reconnecting drops
            // the attempt counter, which is exactly the required reset.
            (
                Self::Connecting | Self::Reconnecting { .. } | Self::Disconnected,
                Signal::Subscribed { at_ms },
            ) => (
                Self::Connected { since_ms: at_ms },
                vec![
                    Action::AnnouncePresence,
                    Action::Emit(ConnectionEvent::Connected { at_ms }),
                ],
            ),

            // Transport failure while connected or connecting
            (
                state @ (Self::Connected { .. } | Self::Connecting | Self::Reconnecting { .. }),
                Signal::ChannelError { error },
            ) => Self::on_failure(state, error, policy),
            (
                state @ (Self::Connected { .. } | Self::Connecting | Self::Reconnecting { .. }),
                Signal::TimedOut,
            ) => Self::on_failure(state, "subscription timed out".into(), policy),

            // Backoff timer fired: re-open the channel
            (Self::Reconnecting { .. }, Signal::BackoffTimerFired) => {
                (Self::Connecting, vec![Action::OpenChannel])
            }

            // Clean close from the transport: no auto action
            (state, Signal::Closed) => {
                if matches!(state, Self::Disconnected) {
                    (state, vec![])
                } else {
                    (
                        Self::Disconnected,
                        vec![Action::Emit(ConnectionEvent::Offline)],
                    )
                }
            }

            // Scoped release; safe from any state, repeatedly
            (state, Signal::CloseRequested) => {
                if matches!(state, Self::Disconnected) {
                    (state, vec![])
                } else {
                    (
                        Self::Disconnected,
                        vec![
                            Action::CancelBackoffTimer,
                            Action::TearDown,
                            Action::Emit(ConnectionEvent::Offline),
                        ],
                    )
                }
            }

            // Manual reconnect resets the attempt counter by construction:
            // Connecting carries none.
            (_, Signal::ReconnectRequested) => (
                Self::Connecting,
                vec![
                    Action::CancelBackoffTimer,
                    Action::TearDown,
                    Action::OpenChannel,
                ],
            ),

            // Everything else is a stale or meaningless signal for the state
            (state, _) => (state, vec![]),
        }
    }

    /// Shared failure path for `ChannelError` and `TimedOut`.
    ///
    /// The error is recorded and the machine proceeds to `Reconnecting` in
    /// the same transition; it only parks in `Error` when reconnection is
    /// disabled or attempts are exhausted.
    fn on_failure(state: Self, error: String, policy: &RetryPolicy) -> (Self, Vec<Action>) {
        let prior_attempts = match state {
            Self::Reconnecting { attempt } => attempt,
            _ => 0,
        };

        if policy.auto_reconnect && prior_attempts < policy.max_attempts {
            let attempt = prior_attempts.saturating_add(1);
            let delay = policy.backoff.delay(prior_attempts);
            (
                Self::Reconnecting { attempt },
                vec![
                    Action::Emit(ConnectionEvent::Retrying {
                        attempt,
                        delay,
                        error: error.clone(),
                    }),
                    Action::StartBackoffTimer { delay, attempt },
                ],
            )
        } else {
            (
                Self::Error {
                    message: error.clone(),
                },
                vec![
                    Action::CancelBackoffTimer,
                    Action::Emit(ConnectionEvent::Lost { error }),
                ],
            )
        }
    }

    /// Check if the subscription is confirmed.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Check if the machine is working toward a subscription.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting { .. })
    }

    /// Consecutive reconnect attempts in flight (0 outside `Reconnecting`).
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Reconnecting { attempt } => *attempt,
            _ => 0,
        }
    }

    /// The persistent connection error, if parked in `Error`.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport signals feeding the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// The session asked to open its channel.
    OpenRequested,
    /// Subscription confirmed by the transport.
    Subscribed {
        /// Confirmation time, unix millis.
        at_ms: u64,
    },
    /// Channel-level transport error.
    ChannelError {
        /// Error message from the transport.
        error: String,
    },
    /// Subscription attempt timed out.
    TimedOut,
    /// Transport closed the channel cleanly.
    Closed,
    /// The armed backoff timer fired.
    BackoffTimerFired,
    /// The session asked to close its channel.
    CloseRequested,
    /// Manual reconnect requested; resets the attempt counter.
    ReconnectRequested,
}

/// Actions to be executed by the session client.
///
/// These are instructions, not side effects. The client interprets them
/// and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the channel and request subscription.
    OpenChannel,
    /// Unsubscribe and release the channel.
    TearDown,
    /// Arm a reconnect timer.
    StartBackoffTimer {
        /// Delay before the timer fires.
        delay: Duration,
        /// The attempt this timer belongs to.
        attempt: u32,
    },
    /// Cancel any pending reconnect timer.
    CancelBackoffTimer,
    /// Announce self-presence on the freshly subscribed channel.
    AnnouncePresence,
    /// Surface a connection event to the application layer.
    Emit(ConnectionEvent),
}

/// Connection events surfaced to the application layer.
///
/// `Retrying` and `Lost` are distinct so a presenting layer can choose
/// between "retrying…" and "connection lost, please refresh".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Subscription confirmed.
    Connected {
        /// Confirmation time, unix millis.
        at_ms: u64,
    },
    /// Transient failure; a reconnect is scheduled.
    Retrying {
        /// Which reconnect attempt was scheduled.
        attempt: u32,
        /// Delay before it runs.
        delay: Duration,
        /// The error that triggered it.
        error: String,
    },
    /// Persistent failure; no further automatic reconnects.
    Lost {
        /// The final connection error.
        error: String,
    },
    /// Channel released or closed cleanly.
    Offline,
}
