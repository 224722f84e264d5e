//! # lockstep-core
//!
//! Pure logic for lockstep (no I/O, instant tests).
//!
//! This crate implements the state machines and algorithms for two-player
//! turn synchronization without any network I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce
//! output without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (channel subscription, timers, broadcasting) is performed
//! by `lockstep-client`, which interprets the actions produced by these
//! state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod presence;
pub mod state;
pub mod turn;

pub use backoff::{BackoffPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_CAP_DELAY_MS};
pub use presence::{opponent_status, OpponentStatus, PresenceTracker};
pub use state::{Action, ConnectionEvent, ConnectionState, RetryPolicy, Signal};
pub use turn::{SubmitOutcome, TurnTracker};
