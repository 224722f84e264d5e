//! # lockstep-client
//!
//! Realtime session client for the lockstep turn synchronization protocol.
//!
//! This crate hosts everything with side effects: the channel transport
//! abstraction, the session client that interprets the pure state machines
//! from `lockstep-core`, the typed event broadcaster, and the game state
//! store seam.
//!
//! ## Quick start
//!
//! ```no_run
//! use lockstep_client::{MemoryStore, SessionClient, SessionConfig};
//! use lockstep_client::{GameRecord, GameStatus, MockChannel};
//! use lockstep_types::{GameId, PlayerId};
//!
//! # async fn demo() {
//! let record = GameRecord {
//!     game_id: GameId::new(),
//!     player1: PlayerId::from("alice"),
//!     player2: PlayerId::from("bob"),
//!     status: GameStatus::Active,
//! };
//! let store = MemoryStore::new(record.clone());
//! let (client, mut events) = SessionClient::new(
//!     SessionConfig::default(),
//!     record,
//!     PlayerId::from("alice"),
//!     MockChannel::new(),
//!     store,
//! );
//!
//! client.open().await;
//! tokio::spawn({
//!     let client = client.clone();
//!     async move { client.run().await }
//! });
//!
//! while let Some(event) = events.recv().await {
//!     println!("session event: {event:?}");
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod broadcast;
pub mod channel;
pub mod session;
pub mod store;

pub use broadcast::{BroadcastError, EventBroadcaster};
pub use channel::{ChannelError, ChannelSignal, ChannelTransport, MockChannel};
pub use session::{
    ConnectionInfo, SessionClient, SessionConfig, SessionError, SessionEvent,
};
pub use store::{GameRecord, GameStateStore, GameStatus, MemoryStore, Resolution, StoreError};
