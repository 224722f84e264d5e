//! # lockstep-types
//!
//! Wire format types for the lockstep turn synchronization protocol.
//!
//! This crate provides the foundational types used across all lockstep crates:
//! - [`GameId`], [`PlayerId`], [`Round`] - Identity and ordering types
//! - [`GameEvent`] - Broadcast events on the session channel
//! - [`Roster`], [`PresenceEntry`], [`ChannelStatus`] - Presence and transport signals
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod ids;
mod presence;

pub use error::WireError;
pub use events::{
    BoardSnapshot, GameEnded, GameEvent, PlayerAction, StateUpdate, TurnResolved, TurnSubmitted,
};
pub use ids::{GameId, PlayerId, Round};
pub use presence::{ChannelStatus, PresenceEntry, Roster};
