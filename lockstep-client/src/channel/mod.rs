//! Channel transport abstraction for lockstep.
//!
//! This module provides a pluggable transport layer that abstracts the
//! underlying publish/subscribe mechanism (a realtime websocket service,
//! mock for testing).
//!
//! # Design
//!
//! The transport trait is async and channel-oriented:
//! - `open()` binds a channel to a session topic
//! - `subscribe()` requests the subscription; confirmation arrives as a
//!   [`ChannelSignal::Status`]
//! - `announce()` publishes self-presence
//! - `send()` broadcasts encoded event bytes
//! - `recv()` yields the next inbound signal (status, presence, broadcast)
//! - `close()` releases the channel
//!
//! Inbound delivery is a single serialized stream per channel (FIFO from
//! the transport), which is what lets the session process every state
//! transition on one logical event path.

mod mock;

pub use mock::MockChannel;

use async_trait::async_trait;
use thiserror::Error;

use lockstep_types::{ChannelStatus, PlayerId, PresenceEntry, Roster};

/// Transport errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Opening the channel failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No open channel.
    #[error("not connected")]
    NotConnected,

    /// Channel closed.
    #[error("channel closed")]
    Closed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Operation timed out.
    #[error("channel timeout")]
    Timeout,
}

/// One inbound signal from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    /// Subscription status change.
    Status {
        /// The status value.
        status: ChannelStatus,
        /// Error text accompanying `ChannelError` statuses.
        error: Option<String>,
    },
    /// Presence roster snapshot (sync, join, or leave).
    Presence(Roster),
    /// Broadcast payload: encoded [`lockstep_types::GameEvent`] bytes.
    Broadcast(Vec<u8>),
}

/// Transport trait for a session's pub/sub channel.
///
/// Implementations handle the underlying delivery mechanism (realtime
/// websocket service, mock, etc). The session client is the only holder
/// of the channel; protocol code receives routed signals, never the
/// channel itself.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Bind a channel to the given session topic as `self_id`.
    async fn open(&self, topic: &str, self_id: &PlayerId) -> Result<(), ChannelError>;

    /// Request the subscription. Confirmation (or failure) arrives as a
    /// [`ChannelSignal::Status`] on `recv()`.
    async fn subscribe(&self) -> Result<(), ChannelError>;

    /// Publish self-presence on the channel.
    async fn announce(&self, presence: PresenceEntry) -> Result<(), ChannelError>;

    /// Broadcast bytes to all subscribers. Fire-and-forget: at-most-once
    /// delivery, failures are surfaced, never retried here.
    async fn send(&self, data: &[u8]) -> Result<(), ChannelError>;

    /// Receive the next inbound signal. Blocks until one is available or
    /// the channel closes.
    async fn recv(&self) -> Result<ChannelSignal, ChannelError>;

    /// Check if a channel is currently bound.
    fn is_open(&self) -> bool;

    /// Release the channel.
    async fn close(&self) -> Result<(), ChannelError>;
}
