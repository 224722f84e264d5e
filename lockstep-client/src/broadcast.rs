//! Typed event broadcasting on the session channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use lockstep_types::{GameEvent, WireError};

use crate::channel::{ChannelError, ChannelTransport};

/// Broadcast errors, surfaced to the caller per emit.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// No confirmed subscription; the emit was not attempted.
    #[error("not connected")]
    NotConnected,

    /// The event failed to encode.
    #[error("encode failed: {0}")]
    Encode(#[from] WireError),

    /// The transport rejected the send.
    #[error("send failed: {0}")]
    Send(#[from] ChannelError),
}

/// Serializes typed events and emits them on the session channel.
///
/// Fire-and-forget with error surfacing: no implicit retry, no queueing.
/// At-most-once delivery per call; reliability lives in the idempotent
/// receive path, not in resend logic (resending a stale turn payload
/// could be unsafe, so retry is the caller's decision).
pub struct EventBroadcaster<C: ChannelTransport> {
    channel: Arc<C>,
    connected: Arc<AtomicBool>,
}

impl<C: ChannelTransport> EventBroadcaster<C> {
    /// Create a broadcaster over the channel, gated by the shared
    /// connected flag maintained by the session.
    pub fn new(channel: Arc<C>, connected: Arc<AtomicBool>) -> Self {
        Self { channel, connected }
    }

    /// Emit one typed event.
    pub async fn emit(&self, event: &GameEvent) -> Result<(), BroadcastError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BroadcastError::NotConnected);
        }

        let bytes = event.to_bytes()?;
        debug!(len = bytes.len(), "broadcasting event");
        self.channel.send(&bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;
    use lockstep_types::{GameEvent, PlayerAction, PlayerId};

    fn event() -> GameEvent {
        GameEvent::PlayerAction(PlayerAction {
            player: PlayerId::from("p1"),
            action: vec![1],
        })
    }

    fn broadcaster(connected: bool) -> (EventBroadcaster<MockChannel>, MockChannel) {
        let channel = MockChannel::new();
        let gate = Arc::new(AtomicBool::new(connected));
        (
            EventBroadcaster::new(Arc::new(channel.clone()), gate),
            channel,
        )
    }

    #[tokio::test]
    async fn emit_requires_connection() {
        let (broadcaster, channel) = broadcaster(false);

        let result = broadcaster.emit(&event()).await;

        assert!(matches!(result, Err(BroadcastError::NotConnected)));
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn emit_sends_encoded_event() {
        let (broadcaster, channel) = broadcaster(true);
        channel.open("t", &PlayerId::from("p1")).await.unwrap();

        broadcaster.emit(&event()).await.unwrap();

        let sent = channel.sent_events();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], event());
    }

    #[tokio::test]
    async fn send_failure_is_surfaced_not_retried() {
        let (broadcaster, channel) = broadcaster(true);
        channel.open("t", &PlayerId::from("p1")).await.unwrap();
        channel.fail_next_send("buffer full");

        let result = broadcaster.emit(&event()).await;

        assert!(matches!(result, Err(BroadcastError::Send(_))));
        // One attempt only
        assert!(channel.sent().is_empty());
    }
}
