//! Mock channel for testing.
//!
//! Allows queueing inbound signals and capturing sent broadcasts for
//! verification.

use super::{ChannelError, ChannelSignal, ChannelTransport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lockstep_types::{GameEvent, PlayerId, PresenceEntry};

/// Mock channel for testing.
///
/// Allows queueing inbound signals and capturing sent broadcasts for
/// verification.
#[derive(Debug, Default)]
pub struct MockChannel {
    inner: Arc<Mutex<MockChannelInner>>,
}

#[derive(Debug, Default)]
struct MockChannelInner {
    open: bool,
    topic: Option<String>,
    self_id: Option<PlayerId>,
    subscribe_requests: u32,
    announced: Vec<PresenceEntry>,
    sent: Vec<Vec<u8>>,
    signal_queue: VecDeque<ChannelSignal>,
    fail_next_open: Option<String>,
    fail_next_subscribe: Option<String>,
    fail_next_send: Option<String>,
}

impl MockChannel {
    /// Create a new mock channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a signal to be returned by the next `recv()` call.
    pub fn queue_signal(&self, signal: ChannelSignal) {
        let mut inner = self.inner.lock().unwrap();
        inner.signal_queue.push_back(signal);
    }

    /// Get all broadcast payloads that were sent.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.sent.clone()
    }

    /// Decode every sent broadcast as a [`GameEvent`].
    pub fn sent_events(&self) -> Vec<GameEvent> {
        self.sent()
            .iter()
            .filter_map(|bytes| GameEvent::from_bytes(bytes).ok())
            .collect()
    }

    /// Get the topic that was opened.
    pub fn opened_topic(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.topic.clone()
    }

    /// Get every presence announcement that was published.
    pub fn announced(&self) -> Vec<PresenceEntry> {
        let inner = self.inner.lock().unwrap();
        inner.announced.clone()
    }

    /// How many times `subscribe()` was requested.
    pub fn subscribe_requests(&self) -> u32 {
        let inner = self.inner.lock().unwrap();
        inner.subscribe_requests
    }

    /// Cause the next open() to fail with the given error.
    pub fn fail_next_open(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_open = Some(error.to_string());
    }

    /// Cause the next subscribe() to fail with the given error.
    pub fn fail_next_subscribe(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_subscribe = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Clear all state (sends, queue, binding).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockChannelInner::default();
    }
}

impl Clone for MockChannel {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl ChannelTransport for MockChannel {
    async fn open(&self, topic: &str, self_id: &PlayerId) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_open.take() {
            return Err(ChannelError::ConnectionFailed(error));
        }

        inner.open = true;
        inner.topic = Some(topic.to_string());
        inner.self_id = Some(self_id.clone());
        Ok(())
    }

    async fn subscribe(&self) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.open {
            return Err(ChannelError::NotConnected);
        }
        if let Some(error) = inner.fail_next_subscribe.take() {
            return Err(ChannelError::ConnectionFailed(error));
        }

        inner.subscribe_requests += 1;
        Ok(())
    }

    async fn announce(&self, presence: PresenceEntry) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.open {
            return Err(ChannelError::NotConnected);
        }

        inner.announced.push(presence);
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.open {
            return Err(ChannelError::NotConnected);
        }
        if let Some(error) = inner.fail_next_send.take() {
            return Err(ChannelError::SendFailed(error));
        }

        inner.sent.push(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<ChannelSignal, ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.open {
            return Err(ChannelError::NotConnected);
        }

        inner.signal_queue.pop_front().ok_or(ChannelError::Closed)
    }

    fn is_open(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.open
    }

    async fn close(&self) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        inner.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_types::{ChannelStatus, Roster};

    #[tokio::test]
    async fn mock_channel_opens_with_topic_and_identity() {
        let channel = MockChannel::new();
        assert!(!channel.is_open());

        channel
            .open("game:abc", &PlayerId::from("p1"))
            .await
            .unwrap();

        assert!(channel.is_open());
        assert_eq!(channel.opened_topic(), Some("game:abc".to_string()));
    }

    #[tokio::test]
    async fn mock_channel_records_sent_broadcasts() {
        let channel = MockChannel::new();
        channel.open("t", &PlayerId::from("p1")).await.unwrap();

        channel.send(b"one").await.unwrap();
        channel.send(b"two").await.unwrap();

        let sent = channel.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], b"one");
        assert_eq!(sent[1], b"two");
    }

    #[tokio::test]
    async fn mock_channel_yields_queued_signals_in_order() {
        let channel = MockChannel::new();
        channel.open("t", &PlayerId::from("p1")).await.unwrap();

        channel.queue_signal(ChannelSignal::Status {
            status: ChannelStatus::Subscribed,
            error: None,
        });
        channel.queue_signal(ChannelSignal::Presence(Roster::empty()));

        assert!(matches!(
            channel.recv().await.unwrap(),
            ChannelSignal::Status { .. }
        ));
        assert!(matches!(
            channel.recv().await.unwrap(),
            ChannelSignal::Presence(_)
        ));
    }

    #[tokio::test]
    async fn recv_on_empty_queue_reports_closed() {
        let channel = MockChannel::new();
        channel.open("t", &PlayerId::from("p1")).await.unwrap();

        assert!(matches!(channel.recv().await, Err(ChannelError::Closed)));
    }

    #[tokio::test]
    async fn operations_without_open_fail() {
        let channel = MockChannel::new();

        assert!(matches!(
            channel.send(b"x").await,
            Err(ChannelError::NotConnected)
        ));
        assert!(matches!(
            channel.subscribe().await,
            Err(ChannelError::NotConnected)
        ));
        assert!(matches!(channel.recv().await, Err(ChannelError::NotConnected)));
    }

    #[tokio::test]
    async fn forced_failures_trip_once() {
        let channel = MockChannel::new();
        channel.fail_next_open("unreachable");
        assert!(matches!(
            channel.open("t", &PlayerId::from("p1")).await,
            Err(ChannelError::ConnectionFailed(_))
        ));

        channel.open("t", &PlayerId::from("p1")).await.unwrap();

        channel.fail_next_send("buffer full");
        assert!(matches!(
            channel.send(b"x").await,
            Err(ChannelError::SendFailed(_))
        ));
        channel.send(b"x").await.unwrap();
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let channel = MockChannel::new();
        let other = channel.clone();

        channel.open("t", &PlayerId::from("p1")).await.unwrap();
        assert!(other.is_open());

        channel.send(b"a").await.unwrap();
        other.send(b"b").await.unwrap();
        assert_eq!(channel.sent().len(), 2);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let channel = MockChannel::new();
        channel.open("t", &PlayerId::from("p1")).await.unwrap();
        channel.send(b"x").await.unwrap();
        channel.queue_signal(ChannelSignal::Broadcast(vec![1]));

        channel.reset();

        assert!(!channel.is_open());
        assert!(channel.sent().is_empty());
        assert!(channel.opened_topic().is_none());
    }
}
