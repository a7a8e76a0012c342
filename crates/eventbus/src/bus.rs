//! Broadcast event bus.
//!
//! Uses [`tokio::sync::broadcast`] for fan-out delivery to multiple subscribers.
//! Emission never blocks and never fails; with no subscribers the event is
//! dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_core::Stream;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// Broadcast-based event bus, generic over the event type.
///
/// # Examples
///
/// ```
/// use formguard_eventbus::EventBus;
///
/// let bus: EventBus<String> = EventBus::new(64);
/// let mut sub = bus.subscribe();
///
/// bus.emit("field validated".to_owned());
///
/// assert_eq!(sub.try_recv().as_deref(), Some("field validated"));
/// assert_eq!(bus.total_emitted(), 1);
/// ```
pub struct EventBus<E> {
    sender: broadcast::Sender<E>,
    emitted: AtomicU64,
}

impl<E: Clone> EventBus<E> {
    /// Create a new event bus with the given channel capacity.
    ///
    /// When the channel is full, the oldest events are dropped for lagging
    /// subscribers.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            emitted: AtomicU64::new(0),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: E) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        // No active receivers is not an error.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> EventSubscriber<E> {
        EventSubscriber {
            receiver: self.sender.subscribe(),
            lagged: 0,
        }
    }

    /// Total number of events emitted since creation.
    #[must_use]
    pub fn total_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("emitted", &self.emitted.load(Ordering::Relaxed))
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

/// Subscription handle for receiving events from an [`EventBus`].
pub struct EventSubscriber<E> {
    receiver: broadcast::Receiver<E>,
    lagged: u64,
}

impl<E: Clone> EventSubscriber<E> {
    /// Receive the next event, waiting asynchronously.
    ///
    /// Returns `None` once the bus has been dropped and every buffered
    /// event has been delivered.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without waiting.
    pub fn try_recv(&mut self) -> Option<E> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(_) => return None,
            }
        }
    }

    /// Drain every event that is immediately available.
    pub fn drain(&mut self) -> Vec<E> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Number of events this subscriber missed because it fell behind.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    /// Convert the subscription into a [`Stream`], skipping lagged gaps.
    pub fn into_stream(self) -> impl Stream<Item = E> + Send
    where
        E: Send + 'static,
    {
        BroadcastStream::new(self.receiver).filter_map(Result::ok)
    }

    fn note_lag(&mut self, skipped: u64) {
        self.lagged += skipped;
        tracing::debug!(skipped, total = self.lagged, "event subscriber lagged");
    }
}

impl<E> fmt::Debug for EventSubscriber<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscriber")
            .field("lagged", &self.lagged)
            .finish_non_exhaustive()
    }
}
