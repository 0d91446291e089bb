//! Consumer side of a subscription.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::services::broker::{SubscriberId, TopicBroker};
use crate::state::notifications::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    /// Cancelled by the consumer or its connection. Terminal.
    Cancelled,
    /// The broker released the channel (shutdown or external unsubscribe). Terminal.
    ClosedByBroker,
}

/// Live cursor over one subscriber channel.
///
/// Yields notifications published after registration until cancelled or
/// closed by the broker. Dropping the session deregisters its channel.
pub struct Session {
    id: SubscriberId,
    topic: Arc<str>,
    receiver: mpsc::UnboundedReceiver<Arc<Notification>>,
    cancel: CancellationToken,
    broker: TopicBroker,
    closed: bool,
}

impl Session {
    pub(crate) fn new(
        id: SubscriberId,
        topic: &str,
        receiver: mpsc::UnboundedReceiver<Arc<Notification>>,
        broker: TopicBroker,
    ) -> Self {
        Self {
            id,
            topic: Arc::from(topic),
            receiver,
            cancel: CancellationToken::new(),
            broker,
            closed: false,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn state(&self) -> SessionState {
        if self.closed {
            SessionState::ClosedByBroker
        } else if self.cancel.is_cancelled() {
            SessionState::Cancelled
        } else {
            SessionState::Active
        }
    }

    /// Wait for the next notification. `None` means end of stream.
    ///
    /// Cancellation wins over queued events: once `cancel` has been called,
    /// this resolves to `None` even if items are still buffered.
    pub async fn next(&mut self) -> Option<Arc<Notification>> {
        if self.state() != SessionState::Active {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.receiver.recv() => match event {
                Some(event) => Some(event),
                None => {
                    self.mark_closed();
                    None
                }
            },
        }
    }

    /// Non-suspending variant of `next`: returns a queued notification if any.
    pub fn try_next(&mut self) -> Option<Arc<Notification>> {
        if self.state() != SessionState::Active {
            return None;
        }

        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.mark_closed();
                None
            }
        }
    }

    /// End the session and release its channel. Idempotent.
    pub fn cancel(&self) {
        self.canceller().cancel();
    }

    /// Handle that cancels this session from another task.
    pub fn canceller(&self) -> SessionCanceller {
        SessionCanceller {
            id: self.id,
            topic: self.topic.clone(),
            cancel: self.cancel.clone(),
            broker: self.broker.clone(),
        }
    }

    /// Adapt the session into a stream that ends with the session.
    pub fn into_stream(self) -> impl Stream<Item = Arc<Notification>> + Send {
        futures::stream::unfold(self, |mut session| async move {
            session.next().await.map(|event| (event, session))
        })
    }

    fn mark_closed(&mut self) {
        if !self.cancel.is_cancelled() {
            self.closed = true;
            debug!(topic = %self.topic, subscriber = %self.id, "session closed by broker");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.broker.unsubscribe(&self.topic, self.id);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("state", &self.state())
            .finish()
    }
}

/// Cloneable, `Send` handle that cancels one session.
#[derive(Clone)]
pub struct SessionCanceller {
    id: SubscriberId,
    topic: Arc<str>,
    cancel: CancellationToken,
    broker: TopicBroker,
}

impl SessionCanceller {
    pub fn cancel(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.broker.unsubscribe(&self.topic, self.id);
        debug!(topic = %self.topic, subscriber = %self.id, "session cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
