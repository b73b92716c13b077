//! Session event types, envelope, and event bus.
//!
//! The session store publishes identity transitions here and the notes store
//! subscribes to them, so neither container holds a reference to the other.
//! Envelopes carry a UUIDv7 id and a timestamp so subscribers can order and
//! de-duplicate what they receive.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events published by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// The signed-in identity changed. `None` means signed out.
    IdentityChanged { user_id: Option<String> },
    /// The cached profile was replaced (sign-in or profile edit).
    ProfileUpdated { user_id: String },
    /// The account and its data were removed.
    AccountDeleted { user_id: String },
}

impl SessionEvent {
    /// Dot-namespaced event type, e.g. `"session.identity_changed"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::IdentityChanged { .. } => "session.identity_changed",
            SessionEvent::ProfileUpdated { .. } => "session.profile_updated",
            SessionEvent::AccountDeleted { .. } => "session.account_deleted",
        }
    }

    /// User the event is about, if any.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionEvent::IdentityChanged { user_id } => user_id.as_deref(),
            SessionEvent::ProfileUpdated { user_id } | SessionEvent::AccountDeleted { user_id } => {
                Some(user_id)
            }
        }
    }
}

/// Envelope wrapping every event on the bus.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// UUIDv7, so ids sort by emission time.
    pub event_id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: SessionEvent,
}

impl EventEnvelope {
    pub fn new(event: SessionEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            occurred_at: Utc::now(),
            payload: event,
        }
    }
}

/// Broadcast bus shared by the state containers.
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    ///
    /// Recommended: 64 for the app, 16 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: SessionEvent) {
        let envelope = EventEnvelope::new(event);
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count,
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive enveloped events. Each subscriber gets its own independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
