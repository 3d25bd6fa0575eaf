use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use thiserror::Error;
use time::{Date, OffsetDateTime, Time};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::db::Session;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel error: {0}")]
    Channel(String),

    #[error("notification delivery timed out")]
    Timeout,
}

/// Events emitted by the scheduling services. Serialized form uses the
/// lifecycle vocabulary clients already know from the websocket stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    SessionBooked {
        session_id: Uuid,
        practitioner_id: Uuid,
        client_id: Uuid,
        session_date: Date,
        start_time: Time,
    },
    SessionCancelled {
        session_id: Uuid,
        practitioner_id: Uuid,
        client_id: Uuid,
        reason: Option<String>,
    },
    SessionRescheduled {
        session_id: Uuid,
        practitioner_id: Uuid,
        client_id: Uuid,
        session_date: Date,
        start_time: Time,
    },
    SessionReminder {
        session_id: Uuid,
        practitioner_id: Uuid,
        client_id: Uuid,
        session_date: Date,
        start_time: Time,
    },
}

impl SessionEvent {
    pub fn booked(session: &Session) -> Self {
        SessionEvent::SessionBooked {
            session_id: session.id,
            practitioner_id: session.practitioner_id,
            client_id: session.client_id,
            session_date: session.session_date,
            start_time: session.start_time,
        }
    }

    pub fn cancelled(session: &Session) -> Self {
        SessionEvent::SessionCancelled {
            session_id: session.id,
            practitioner_id: session.practitioner_id,
            client_id: session.client_id,
            reason: session.cancellation_reason.clone(),
        }
    }

    pub fn rescheduled(session: &Session) -> Self {
        SessionEvent::SessionRescheduled {
            session_id: session.id,
            practitioner_id: session.practitioner_id,
            client_id: session.client_id,
            session_date: session.session_date,
            start_time: session.start_time,
        }
    }

    pub fn reminder(session: &Session) -> Self {
        SessionEvent::SessionReminder {
            session_id: session.id,
            practitioner_id: session.practitioner_id,
            client_id: session.client_id,
            session_date: session.session_date,
            start_time: session.start_time,
        }
    }
}

/// Envelope placed on the broadcast channel; the websocket fan-out forwards
/// it verbatim and clients filter on `recipient`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub recipient: Uuid,
    pub timestamp: OffsetDateTime,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Fire-and-forget outbound notification sink. Delivery failures are the
/// caller's to log, never to propagate into a state transition.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn publish(&self, recipient: Uuid, event: &SessionEvent) -> Result<(), NotifyError>;
}

/// Publishes onto the process-wide broadcast channel feeding `/ws`.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<String>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl NotificationPort for BroadcastNotifier {
    async fn publish(&self, recipient: Uuid, event: &SessionEvent) -> Result<(), NotifyError> {
        let envelope = NotificationEnvelope {
            recipient,
            timestamp: OffsetDateTime::now_utc(),
            event: event.clone(),
        };
        let payload = serde_json::to_string(&envelope)
            .map_err(|e| NotifyError::Channel(e.to_string()))?;
        // A send error only means nobody is subscribed right now; that is not
        // a delivery failure for a fire-and-forget channel.
        if self.tx.send(payload).is_err() {
            debug!(%recipient, "notification dropped: no websocket subscribers");
        }
        Ok(())
    }
}

/// Log-only sink used when no broadcast channel is wired up.
pub struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn publish(&self, recipient: Uuid, event: &SessionEvent) -> Result<(), NotifyError> {
        debug!(%recipient, ?event, "session notification");
        Ok(())
    }
}

/// Sends an event to both parties of a session. Individual failures are
/// logged; the caller's state transition already happened and stands.
pub async fn publish_to_parties(
    notifier: &dyn NotificationPort,
    session: &Session,
    event: &SessionEvent,
) {
    for recipient in [session.client_id, session.practitioner_id] {
        if let Err(err) = notifier.publish(recipient, event).await {
            warn!(%recipient, session_id = %session.id, %err, "failed to publish session event");
        }
    }
}
