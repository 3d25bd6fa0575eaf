use std::sync::Arc;

use async_trait::async_trait;
use time::macros::time;
use time::{Date, OffsetDateTime, Time};
use tokio::sync::Mutex;
use uuid::Uuid;

use mindwell_backend::db::{
    MemoryStore, PaymentStatus, Session, SessionStatus, SessionType, UpsertAvailability, Weekday,
};
use mindwell_backend::modules::availability::service::AvailabilityService;
use mindwell_backend::modules::sessions::service::SessionService;
use mindwell_backend::notifications::{NotificationPort, NotifyError, SessionEvent};

/// Test double recording every published event.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<(Uuid, SessionEvent)>>,
}

impl RecordingNotifier {
    pub async fn count(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn events_for(&self, recipient: Uuid) -> Vec<SessionEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|(r, _)| *r == recipient)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn publish(&self, recipient: Uuid, event: &SessionEvent) -> Result<(), NotifyError> {
        self.events.lock().await.push((recipient, event.clone()));
        Ok(())
    }
}

/// Test double that refuses every delivery.
pub struct FailingNotifier;

#[async_trait]
impl NotificationPort for FailingNotifier {
    async fn publish(&self, _recipient: Uuid, _event: &SessionEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Channel("sink unavailable".to_string()))
    }
}

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub availability: AvailabilityService,
    pub sessions: Arc<SessionService>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness() -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let sessions = Arc::new(SessionService::new(
        store.clone(),
        store.clone(),
        notifier.clone(),
    ));
    let availability = AvailabilityService::new(store.clone());
    TestHarness {
        store,
        availability,
        sessions,
        notifier,
    }
}

/// 09:00-17:00 Monday window with 30-minute slots.
pub async fn monday_window(harness: &TestHarness, practitioner_id: Uuid) {
    harness
        .availability
        .set_window(
            practitioner_id,
            UpsertAvailability {
                weekday: Weekday::Monday,
                start_time: time!(09:00),
                end_time: time!(17:00),
                slot_duration_minutes: Some(30),
                is_available: Some(true),
            },
        )
        .await
        .expect("window upsert");
}

/// Bare BOOKED session record for store-level setups.
pub fn booked_session(practitioner_id: Uuid, date: Date, start: Time, end: Time) -> Session {
    let now = OffsetDateTime::now_utc();
    Session {
        id: Uuid::new_v4(),
        practitioner_id,
        client_id: Uuid::new_v4(),
        session_date: date,
        start_time: start,
        end_time: end,
        duration_minutes: 30,
        session_type: SessionType::Online,
        meeting_token: Some(Uuid::new_v4()),
        status: SessionStatus::Booked,
        payment_status: PaymentStatus::Pending,
        notes: None,
        cancellation_reason: None,
        cancelled_by: None,
        reminder_sent: false,
        one_hour_reminder_sent: false,
        created_at: now,
        updated_at: now,
    }
}
