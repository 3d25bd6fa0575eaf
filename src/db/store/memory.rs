use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime, Time};
use tokio::sync::RwLock;

use crate::db::error::StoreError;
use crate::db::models::{
    AvailabilityWindow, NewAvailabilityWindow, ReminderClass, Session, SessionStatus, Weekday,
};
use crate::db::store::{AvailabilityStore, SessionStore};

/// HashMap-backed store used by the test suite and as the dev backend when no
/// DATABASE_URL is configured.
#[derive(Default)]
pub struct MemoryStore {
    windows: RwLock<HashMap<(Uuid, Weekday), AvailabilityWindow>>,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityStore for MemoryStore {
    async fn upsert_window(
        &self,
        window: NewAvailabilityWindow,
    ) -> Result<AvailabilityWindow, StoreError> {
        let mut windows = self.windows.write().await;
        let key = (window.practitioner_id, window.weekday);
        let now = OffsetDateTime::now_utc();

        let row = match windows.get(&key) {
            Some(existing) => AvailabilityWindow {
                id: existing.id,
                created_at: existing.created_at,
                practitioner_id: window.practitioner_id,
                weekday: window.weekday,
                start_time: window.start_time,
                end_time: window.end_time,
                slot_duration_minutes: window.slot_duration_minutes,
                is_available: window.is_available,
                updated_at: now,
            },
            None => AvailabilityWindow {
                id: Uuid::new_v4(),
                practitioner_id: window.practitioner_id,
                weekday: window.weekday,
                start_time: window.start_time,
                end_time: window.end_time,
                slot_duration_minutes: window.slot_duration_minutes,
                is_available: window.is_available,
                created_at: now,
                updated_at: now,
            },
        };

        windows.insert(key, row.clone());
        Ok(row)
    }

    async fn window_for_day(
        &self,
        practitioner_id: Uuid,
        weekday: Weekday,
    ) -> Result<Option<AvailabilityWindow>, StoreError> {
        let windows = self.windows.read().await;
        Ok(windows.get(&(practitioner_id, weekday)).cloned())
    }

    async fn windows_for_practitioner(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, StoreError> {
        let windows = self.windows.read().await;
        Ok(windows
            .values()
            .filter(|w| w.practitioner_id == practitioner_id)
            .cloned()
            .collect())
    }
}

fn by_date_then_start(a: &Session, b: &Session) -> std::cmp::Ordering {
    a.session_date
        .cmp(&b.session_date)
        .then(a.start_time.cmp(&b.start_time))
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: Session) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).cloned())
    }

    async fn booked_on_date(
        &self,
        practitioner_id: Uuid,
        date: Date,
    ) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| {
                s.practitioner_id == practitioner_id
                    && s.session_date == date
                    && s.status == SessionStatus::Booked
            })
            .cloned()
            .collect())
    }

    async fn sessions_for_practitioner(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut out: Vec<Session> = sessions
            .values()
            .filter(|s| s.practitioner_id == practitioner_id)
            .cloned()
            .collect();
        out.sort_by(by_date_then_start);
        Ok(out)
    }

    async fn sessions_for_client(&self, client_id: Uuid) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut out: Vec<Session> = sessions
            .values()
            .filter(|s| s.client_id == client_id)
            .cloned()
            .collect();
        out.sort_by(by_date_then_start);
        Ok(out)
    }

    async fn update(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session.id) {
            return Err(StoreError::NotFound);
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn retire_and_replace(
        &self,
        retired: Session,
        replacement: Session,
    ) -> Result<Session, StoreError> {
        // Single write lock makes the pair visible in one step.
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&retired.id) {
            return Err(StoreError::NotFound);
        }
        sessions.insert(retired.id, retired);
        sessions.insert(replacement.id, replacement.clone());
        Ok(replacement)
    }

    async fn due_for_reminder(
        &self,
        date: Date,
        from: Time,
        to: Time,
        class: ReminderClass,
    ) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| {
                s.status == SessionStatus::Booked
                    && !s.reminder_sent_for(class)
                    && s.session_date == date
                    && s.start_time >= from
                    && s.start_time <= to
            })
            .cloned()
            .collect())
    }

    async fn mark_reminder_sent(&self, id: Uuid, class: ReminderClass) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        match class {
            ReminderClass::FifteenMinute => session.reminder_sent = true,
            ReminderClass::OneHour => session.one_hour_reminder_sent = true,
        }
        session.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{PaymentStatus, SessionType};
    use time::macros::{date, time};

    fn window(practitioner_id: Uuid) -> NewAvailabilityWindow {
        NewAvailabilityWindow {
            practitioner_id,
            weekday: Weekday::Monday,
            start_time: time!(09:00),
            end_time: time!(17:00),
            slot_duration_minutes: 60,
            is_available: true,
        }
    }

    fn session(practitioner_id: Uuid, date: Date, start: Time, end: Time) -> Session {
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

    #[tokio::test]
    async fn upsert_replaces_rather_than_duplicates() {
        let store = MemoryStore::new();
        let practitioner = Uuid::new_v4();

        let first = store.upsert_window(window(practitioner)).await.unwrap();
        let mut changed = window(practitioner);
        changed.end_time = time!(12:00);
        changed.is_available = false;
        let second = store.upsert_window(changed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.end_time, time!(12:00));
        assert!(!second.is_available);

        let all = store.windows_for_practitioner(practitioner).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn booked_on_date_ignores_retired_sessions() {
        let store = MemoryStore::new();
        let practitioner = Uuid::new_v4();
        let day = date!(2026 - 03 - 02);

        let live = session(practitioner, day, time!(09:00), time!(09:30));
        let mut cancelled = session(practitioner, day, time!(10:00), time!(10:30));
        cancelled.status = SessionStatus::Cancelled;
        store.insert(live.clone()).await.unwrap();
        store.insert(cancelled).await.unwrap();

        let booked = store.booked_on_date(practitioner, day).await.unwrap();
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].id, live.id);
    }

    #[tokio::test]
    async fn due_for_reminder_respects_window_and_flag() {
        let store = MemoryStore::new();
        let practitioner = Uuid::new_v4();
        let day = date!(2026 - 03 - 02);

        let inside = session(practitioner, day, time!(09:10), time!(09:40));
        let outside = session(practitioner, day, time!(11:00), time!(11:30));
        let mut already_sent = session(practitioner, day, time!(09:05), time!(09:35));
        already_sent.reminder_sent = true;
        store.insert(inside.clone()).await.unwrap();
        store.insert(outside).await.unwrap();
        store.insert(already_sent).await.unwrap();

        let due = store
            .due_for_reminder(day, time!(09:00), time!(09:15), ReminderClass::FifteenMinute)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, inside.id);

        store
            .mark_reminder_sent(inside.id, ReminderClass::FifteenMinute)
            .await
            .unwrap();
        let due = store
            .due_for_reminder(day, time!(09:00), time!(09:15), ReminderClass::FifteenMinute)
            .await
            .unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn retire_and_replace_writes_both_records() {
        let store = MemoryStore::new();
        let practitioner = Uuid::new_v4();
        let day = date!(2026 - 03 - 02);

        let mut old = session(practitioner, day, time!(09:00), time!(09:30));
        store.insert(old.clone()).await.unwrap();

        let new = session(practitioner, day, time!(14:00), time!(14:30));
        old.status = SessionStatus::Rescheduled;
        let replacement = store.retire_and_replace(old.clone(), new.clone()).await.unwrap();

        assert_eq!(replacement.id, new.id);
        let stored_old = store.find(old.id).await.unwrap().unwrap();
        assert_eq!(stored_old.status, SessionStatus::Rescheduled);
        let stored_new = store.find(new.id).await.unwrap().unwrap();
        assert_eq!(stored_new.status, SessionStatus::Booked);
    }
}
