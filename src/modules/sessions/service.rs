use std::sync::Arc;

use dashmap::DashMap;
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime, Time};
use tokio::sync::Mutex;
use tracing::info;

use crate::db::{
    add_minutes, AvailabilityStore, AvailabilityWindow, BookSession, CancelSession,
    RescheduleSession, Session, SessionStatus, SessionStore, SessionType, PaymentStatus, Weekday,
};
use crate::error::ScheduleError;
use crate::notifications::{publish_to_parties, NotificationPort, SessionEvent};

/// Booking, rescheduling, cancellation and slot generation.
///
/// The overlap check and the following insert are the one correctness-critical
/// region: they run under a per-practitioner async mutex so two concurrent
/// requests for the same practitioner can never both pass the check.
pub struct SessionService {
    sessions: Arc<dyn SessionStore>,
    availability: Arc<dyn AvailabilityStore>,
    notifier: Arc<dyn NotificationPort>,
    practitioner_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        availability: Arc<dyn AvailabilityStore>,
        notifier: Arc<dyn NotificationPort>,
    ) -> Self {
        Self {
            sessions,
            availability,
            notifier,
            practitioner_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, practitioner_id: Uuid) -> Arc<Mutex<()>> {
        self.practitioner_locks
            .entry(practitioner_id)
            .or_default()
            .value()
            .clone()
    }

    async fn active_window(
        &self,
        practitioner_id: Uuid,
        date: Date,
    ) -> Result<Option<AvailabilityWindow>, ScheduleError> {
        let weekday = Weekday::from(date.weekday());
        let window = self
            .availability
            .window_for_day(practitioner_id, weekday)
            .await?;
        Ok(window.filter(|w| w.is_available))
    }

    // ================= BOOK =================
    pub async fn book(&self, payload: BookSession) -> Result<Session, ScheduleError> {
        let window = self
            .active_window(payload.practitioner_id, payload.session_date)
            .await?
            .ok_or(ScheduleError::ProviderUnavailable)?;

        let duration = window.slot_duration_minutes;
        let end_time = add_minutes(payload.start_time, duration as u32)
            .ok_or(ScheduleError::OutsideWorkingHours)?;

        if payload.start_time < window.start_time || end_time > window.end_time {
            return Err(ScheduleError::OutsideWorkingHours);
        }

        let lock = self.lock_for(payload.practitioner_id);
        let session = {
            let _guard = lock.lock().await;

            let booked = self
                .sessions
                .booked_on_date(payload.practitioner_id, payload.session_date)
                .await?;
            if booked.iter().any(|s| s.overlaps(payload.start_time, end_time)) {
                return Err(ScheduleError::SlotConflict);
            }

            let session_type = payload.session_type.unwrap_or(SessionType::Online);
            let now = OffsetDateTime::now_utc();
            let session = Session {
                id: Uuid::new_v4(),
                practitioner_id: payload.practitioner_id,
                client_id: payload.client_id,
                session_date: payload.session_date,
                start_time: payload.start_time,
                end_time,
                duration_minutes: duration,
                session_type,
                meeting_token: meeting_token_for(session_type),
                status: SessionStatus::Booked,
                payment_status: PaymentStatus::Pending,
                notes: payload.notes,
                cancellation_reason: None,
                cancelled_by: None,
                reminder_sent: false,
                one_hour_reminder_sent: false,
                created_at: now,
                updated_at: now,
            };
            self.sessions.insert(session).await?
        };

        info!(
            session_id = %session.id,
            practitioner_id = %session.practitioner_id,
            date = %session.session_date,
            "session booked"
        );
        publish_to_parties(self.notifier.as_ref(), &session, &SessionEvent::booked(&session)).await;

        Ok(session)
    }

    // ================= RESCHEDULE =================
    pub async fn reschedule(
        &self,
        session_id: Uuid,
        payload: RescheduleSession,
    ) -> Result<Session, ScheduleError> {
        let session = self
            .sessions
            .find(session_id)
            .await?
            .ok_or(ScheduleError::NotFound(session_id))?;

        let lock = self.lock_for(session.practitioner_id);
        let replacement = {
            let _guard = lock.lock().await;

            // Re-read under the lock: the status may have changed since the
            // unguarded load above.
            let session = self
                .sessions
                .find(session_id)
                .await?
                .ok_or(ScheduleError::NotFound(session_id))?;
            if session.status != SessionStatus::Booked {
                return Err(ScheduleError::InvalidStateTransition(session.status));
            }

            let new_end = add_minutes(payload.new_start_time, session.duration_minutes as u32)
                .ok_or(ScheduleError::OutsideWorkingHours)?;

            let booked = self
                .sessions
                .booked_on_date(session.practitioner_id, payload.new_session_date)
                .await?;
            if booked
                .iter()
                .any(|s| s.id != session.id && s.overlaps(payload.new_start_time, new_end))
            {
                return Err(ScheduleError::SlotConflict);
            }

            let now = OffsetDateTime::now_utc();
            let mut retired = session.clone();
            retired.status = SessionStatus::Rescheduled;
            retired.cancellation_reason = Some(payload.reason);
            retired.updated_at = now;

            let replacement = Session {
                id: Uuid::new_v4(),
                session_date: payload.new_session_date,
                start_time: payload.new_start_time,
                end_time: new_end,
                meeting_token: meeting_token_for(session.session_type),
                status: SessionStatus::Booked,
                cancellation_reason: None,
                cancelled_by: None,
                reminder_sent: false,
                one_hour_reminder_sent: false,
                created_at: now,
                updated_at: now,
                ..session
            };

            self.sessions.retire_and_replace(retired, replacement).await?
        };

        info!(
            old_session_id = %session_id,
            new_session_id = %replacement.id,
            date = %replacement.session_date,
            "session rescheduled"
        );
        publish_to_parties(
            self.notifier.as_ref(),
            &replacement,
            &SessionEvent::rescheduled(&replacement),
        )
        .await;

        Ok(replacement)
    }

    // ================= CANCEL =================
    pub async fn cancel(
        &self,
        session_id: Uuid,
        payload: CancelSession,
    ) -> Result<Session, ScheduleError> {
        let session = self
            .sessions
            .find(session_id)
            .await?
            .ok_or(ScheduleError::NotFound(session_id))?;

        let lock = self.lock_for(session.practitioner_id);
        let session = {
            let _guard = lock.lock().await;

            let mut session = self
                .sessions
                .find(session_id)
                .await?
                .ok_or(ScheduleError::NotFound(session_id))?;
            if !session.status.can_transition_to(SessionStatus::Cancelled) {
                return Err(ScheduleError::InvalidStateTransition(session.status));
            }

            session.status = SessionStatus::Cancelled;
            session.cancellation_reason = Some(payload.reason);
            session.cancelled_by = Some(payload.cancelled_by);
            session.updated_at = OffsetDateTime::now_utc();
            self.sessions.update(&session).await?;
            session
        };

        info!(session_id = %session.id, cancelled_by = ?session.cancelled_by, "session cancelled");
        publish_to_parties(
            self.notifier.as_ref(),
            &session,
            &SessionEvent::cancelled(&session),
        )
        .await;

        Ok(session)
    }

    // ================= SLOTS =================
    /// Free slot start times for one practitioner and date, ascending. A
    /// practitioner without an active window that day yields an empty list.
    pub async fn available_slots(
        &self,
        practitioner_id: Uuid,
        date: Date,
    ) -> Result<Vec<Time>, ScheduleError> {
        let Some(window) = self.active_window(practitioner_id, date).await? else {
            return Ok(Vec::new());
        };
        let booked = self.sessions.booked_on_date(practitioner_id, date).await?;
        Ok(free_slots(&window, &booked))
    }

    // ================= LISTINGS =================
    pub async fn sessions_for_practitioner(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Vec<Session>, ScheduleError> {
        Ok(self.sessions.sessions_for_practitioner(practitioner_id).await?)
    }

    pub async fn sessions_for_client(&self, client_id: Uuid) -> Result<Vec<Session>, ScheduleError> {
        Ok(self.sessions.sessions_for_client(client_id).await?)
    }
}

fn meeting_token_for(session_type: SessionType) -> Option<Uuid> {
    match session_type {
        SessionType::Online => Some(Uuid::new_v4()),
        SessionType::InPerson => None,
    }
}

/// Walks the window in whole slot steps, dropping any slot that intersects a
/// booked interval. No partial trailing slot is emitted.
fn free_slots(window: &AvailabilityWindow, booked: &[Session]) -> Vec<Time> {
    let mut slots = Vec::new();
    let mut current = window.start_time;
    while let Some(slot_end) = add_minutes(current, window.slot_duration_minutes as u32) {
        if slot_end > window.end_time {
            break;
        }
        let taken = booked.iter().any(|s| s.overlaps(current, slot_end));
        if !taken {
            slots.push(current);
        }
        current = slot_end;
    }
    slots
}
