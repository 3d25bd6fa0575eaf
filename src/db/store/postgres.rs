use async_trait::async_trait;
use sqlx::types::Uuid;
use sqlx::PgPool;
use time::{Date, Time};

use crate::db::error::StoreError;
use crate::db::models::{
    AvailabilityWindow, NewAvailabilityWindow, ReminderClass, Session, SessionStatus, Weekday,
};
use crate::db::store::{AvailabilityStore, SessionStore};

const SESSION_COLUMNS: &str = "id, practitioner_id, client_id, session_date, start_time, end_time, \
     duration_minutes, session_type, meeting_token, status, payment_status, notes, \
     cancellation_reason, cancelled_by, reminder_sent, one_hour_reminder_sent, \
     created_at, updated_at";

/// Postgres-backed store. Schema lives in `migrations/`; the overlap check
/// itself is serialized by the services' per-practitioner locks, so the
/// queries here stay plain reads and writes.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_session_with<'e, E>(executor: E, session: &Session) -> Result<Session, StoreError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, practitioner_id, client_id, session_date, start_time, \
             end_time, duration_minutes, session_type, meeting_token, status, payment_status, \
             notes, cancellation_reason, cancelled_by, reminder_sent, one_hour_reminder_sent, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING *",
        )
        .bind(session.id)
        .bind(session.practitioner_id)
        .bind(session.client_id)
        .bind(session.session_date)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.duration_minutes)
        .bind(session.session_type)
        .bind(session.meeting_token)
        .bind(session.status)
        .bind(session.payment_status)
        .bind(session.notes.as_deref())
        .bind(session.cancellation_reason.as_deref())
        .bind(session.cancelled_by)
        .bind(session.reminder_sent)
        .bind(session.one_hour_reminder_sent)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl AvailabilityStore for PgStore {
    async fn upsert_window(
        &self,
        window: NewAvailabilityWindow,
    ) -> Result<AvailabilityWindow, StoreError> {
        let row = sqlx::query_as::<_, AvailabilityWindow>(
            "INSERT INTO availability_windows \
             (id, practitioner_id, weekday, start_time, end_time, slot_duration_minutes, \
              is_available, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) \
             ON CONFLICT (practitioner_id, weekday) DO UPDATE SET \
               start_time = EXCLUDED.start_time, \
               end_time = EXCLUDED.end_time, \
               slot_duration_minutes = EXCLUDED.slot_duration_minutes, \
               is_available = EXCLUDED.is_available, \
               updated_at = NOW() \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(window.practitioner_id)
        .bind(window.weekday)
        .bind(window.start_time)
        .bind(window.end_time)
        .bind(window.slot_duration_minutes)
        .bind(window.is_available)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn window_for_day(
        &self,
        practitioner_id: Uuid,
        weekday: Weekday,
    ) -> Result<Option<AvailabilityWindow>, StoreError> {
        let row = sqlx::query_as::<_, AvailabilityWindow>(
            "SELECT * FROM availability_windows WHERE practitioner_id = $1 AND weekday = $2",
        )
        .bind(practitioner_id)
        .bind(weekday)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn windows_for_practitioner(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, StoreError> {
        let rows = sqlx::query_as::<_, AvailabilityWindow>(
            "SELECT * FROM availability_windows WHERE practitioner_id = $1",
        )
        .bind(practitioner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert(&self, session: Session) -> Result<Session, StoreError> {
        Self::insert_session_with(&self.pool, &session).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn booked_on_date(
        &self,
        practitioner_id: Uuid,
        date: Date,
    ) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions \
             WHERE practitioner_id = $1 AND session_date = $2 AND status = $3",
        )
        .bind(practitioner_id)
        .bind(date)
        .bind(SessionStatus::Booked)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn sessions_for_practitioner(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE practitioner_id = $1 \
             ORDER BY session_date ASC, start_time ASC",
        )
        .bind(practitioner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn sessions_for_client(&self, client_id: Uuid) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE client_id = $1 \
             ORDER BY session_date ASC, start_time ASC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update(&self, session: &Session) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE sessions SET \
               status = $2, payment_status = $3, notes = $4, cancellation_reason = $5, \
               cancelled_by = $6, reminder_sent = $7, one_hour_reminder_sent = $8, \
               updated_at = $9 \
             WHERE id = $1",
        )
        .bind(session.id)
        .bind(session.status)
        .bind(session.payment_status)
        .bind(session.notes.as_deref())
        .bind(session.cancellation_reason.as_deref())
        .bind(session.cancelled_by)
        .bind(session.reminder_sent)
        .bind(session.one_hour_reminder_sent)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn retire_and_replace(
        &self,
        retired: Session,
        replacement: Session,
    ) -> Result<Session, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE sessions SET status = $2, cancellation_reason = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(retired.id)
        .bind(retired.status)
        .bind(retired.cancellation_reason.as_deref())
        .bind(retired.updated_at)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let saved = Self::insert_session_with(&mut *tx, &replacement).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn due_for_reminder(
        &self,
        date: Date,
        from: Time,
        to: Time,
        class: ReminderClass,
    ) -> Result<Vec<Session>, StoreError> {
        let flag_column = match class {
            ReminderClass::FifteenMinute => "reminder_sent",
            ReminderClass::OneHour => "one_hour_reminder_sent",
        };
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE status = $1 AND {flag_column} = FALSE AND session_date = $2 \
               AND start_time >= $3 AND start_time <= $4",
        );
        let rows = sqlx::query_as::<_, Session>(&query)
            .bind(SessionStatus::Booked)
            .bind(date)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn mark_reminder_sent(&self, id: Uuid, class: ReminderClass) -> Result<(), StoreError> {
        let flag_column = match class {
            ReminderClass::FifteenMinute => "reminder_sent",
            ReminderClass::OneHour => "one_hour_reminder_sent",
        };
        let query = format!(
            "UPDATE sessions SET {flag_column} = TRUE, updated_at = NOW() WHERE id = $1"
        );
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
