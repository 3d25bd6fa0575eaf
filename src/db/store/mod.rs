mod memory;
mod postgres;

use async_trait::async_trait;
use sqlx::types::Uuid;
use time::{Date, Time};

use crate::db::error::StoreError;
use crate::db::models::{
    AvailabilityWindow, NewAvailabilityWindow, ReminderClass, Session, Weekday,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Weekly availability templates, keyed by (practitioner, weekday).
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Inserts or updates the window for the payload's (practitioner, weekday).
    async fn upsert_window(
        &self,
        window: NewAvailabilityWindow,
    ) -> Result<AvailabilityWindow, StoreError>;

    /// `None` means the practitioner has no window that day at all, which is
    /// distinct from a window with `is_available = false`.
    async fn window_for_day(
        &self,
        practitioner_id: Uuid,
        weekday: Weekday,
    ) -> Result<Option<AvailabilityWindow>, StoreError>;

    async fn windows_for_practitioner(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, StoreError>;
}

/// Session records. All mutation goes through the scheduling services; the
/// store only persists.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> Result<Session, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Session>, StoreError>;

    /// BOOKED sessions for one practitioner on one date; these are the
    /// intervals that block new bookings.
    async fn booked_on_date(
        &self,
        practitioner_id: Uuid,
        date: Date,
    ) -> Result<Vec<Session>, StoreError>;

    /// Ordered by date, then start time.
    async fn sessions_for_practitioner(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Vec<Session>, StoreError>;

    /// Ordered by date, then start time.
    async fn sessions_for_client(&self, client_id: Uuid) -> Result<Vec<Session>, StoreError>;

    async fn update(&self, session: &Session) -> Result<(), StoreError>;

    /// Writes the retired session and its replacement as one atomic unit, so
    /// no reader ever observes both counting as BOOKED or neither existing.
    async fn retire_and_replace(
        &self,
        retired: Session,
        replacement: Session,
    ) -> Result<Session, StoreError>;

    /// BOOKED sessions on `date` whose start time lies in `[from, to]` and
    /// whose flag for `class` is still unset.
    async fn due_for_reminder(
        &self,
        date: Date,
        from: Time,
        to: Time,
        class: ReminderClass,
    ) -> Result<Vec<Session>, StoreError>;

    async fn mark_reminder_sent(&self, id: Uuid, class: ReminderClass) -> Result<(), StoreError>;
}
