use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{OffsetDateTime, Time};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "weekday", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<time::Weekday> for Weekday {
    fn from(day: time::Weekday) -> Self {
        match day {
            time::Weekday::Monday => Weekday::Monday,
            time::Weekday::Tuesday => Weekday::Tuesday,
            time::Weekday::Wednesday => Weekday::Wednesday,
            time::Weekday::Thursday => Weekday::Thursday,
            time::Weekday::Friday => Weekday::Friday,
            time::Weekday::Saturday => Weekday::Saturday,
            time::Weekday::Sunday => Weekday::Sunday,
        }
    }
}

/// Weekly working-hours template for one practitioner on one weekday.
/// At most one window exists per (practitioner, weekday); windows are
/// upserted and toggled inactive, never deleted.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    pub weekday: Weekday,
    pub start_time: Time,
    pub end_time: Time,
    pub slot_duration_minutes: i32,
    pub is_available: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Upsert payload for an availability window, keyed by (practitioner, weekday).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertAvailability {
    pub weekday: Weekday,
    pub start_time: Time,
    pub end_time: Time,
    #[validate(range(min = 1, message = "Slot duration must be at least 1 minute"))]
    pub slot_duration_minutes: Option<i32>,
    pub is_available: Option<bool>,
}

/// Fully-resolved window values handed to the store layer.
#[derive(Debug, Clone)]
pub struct NewAvailabilityWindow {
    pub practitioner_id: Uuid,
    pub weekday: Weekday,
    pub start_time: Time,
    pub end_time: Time,
    pub slot_duration_minutes: i32,
    pub is_available: bool,
}
