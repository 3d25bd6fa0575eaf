use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime, Time};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Booked,
    Completed,
    Cancelled,
    Rescheduled,
}

impl SessionStatus {
    /// Completed, cancelled and rescheduled sessions accept no further
    /// transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Booked)
    }

    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        match self {
            SessionStatus::Booked => matches!(
                next,
                SessionStatus::Completed | SessionStatus::Cancelled | SessionStatus::Rescheduled
            ),
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Booked => "BOOKED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Cancelled => "CANCELLED",
            SessionStatus::Rescheduled => "RESCHEDULED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "session_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    Online,
    InPerson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "cancelled_by", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelledBy {
    Client,
    Practitioner,
    Admin,
}

/// Which reminder pass a session has or has not received. Each class has its
/// own sent flag so the two passes stay independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderClass {
    FifteenMinute,
    OneHour,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    pub client_id: Uuid,
    pub session_date: Date,
    pub start_time: Time,
    pub end_time: Time,
    pub duration_minutes: i32,
    pub session_type: SessionType,
    pub meeting_token: Option<Uuid>,
    pub status: SessionStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
    pub reminder_sent: bool,
    pub one_hour_reminder_sent: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Session {
    /// Half-open interval intersection test against `[start, end)`.
    pub fn overlaps(&self, start: Time, end: Time) -> bool {
        self.start_time < end && start < self.end_time
    }

    pub fn reminder_sent_for(&self, class: ReminderClass) -> bool {
        match class {
            ReminderClass::FifteenMinute => self.reminder_sent,
            ReminderClass::OneHour => self.one_hour_reminder_sent,
        }
    }
}

/// Adds whole minutes to a time of day. Returns `None` when the result would
/// cross midnight; sessions never span two dates.
pub fn add_minutes(t: Time, minutes: u32) -> Option<Time> {
    let total = t.hour() as u32 * 60 + t.minute() as u32 + minutes;
    if total >= 24 * 60 {
        return None;
    }
    Time::from_hms((total / 60) as u8, (total % 60) as u8, t.second()).ok()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookSession {
    pub practitioner_id: Uuid,
    pub client_id: Uuid,
    pub session_date: Date,
    pub start_time: Time,
    pub session_type: Option<SessionType>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RescheduleSession {
    pub new_session_date: Date,
    pub new_start_time: Time,
    #[validate(length(min = 1, message = "A reschedule reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelSession {
    pub cancelled_by: CancelledBy,
    #[validate(length(min = 1, message = "A cancellation reason is required"))]
    pub reason: String,
}
