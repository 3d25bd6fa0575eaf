mod common;

use common::{booked_session, harness, monday_window};
use mindwell_backend::db::{
    BookSession, CancelSession, CancelledBy, RescheduleSession, SessionStatus, SessionStore,
    SessionType, UpsertAvailability, Weekday,
};
use mindwell_backend::error::ScheduleError;
use mindwell_backend::notifications::SessionEvent;
use time::macros::{date, time};
use tokio::task::JoinSet;
use uuid::Uuid;

// 2026-03-02 is a Monday
const MONDAY: time::Date = date!(2026 - 03 - 02);

fn book_at(practitioner_id: Uuid, client_id: Uuid, start: time::Time) -> BookSession {
    BookSession {
        practitioner_id,
        client_id,
        session_date: MONDAY,
        start_time: start,
        session_type: Some(SessionType::Online),
        notes: Some("intake call".to_string()),
    }
}

#[tokio::test]
async fn booking_creates_a_booked_session_with_meeting_token() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    let client = Uuid::new_v4();
    monday_window(&h, practitioner).await;

    let session = h
        .sessions
        .book(book_at(practitioner, client, time!(09:00)))
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Booked);
    assert_eq!(session.duration_minutes, 30);
    assert_eq!(session.end_time, time!(09:30));
    assert!(session.meeting_token.is_some());

    // Both parties were notified
    assert_eq!(h.notifier.count().await, 2);
    let client_events = h.notifier.events_for(client).await;
    assert!(matches!(client_events[0], SessionEvent::SessionBooked { .. }));
}

#[tokio::test]
async fn in_person_sessions_have_no_meeting_token() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    monday_window(&h, practitioner).await;

    let mut payload = book_at(practitioner, Uuid::new_v4(), time!(10:00));
    payload.session_type = Some(SessionType::InPerson);
    let session = h.sessions.book(payload).await.unwrap();
    assert!(session.meeting_token.is_none());
}

#[tokio::test]
async fn booking_requires_an_active_window() {
    let h = harness();
    let practitioner = Uuid::new_v4();

    // No window at all for that weekday
    let err = h
        .sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(09:00)))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::ProviderUnavailable));

    // Window exists but is toggled off
    h.availability
        .set_window(
            practitioner,
            UpsertAvailability {
                weekday: Weekday::Monday,
                start_time: time!(09:00),
                end_time: time!(17:00),
                slot_duration_minutes: Some(30),
                is_available: Some(false),
            },
        )
        .await
        .unwrap();
    let err = h
        .sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(09:00)))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::ProviderUnavailable));
}

#[tokio::test]
async fn booking_boundary_at_window_end() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    monday_window(&h, practitioner).await;

    // End lands exactly on window end: allowed
    let session = h
        .sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(16:30)))
        .await
        .unwrap();
    assert_eq!(session.end_time, time!(17:00));

    // One slot later spills past the window
    let err = h
        .sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(16:31)))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::OutsideWorkingHours));

    // Before opening
    let err = h
        .sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(08:30)))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::OutsideWorkingHours));
}

#[tokio::test]
async fn overlapping_booking_is_rejected() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    monday_window(&h, practitioner).await;

    h.sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(09:00)))
        .await
        .unwrap();

    let err = h
        .sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(09:00)))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::SlotConflict));

    // Adjacent slot is fine
    h.sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(09:30)))
        .await
        .unwrap();
}

#[tokio::test]
async fn exactly_one_of_n_concurrent_identical_bookings_succeeds() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    monday_window(&h, practitioner).await;

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let sessions = h.sessions.clone();
        tasks.spawn(async move {
            sessions
                .book(book_at(practitioner, Uuid::new_v4(), time!(11:00)))
                .await
        });
    }

    let mut successes = 0;
    let mut conflicts = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => successes += 1,
            Err(ScheduleError::SlotConflict) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);

    // Invariant holds: one booked session occupies 11:00
    let booked = h.store.booked_on_date(practitioner, MONDAY).await.unwrap();
    let at_eleven: Vec<_> = booked
        .iter()
        .filter(|s| s.overlaps(time!(11:00), time!(11:30)))
        .collect();
    assert_eq!(at_eleven.len(), 1);
}

#[tokio::test]
async fn slot_generation_is_deterministic() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    h.availability
        .set_window(
            practitioner,
            UpsertAvailability {
                weekday: Weekday::Monday,
                start_time: time!(09:00),
                end_time: time!(10:00),
                slot_duration_minutes: Some(30),
                is_available: Some(true),
            },
        )
        .await
        .unwrap();

    let slots = h.sessions.available_slots(practitioner, MONDAY).await.unwrap();
    assert_eq!(slots, vec![time!(09:00), time!(09:30)]);

    h.sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(09:00)))
        .await
        .unwrap();
    let slots = h.sessions.available_slots(practitioner, MONDAY).await.unwrap();
    assert_eq!(slots, vec![time!(09:30)]);
}

#[tokio::test]
async fn slots_empty_without_window() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    let slots = h.sessions.available_slots(practitioner, MONDAY).await.unwrap();
    assert!(slots.is_empty());
}

#[tokio::test]
async fn reschedule_retires_old_and_books_replacement() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    let client = Uuid::new_v4();
    monday_window(&h, practitioner).await;

    let original = h
        .sessions
        .book(book_at(practitioner, client, time!(09:00)))
        .await
        .unwrap();

    let replacement = h
        .sessions
        .reschedule(
            original.id,
            RescheduleSession {
                new_session_date: MONDAY,
                new_start_time: time!(14:00),
                reason: "client asked to move".to_string(),
            },
        )
        .await
        .unwrap();

    let old = h.store.find(original.id).await.unwrap().unwrap();
    assert_eq!(old.status, SessionStatus::Rescheduled);
    assert_eq!(old.cancellation_reason.as_deref(), Some("client asked to move"));

    assert_eq!(replacement.status, SessionStatus::Booked);
    assert_eq!(replacement.client_id, client);
    assert_eq!(replacement.duration_minutes, original.duration_minutes);
    assert_eq!(replacement.end_time, time!(14:30));
    assert_ne!(replacement.meeting_token, original.meeting_token);

    // The old slot is bookable again
    let slots = h.sessions.available_slots(practitioner, MONDAY).await.unwrap();
    assert!(slots.contains(&time!(09:00)));
    assert!(!slots.contains(&time!(14:00)));
}

#[tokio::test]
async fn reschedule_rejects_conflicts_and_non_booked_sessions() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    monday_window(&h, practitioner).await;

    let first = h
        .sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(09:00)))
        .await
        .unwrap();
    let second = h
        .sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(10:00)))
        .await
        .unwrap();

    // Moving onto an occupied slot conflicts
    let err = h
        .sessions
        .reschedule(
            second.id,
            RescheduleSession {
                new_session_date: MONDAY,
                new_start_time: time!(09:00),
                reason: "try earlier".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::SlotConflict));

    // Moving a session onto its own current time is not a conflict
    let moved = h
        .sessions
        .reschedule(
            first.id,
            RescheduleSession {
                new_session_date: MONDAY,
                new_start_time: time!(09:00),
                reason: "same slot".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.start_time, time!(09:00));

    // The retired original can no longer be rescheduled
    let err = h
        .sessions
        .reschedule(
            first.id,
            RescheduleSession {
                new_session_date: MONDAY,
                new_start_time: time!(12:00),
                reason: "again".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::InvalidStateTransition(SessionStatus::Rescheduled)
    ));

    // Unknown id
    let err = h
        .sessions
        .reschedule(
            Uuid::new_v4(),
            RescheduleSession {
                new_session_date: MONDAY,
                new_start_time: time!(12:00),
                reason: "ghost".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::NotFound(_)));
}

#[tokio::test]
async fn cancel_is_terminal_and_guarded() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    monday_window(&h, practitioner).await;

    let session = h
        .sessions
        .book(book_at(practitioner, Uuid::new_v4(), time!(09:00)))
        .await
        .unwrap();

    let cancelled = h
        .sessions
        .cancel(
            session.id,
            CancelSession {
                cancelled_by: CancelledBy::Client,
                reason: "feeling better".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, SessionStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(CancelledBy::Client));
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("feeling better"));

    // Cancelling again fails and leaves the record unchanged
    let err = h
        .sessions
        .cancel(
            session.id,
            CancelSession {
                cancelled_by: CancelledBy::Admin,
                reason: "duplicate".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::InvalidStateTransition(SessionStatus::Cancelled)
    ));
    let stored = h.store.find(session.id).await.unwrap().unwrap();
    assert_eq!(stored.cancelled_by, Some(CancelledBy::Client));
    assert_eq!(stored.cancellation_reason.as_deref(), Some("feeling better"));

    // A completed session cannot be cancelled either
    let mut completed = booked_session(practitioner, MONDAY, time!(15:00), time!(15:30));
    completed.status = SessionStatus::Completed;
    h.store.insert(completed.clone()).await.unwrap();
    let err = h
        .sessions
        .cancel(
            completed.id,
            CancelSession {
                cancelled_by: CancelledBy::Practitioner,
                reason: "no-op".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::InvalidStateTransition(SessionStatus::Completed)
    ));

    // The freed slot is bookable again
    let slots = h.sessions.available_slots(practitioner, MONDAY).await.unwrap();
    assert!(slots.contains(&time!(09:00)));
}

#[tokio::test]
async fn listings_are_ordered_by_date_then_start() {
    let h = harness();
    let practitioner = Uuid::new_v4();
    let client = Uuid::new_v4();
    monday_window(&h, practitioner).await;

    // Second Monday after the first
    let next_monday = date!(2026 - 03 - 09);
    let mut p1 = book_at(practitioner, client, time!(10:00));
    p1.session_date = next_monday;
    h.sessions.book(p1).await.unwrap();
    h.sessions
        .book(book_at(practitioner, client, time!(13:00)))
        .await
        .unwrap();
    h.sessions
        .book(book_at(practitioner, client, time!(09:00)))
        .await
        .unwrap();

    let listed = h.sessions.sessions_for_client(client).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(
        (listed[0].session_date, listed[0].start_time),
        (MONDAY, time!(09:00))
    );
    assert_eq!(
        (listed[1].session_date, listed[1].start_time),
        (MONDAY, time!(13:00))
    );
    assert_eq!(
        (listed[2].session_date, listed[2].start_time),
        (next_monday, time!(10:00))
    );

    let listed = h.sessions.sessions_for_practitioner(practitioner).await.unwrap();
    assert_eq!(listed.len(), 3);
}
