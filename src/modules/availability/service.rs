use std::sync::Arc;

use sqlx::types::Uuid;

use crate::db::{
    AvailabilityStore, AvailabilityWindow, NewAvailabilityWindow, UpsertAvailability, Weekday,
};
use crate::error::ScheduleError;

const DEFAULT_SLOT_DURATION_MINUTES: i32 = 60;

/// Manages weekly availability templates. Windows are upserted per
/// (practitioner, weekday) and toggled inactive rather than deleted.
pub struct AvailabilityService {
    windows: Arc<dyn AvailabilityStore>,
}

impl AvailabilityService {
    pub fn new(windows: Arc<dyn AvailabilityStore>) -> Self {
        Self { windows }
    }

    pub async fn set_window(
        &self,
        practitioner_id: Uuid,
        payload: UpsertAvailability,
    ) -> Result<AvailabilityWindow, ScheduleError> {
        if payload.end_time <= payload.start_time {
            return Err(ScheduleError::InvalidRange(
                "end time must be after start time".to_string(),
            ));
        }
        let slot_duration = payload
            .slot_duration_minutes
            .unwrap_or(DEFAULT_SLOT_DURATION_MINUTES);
        if slot_duration <= 0 {
            return Err(ScheduleError::InvalidRange(
                "slot duration must be positive".to_string(),
            ));
        }

        let window = self
            .windows
            .upsert_window(NewAvailabilityWindow {
                practitioner_id,
                weekday: payload.weekday,
                start_time: payload.start_time,
                end_time: payload.end_time,
                slot_duration_minutes: slot_duration,
                is_available: payload.is_available.unwrap_or(true),
            })
            .await?;
        Ok(window)
    }

    pub async fn get_window(
        &self,
        practitioner_id: Uuid,
        weekday: Weekday,
    ) -> Result<Option<AvailabilityWindow>, ScheduleError> {
        Ok(self.windows.window_for_day(practitioner_id, weekday).await?)
    }

    pub async fn list_windows(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, ScheduleError> {
        Ok(self.windows.windows_for_practitioner(practitioner_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use time::macros::time;

    fn service() -> AvailabilityService {
        AvailabilityService::new(Arc::new(MemoryStore::new()))
    }

    fn payload() -> UpsertAvailability {
        UpsertAvailability {
            weekday: Weekday::Monday,
            start_time: time!(09:00),
            end_time: time!(17:00),
            slot_duration_minutes: Some(30),
            is_available: None,
        }
    }

    #[tokio::test]
    async fn set_window_applies_defaults() {
        let svc = service();
        let practitioner = Uuid::new_v4();
        let mut req = payload();
        req.slot_duration_minutes = None;

        let window = svc.set_window(practitioner, req).await.unwrap();
        assert_eq!(window.slot_duration_minutes, 60);
        assert!(window.is_available);
    }

    #[tokio::test]
    async fn rejects_inverted_or_empty_range() {
        let svc = service();
        let practitioner = Uuid::new_v4();

        let mut req = payload();
        req.end_time = time!(08:00);
        assert!(matches!(
            svc.set_window(practitioner, req).await,
            Err(ScheduleError::InvalidRange(_))
        ));

        let mut req = payload();
        req.end_time = req.start_time;
        assert!(matches!(
            svc.set_window(practitioner, req).await,
            Err(ScheduleError::InvalidRange(_))
        ));

        let mut req = payload();
        req.slot_duration_minutes = Some(0);
        assert!(matches!(
            svc.set_window(practitioner, req).await,
            Err(ScheduleError::InvalidRange(_))
        ));
    }

    #[tokio::test]
    async fn absent_window_is_distinct_from_inactive() {
        let svc = service();
        let practitioner = Uuid::new_v4();

        assert!(svc
            .get_window(practitioner, Weekday::Tuesday)
            .await
            .unwrap()
            .is_none());

        let mut req = payload();
        req.is_available = Some(false);
        svc.set_window(practitioner, req).await.unwrap();

        let window = svc
            .get_window(practitioner, Weekday::Monday)
            .await
            .unwrap()
            .expect("window should exist");
        assert!(!window.is_available);
    }
}
