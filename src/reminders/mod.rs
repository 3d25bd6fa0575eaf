use std::sync::Arc;

use sqlx::types::Uuid;
use time::{OffsetDateTime, Time};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ReminderConfig;
use crate::db::{ReminderClass, Session, SessionStatus, SessionStore};
use crate::error::ScheduleError;
use crate::notifications::{NotificationPort, SessionEvent};

/// Periodic background sweep that sends each reminder at most once per class.
///
/// The sent flag is written only after a best-effort emit succeeds for at
/// least one party; a session whose flag is set is permanently excluded from
/// that pass, which is what makes overlapping sweep executions safe.
pub struct ReminderSweeper {
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn NotificationPort>,
    config: ReminderConfig,
}

impl ReminderSweeper {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn NotificationPort>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            sessions,
            notifier,
            config,
        }
    }

    /// Runs the sweep loop until the process exits. A failed tick is logged
    /// and retried on the next one; the loop itself never crashes.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.sweep_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_once(OffsetDateTime::now_utc()).await;
            }
        })
    }

    /// One full sweep: the 15-minute pass and, if enabled, the 1-hour pass.
    pub async fn run_once(&self, now: OffsetDateTime) {
        if !self.config.enabled {
            debug!("session reminders are disabled");
            return;
        }

        if let Err(err) = self.run_pass(now, ReminderClass::FifteenMinute).await {
            error!(%err, "reminder pass failed, retrying on next tick");
        }

        if self.config.one_hour_enabled {
            if let Err(err) = self.run_pass(now, ReminderClass::OneHour).await {
                error!(%err, "one-hour reminder pass failed, retrying on next tick");
            }
        }
    }

    async fn run_pass(
        &self,
        now: OffsetDateTime,
        class: ReminderClass,
    ) -> Result<(), ScheduleError> {
        let Some((from, to)) = self.pass_window(now.time(), class) else {
            return Ok(());
        };

        let due = self
            .sessions
            .due_for_reminder(now.date(), from, to, class)
            .await?;
        if due.is_empty() {
            debug!(?class, "no sessions due for reminder");
            return Ok(());
        }

        info!(count = due.len(), ?class, "found sessions due for reminder");

        let mut success = 0usize;
        let mut errors = 0usize;
        for session in due {
            match self.remind(&session, class).await {
                Ok(()) => success += 1,
                Err(err) => {
                    errors += 1;
                    error!(
                        session_id = %session.id,
                        client_id = %session.client_id,
                        practitioner_id = %session.practitioner_id,
                        %err,
                        "failed to send reminder"
                    );
                }
            }
        }

        info!(success, errors, ?class, "reminder pass completed");
        Ok(())
    }

    /// Start-time window each class watches. `None` means the window lies
    /// entirely past midnight and there is nothing to do today.
    fn pass_window(&self, now: Time, class: ReminderClass) -> Option<(Time, Time)> {
        let clamp = |minutes: u32| {
            crate::db::add_minutes(now, minutes).unwrap_or(Time::MAX)
        };
        match class {
            ReminderClass::FifteenMinute => Some((now, clamp(self.config.window_minutes))),
            ReminderClass::OneHour => {
                let from = crate::db::add_minutes(now, 45)?;
                Some((from, clamp(60)))
            }
        }
    }

    /// Emits the reminder to both parties and marks the flag. The flag is
    /// skipped only when neither party could be reached, so the session is
    /// retried on the next tick instead of being silently dropped.
    async fn remind(&self, session: &Session, class: ReminderClass) -> Result<(), ScheduleError> {
        let event = SessionEvent::reminder(session);
        let mut delivered = 0usize;

        for recipient in [session.client_id, session.practitioner_id] {
            let publish = self.notifier.publish(recipient, &event);
            match tokio::time::timeout(self.config.notify_timeout(), publish).await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    warn!(%recipient, session_id = %session.id, %err, "reminder delivery failed");
                }
                Err(_) => {
                    warn!(%recipient, session_id = %session.id, "reminder delivery timed out");
                }
            }
        }

        if delivered == 0 {
            return Err(ScheduleError::DeliveryFailed);
        }

        self.sessions.mark_reminder_sent(session.id, class).await?;
        debug!(session_id = %session.id, ?class, "reminder marked as sent");
        Ok(())
    }

    /// Manual re-trigger for one session. Bypasses the time-window filter but
    /// still requires BOOKED status; sends the 15-minute class.
    pub async fn trigger_reminder(&self, session_id: Uuid) -> Result<(), ScheduleError> {
        info!(%session_id, "manual reminder trigger");

        let session = self
            .sessions
            .find(session_id)
            .await?
            .ok_or(ScheduleError::NotFound(session_id))?;
        if session.status != SessionStatus::Booked {
            warn!(%session_id, status = %session.status, "reminder refused for non-booked session");
            return Err(ScheduleError::InvalidStateTransition(session.status));
        }

        self.remind(&session, ReminderClass::FifteenMinute).await
    }
}
