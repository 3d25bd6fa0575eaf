use std::sync::Arc;

use tokio::sync::broadcast;

use crate::modules::availability::service::AvailabilityService;
use crate::modules::sessions::service::SessionService;
use crate::reminders::ReminderSweeper;

#[derive(Clone)]
pub struct AppState {
    pub availability: Arc<AvailabilityService>,
    pub sessions: Arc<SessionService>,
    pub sweeper: Arc<ReminderSweeper>,
    pub notify_tx: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(
        availability: Arc<AvailabilityService>,
        sessions: Arc<SessionService>,
        sweeper: Arc<ReminderSweeper>,
        notify_tx: broadcast::Sender<String>,
    ) -> Self {
        Self {
            availability,
            sessions,
            sweeper,
            notify_tx,
        }
    }
}
