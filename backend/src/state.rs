use std::sync::Arc;

use crate::{
    config::Config,
    repositories::sos_session::SessionRepository,
    services::{notification::NotificationDispatcher, sos_session::SosService},
};

#[derive(Clone)]
pub struct AppState {
    pub sos: SosService,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        notifications: NotificationDispatcher,
        config: &Config,
    ) -> Self {
        Self {
            sos: SosService::new(sessions, notifications, config),
        }
    }
}
