//! SOS session lifecycle: start, location updates, end, and the
//! share-token live snapshot.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use validator::Validate;

use crate::{
    config::{Config, MAX_SESSION_TTL_HOURS},
    error::AppError,
    models::sos_session::{
        normalize_contacts, EndSosRequest, LiveSnapshot, LocationPoint, SosSession,
        StartSosRequest, StartSosResponse, UpdateLocationRequest, DEFAULT_END_REASON,
    },
    repositories::sos_session::SessionRepository,
    services::notification::{NotificationDispatcher, NotificationJob},
    types::SosId,
    utils::{links, time, token},
};

#[derive(Clone)]
pub struct SosService {
    sessions: Arc<dyn SessionRepository>,
    notifications: NotificationDispatcher,
    public_base_url: String,
    session_ttl: Duration,
    time_zone: Tz,
}

impl SosService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        notifications: NotificationDispatcher,
        config: &Config,
    ) -> Self {
        Self {
            sessions,
            notifications,
            public_base_url: config.public_base_url.clone(),
            session_ttl: Duration::hours(
                config
                    .session_ttl_hours
                    .clamp(1, MAX_SESSION_TTL_HOURS),
            ),
            time_zone: config.time_zone,
        }
    }

    pub async fn start(&self, payload: StartSosRequest) -> Result<StartSosResponse, AppError> {
        payload.validate()?;

        let display_name = payload.display_name.unwrap_or_default().trim().to_string();
        let started_at = parse_timestamp(payload.started_at.as_deref(), "startedAt")?
            .ok_or_else(|| AppError::BadRequest("startedAt is required".into()))?;

        let initial_location = match (payload.latitude, payload.longitude) {
            (Some(latitude), Some(longitude)) => Some(LocationPoint {
                latitude,
                longitude,
                timestamp: started_at,
            }),
            _ => None,
        };
        let contacts = normalize_contacts(payload.contacts.as_deref().unwrap_or_default());

        let session = SosSession::new(
            display_name,
            started_at,
            initial_location,
            contacts,
            token::generate_share_token(),
            Utc::now(),
            self.session_ttl,
        );
        let live_url = links::live_url(&self.public_base_url, &session.share_token)?;
        let body = compose_alert_message(&session, &live_url, &self.time_zone);
        let recipients = session.recipient_phones();
        let response = StartSosResponse {
            sos_id: session.id,
            share_token: session.share_token.clone(),
        };

        self.sessions.insert(session).await?;
        tracing::info!(
            sos_id = %response.sos_id,
            recipients = recipients.len(),
            "SOS session started"
        );

        self.notifications.submit(NotificationJob {
            sos_id: response.sos_id,
            recipients,
            body,
        });

        Ok(response)
    }

    pub async fn update_location(&self, payload: UpdateLocationRequest) -> Result<(), AppError> {
        payload.validate()?;

        let id = parse_sos_id(payload.sos_id.as_deref())?;
        let timestamp = parse_timestamp(payload.updated_at.as_deref(), "updatedAt")?
            .unwrap_or_else(Utc::now);
        let point = LocationPoint {
            latitude: payload.latitude.unwrap_or_default(),
            longitude: payload.longitude.unwrap_or_default(),
            timestamp,
        };

        let session = self
            .sessions
            .record_location(id, point)
            .await?
            .ok_or_else(not_found)?;
        tracing::debug!(
            sos_id = %id,
            points = session.location_history.len(),
            "SOS location updated"
        );
        Ok(())
    }

    pub async fn end(&self, payload: EndSosRequest) -> Result<(), AppError> {
        payload.validate()?;

        let id = parse_sos_id(payload.sos_id.as_deref())?;
        let ended_at =
            parse_timestamp(payload.ended_at.as_deref(), "endedAt")?.unwrap_or_else(Utc::now);
        let reason = payload
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or(DEFAULT_END_REASON)
            .to_string();

        self.sessions
            .mark_ended(id, ended_at, reason.clone())
            .await?
            .ok_or_else(not_found)?;
        tracing::info!(sos_id = %id, reason = %reason, "SOS session ended");
        Ok(())
    }

    pub async fn live_snapshot(&self, share_token: &str) -> Result<LiveSnapshot, AppError> {
        self.live_snapshot_at(share_token, Utc::now()).await
    }

    /// Resolves a share token as of `now`. Expiry wins over status.
    pub async fn live_snapshot_at(
        &self,
        share_token: &str,
        now: DateTime<Utc>,
    ) -> Result<LiveSnapshot, AppError> {
        let session = self
            .sessions
            .find_by_share_token(share_token)
            .await?
            .ok_or_else(not_found)?;

        if session.is_expired_at(now) {
            return Err(AppError::Gone("Live tracking link has expired".into()));
        }

        Ok(LiveSnapshot::from(session))
    }
}

/// Text sent to every emergency contact when a session starts.
pub fn compose_alert_message(session: &SosSession, live_url: &str, tz: &Tz) -> String {
    let location_line = match &session.last_location {
        Some(point) => format!(
            "Last known location: {}",
            links::map_url(point.latitude, point.longitude)
        ),
        None => "Location unknown: no position was shared yet.".to_string(),
    };

    format!(
        "SOS ALERT: {} needs help.\n{}\nStarted: {}\nLive tracking: {}",
        session.display_name,
        location_line,
        time::format_local(session.started_at, tz),
        live_url
    )
}

fn parse_sos_id(raw: Option<&str>) -> Result<SosId, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| AppError::BadRequest("sosId is required".into()))?;
    // An id that cannot be one of ours is reported like any other unknown id.
    raw.parse().map_err(|_| not_found())
}

fn parse_timestamp(raw: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw {
        None => Ok(None),
        Some(value) => time::parse_client_timestamp(value).map(Some).ok_or_else(|| {
            AppError::BadRequest(format!("{} must be an RFC 3339 timestamp", field))
        }),
    }
}

fn not_found() -> AppError {
    AppError::NotFound("SOS session not found".into())
}
