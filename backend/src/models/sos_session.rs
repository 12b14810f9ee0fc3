//! Models for SOS sessions and the live-tracking snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{types::SosId, validation::rules};

/// Reason recorded when an SOS session is ended without one.
pub const DEFAULT_END_REASON: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SosStatus {
    Active,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
/// A single reported position.
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
/// Emergency contact notified when a session starts.
pub struct EmergencyContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// In-memory representation of one SOS event from start to end.
pub struct SosSession {
    /// Primary key, exposed as `sosId`.
    #[serde(rename = "sosId")]
    pub id: SosId,
    pub display_name: String,
    pub status: SosStatus,
    pub started_at: DateTime<Utc>,
    pub last_location: Option<LocationPoint>,
    /// Append-only, in the order updates were accepted.
    pub location_history: Vec<LocationPoint>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<String>,
    /// Secret granting read access to the live view.
    pub share_token: String,
    pub expires_at: DateTime<Utc>,
    pub contacts: Vec<EmergencyContact>,
}

impl SosSession {
    pub fn new(
        display_name: String,
        started_at: DateTime<Utc>,
        initial_location: Option<LocationPoint>,
        contacts: Vec<EmergencyContact>,
        share_token: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let location_history = initial_location.iter().cloned().collect();
        Self {
            id: SosId::new(),
            display_name,
            status: SosStatus::Active,
            started_at,
            last_location: initial_location,
            location_history,
            ended_at: None,
            end_reason: None,
            share_token,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            contacts,
        }
    }

    /// Appends a position and makes it the latest known one.
    /// Ended sessions still accept positions; the status is left untouched.
    pub fn record_location(&mut self, point: LocationPoint) {
        self.location_history.push(point.clone());
        self.last_location = Some(point);
    }

    /// Marks the session ended. Re-ending overwrites the previous end fields.
    pub fn end(&mut self, ended_at: DateTime<Utc>, reason: String) {
        self.status = SosStatus::Ended;
        self.ended_at = Some(ended_at);
        self.end_reason = Some(reason);
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Distinct contact phone numbers, in contact order.
    pub fn recipient_phones(&self) -> Vec<String> {
        let mut phones: Vec<String> = Vec::with_capacity(self.contacts.len());
        for contact in &self.contacts {
            if !phones.contains(&contact.phone) {
                phones.push(contact.phone.clone());
            }
        }
        phones
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Public view of a session served to share-token holders.
/// Omits the share token and the contact list.
pub struct LiveSnapshot {
    #[schema(value_type = String)]
    pub sos_id: SosId,
    pub display_name: String,
    pub status: SosStatus,
    pub started_at: DateTime<Utc>,
    pub last_location: Option<LocationPoint>,
    pub location_history: Vec<LocationPoint>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<SosSession> for LiveSnapshot {
    fn from(session: SosSession) -> Self {
        Self {
            sos_id: session.id,
            display_name: session.display_name,
            status: session.status,
            started_at: session.started_at,
            last_location: session.last_location,
            location_history: session.location_history,
            ended_at: session.ended_at,
            end_reason: session.end_reason,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
/// Contact entry as submitted by the client, before normalization.
pub struct ContactInput {
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl ContactInput {
    /// Trims the name and normalizes the phone; entries without a usable phone are dropped.
    pub fn normalize(&self) -> Option<EmergencyContact> {
        let phone = rules::normalize_phone(self.phone.as_deref()?);
        if phone.is_empty() {
            return None;
        }
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        Some(EmergencyContact { name, phone })
    }
}

pub fn normalize_contacts(inputs: &[ContactInput]) -> Vec<EmergencyContact> {
    inputs.iter().filter_map(ContactInput::normalize).collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Payload for starting an SOS session.
pub struct StartSosRequest {
    #[validate(
        required(message = "displayName is required"),
        custom(function = "rules::validate_not_blank")
    )]
    pub display_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// RFC 3339 timestamp taken on the client when the alert was raised.
    #[validate(required(message = "startedAt is required"))]
    pub started_at: Option<String>,
    #[serde(default)]
    pub contacts: Option<Vec<ContactInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartSosResponse {
    #[schema(value_type = String)]
    pub sos_id: SosId,
    pub share_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Payload for posting a new position to a running session.
pub struct UpdateLocationRequest {
    #[validate(
        required(message = "sosId is required"),
        custom(function = "rules::validate_not_blank")
    )]
    pub sos_id: Option<String>,
    #[validate(required(message = "latitude is required"))]
    pub latitude: Option<f64>,
    #[validate(required(message = "longitude is required"))]
    pub longitude: Option<f64>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Payload for ending a session.
pub struct EndSosRequest {
    #[validate(
        required(message = "sosId is required"),
        custom(function = "rules::validate_not_blank")
    )]
    pub sos_id: Option<String>,
    pub ended_at: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
