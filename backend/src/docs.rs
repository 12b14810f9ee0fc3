#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    error::ErrorResponse,
    handlers::health::HealthResponse,
    models::sos_session::{
        ContactInput, EmergencyContact, EndSosRequest, LiveSnapshot, LocationPoint,
        SosStatus, StartSosRequest, StartSosResponse, SuccessResponse, UpdateLocationRequest,
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        start_sos_doc,
        update_location_doc,
        end_sos_doc,
        live_snapshot_doc,
        health_doc
    ),
    components(
        schemas(
            StartSosRequest,
            StartSosResponse,
            ContactInput,
            EmergencyContact,
            UpdateLocationRequest,
            EndSosRequest,
            SuccessResponse,
            LiveSnapshot,
            LocationPoint,
            SosStatus,
            HealthResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "SOS", description = "SOS session lifecycle"),
        (name = "Live", description = "Share-token live tracking"),
        (name = "System", description = "Service health")
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    post,
    path = "/api/sos/start",
    request_body = StartSosRequest,
    responses(
        (status = 200, description = "Session started; contacts are notified in the background", body = StartSosResponse),
        (status = 400, description = "Missing displayName or startedAt", body = ErrorResponse),
        (status = 429, description = "Too many session starts from this address")
    ),
    tag = "SOS"
)]
fn start_sos_doc() {}

#[utoipa::path(
    post,
    path = "/api/sos/update",
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, body = SuccessResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, description = "Unknown sosId", body = ErrorResponse)
    ),
    tag = "SOS"
)]
fn update_location_doc() {}

#[utoipa::path(
    post,
    path = "/api/sos/end",
    request_body = EndSosRequest,
    responses(
        (status = 200, body = SuccessResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, description = "Unknown sosId", body = ErrorResponse)
    ),
    tag = "SOS"
)]
fn end_sos_doc() {}

#[utoipa::path(
    get,
    path = "/api/sos/live/{token}",
    params(("token" = String, Path, description = "Share token from the alert link")),
    responses(
        (status = 200, body = LiveSnapshot),
        (status = 404, description = "Unknown share token", body = ErrorResponse),
        (status = 410, description = "Share token expired", body = ErrorResponse)
    ),
    tag = "Live"
)]
fn live_snapshot_doc() {}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, body = HealthResponse)),
    tag = "System"
)]
fn health_doc() {}
