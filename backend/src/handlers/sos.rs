use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppError,
    handlers::extract::ApiJson,
    models::sos_session::{
        EndSosRequest, LiveSnapshot, StartSosRequest, StartSosResponse, SuccessResponse,
        UpdateLocationRequest,
    },
    state::AppState,
};

pub async fn start_sos(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<StartSosRequest>,
) -> Result<Json<StartSosResponse>, AppError> {
    let response = state.sos.start(payload).await?;
    Ok(Json(response))
}

pub async fn update_location(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateLocationRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sos.update_location(payload).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn end_sos(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EndSosRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sos.end(payload).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn get_live_snapshot(
    State(state): State<AppState>,
    Path(share_token): Path<String>,
) -> Result<Json<LiveSnapshot>, AppError> {
    let snapshot = state.sos.live_snapshot(share_token.trim()).await?;
    Ok(Json(snapshot))
}
