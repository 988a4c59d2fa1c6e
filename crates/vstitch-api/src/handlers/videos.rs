//! Video job handlers.
//!
//! Each handler validates the body, runs the job to completion and streams
//! the result back as an attachment. Nothing is fetched or spawned for a
//! request that fails validation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde_json::{Map, Value};
use tracing::info;

use vstitch_models::{
    parse_merge_request, parse_sequence_request, parse_single_request, JobRequest,
};

use crate::delivery;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Build one video from `imageURL{n}`/`audioURL{n}` pairs.
pub async fn create_video(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let body = json_object(payload)?;
    let pairs = parse_sequence_request(&body, state.config.max_pairs)?;

    info!(pairs = pairs.len(), "Creating video");
    run_and_deliver(&state, JobRequest::Sequence(pairs)).await
}

/// Build a video from one `imageURL`/`audioURL` pair, minus its trailing tail.
pub async fn create_single_video(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let body = json_object(payload)?;
    let pair = parse_single_request(&body)?;

    info!("Creating single video");
    run_and_deliver(&state, JobRequest::Single(pair)).await
}

/// Concatenate `videoURL1..videoURLn` with re-encoding.
pub async fn merge_videos(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let body = json_object(payload)?;
    let videos = parse_merge_request(&body, state.config.merge_video_count)?;

    info!(videos = videos.len(), "Merging videos");
    run_and_deliver(&state, JobRequest::Merge(videos)).await
}

async fn run_and_deliver(state: &AppState, request: JobRequest) -> ApiResult<Response> {
    let production = state.config.is_production();
    let output = state
        .orchestrator
        .run(request)
        .await
        .map_err(|e| ApiError::from(e).redact(production))?;
    delivery::attachment(output)
        .await
        .map_err(|e| e.redact(production))
}

fn json_object(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Map<String, Value>> {
    match payload {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(ApiError::PayloadTooLarge)
        }
        Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
    }
}
