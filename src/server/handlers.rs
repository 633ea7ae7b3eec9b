use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;

use super::{ApiError, AppState};
use crate::sink::ChannelSink;
use crate::{Error, GenerationRequest, MALFORMED_BODY};

const PROMPT_REQUIRED: &str = "Prompt is required.";

#[derive(Debug, Default, Deserialize)]
struct ChatBody {
    #[serde(default)]
    prompt: Option<String>,
}

/// Pull a non-blank `prompt` out of a chat body. Anything else is a 400.
fn chat_prompt(body: &[u8]) -> Result<String, Error> {
    let body: ChatBody = serde_json::from_slice(body).unwrap_or_default();
    body.prompt
        .filter(|prompt| !prompt.trim().is_empty())
        .ok_or_else(|| Error::invalid_input(PROMPT_REQUIRED))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Server is running" }))
}

pub async fn api_test() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "API is working",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn submit_patient(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body: Value =
        serde_json::from_slice(&body).map_err(|_| Error::invalid_input(MALFORMED_BODY))?;

    let record = state.schedules.submit_intake(&body).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Patient data saved successfully",
            "data": { "insertedId": record.id },
        })),
    ))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.schedules.fetch_record(&id).await?;
    Ok(Json(json!({ "success": true, "data": record })))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let schedule = state.schedules.fetch_schedule(&id).await?;
    Ok(Json(json!({ "success": true, "schedule": schedule })))
}

pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let request = GenerationRequest::chat(chat_prompt(&body)?);
    let text = state.relay.run_buffered(&request).await.into_result()?;
    Ok(Json(json!({ "success": true, "response": text })))
}

/// Stream the reply as plain text. `chat_prompt` rejects a bad prompt before
/// the response starts, so it is still a 400; later failures are written in-band.
pub async fn chat_stream(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request = GenerationRequest::chat(chat_prompt(&body)?);

    let (mut sink, rx) = ChannelSink::channel();
    let relay = state.relay.clone();
    tokio::spawn(async move {
        relay.run_streaming(&request, &mut sink).await;
    });

    // Dropping the body drops `rx`, which the relay sees as a cancellation.
    let chunks = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}
