use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use doodleboard_shared::{ResampleConfig, Segment, Shape, StoredStroke};
use serde::Deserialize;
use tracing::{error, info};

use crate::boards::{get_or_create_board, normalize_board_id, release_board};
use crate::logic::store_segments;
use crate::state::AppState;
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

#[derive(Deserialize)]
struct StrokeRequest {
    #[serde(default)]
    shape: Shape,
    #[serde(default)]
    color: String,
    #[serde(default = "default_size")]
    size: f32,
    segments: Vec<Segment>,
    start_index: Option<i64>,
    gap: Option<i64>,
    num_buckets: Option<i64>,
}

fn default_size() -> f32 {
    6.0
}

impl StrokeRequest {
    fn resample_config(&self) -> ResampleConfig {
        let defaults = ResampleConfig::default();
        ResampleConfig {
            start_index: self.start_index.unwrap_or(defaults.start_index),
            gap: self.gap.unwrap_or(defaults.gap),
            num_buckets: self.num_buckets.unwrap_or(defaults.num_buckets),
        }
    }
}

fn parse_board_id(board_id: &str) -> Result<String, ApiError> {
    normalize_board_id(board_id)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Unknown board {board_id}")))
}

pub async fn store_stroke(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
    body: String,
) -> Result<Json<StoredStroke>, ApiError> {
    let board_id = parse_board_id(&board_id)?;
    let deserializer = &mut serde_json::Deserializer::from_str(&body);
    let request = serde_path_to_error::deserialize::<_, StrokeRequest>(deserializer).map_err(
        |err| {
            error!("Error parsing stroke request body: {err}");
            ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("Error parsing request body: {err}"),
            )
        },
    )?;
    let config = request.resample_config();

    let board = get_or_create_board(&state, &board_id).await;
    let result = {
        let mut board = board.write().await;
        store_segments(
            &mut board,
            request.shape,
            request.color,
            request.size,
            &request.segments,
            config,
        )
    };
    release_board(&state, &board_id, board).await;

    let stroke = result.map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.to_string()))?;
    info!(
        board_id = %board_id,
        stroke_id = %stroke.id,
        shape = stroke.shape.as_str(),
        samples = stroke.samples.len(),
        "stored stroke over http"
    );
    Ok(Json(stroke))
}

pub async fn list_strokes(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredStroke>>, ApiError> {
    let board_id = parse_board_id(&board_id)?;
    let live = state.boards.read().await.get(&board_id).cloned();
    if let Some(board) = live {
        return Ok(Json(board.read().await.document.strokes.clone()));
    }
    match state.storage.load_board(&board_id).await {
        Ok(document) => Ok(Json(document.strokes)),
        Err(StorageError::NotFound(_)) => Ok(Json(Vec::new())),
        Err(err) => {
            error!("Error loading board {board_id}: {err}");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load board",
            ))
        }
    }
}
