use axum::{
    extract::{Path, State},
    Extension, Json,
};
use validator::Validate;

use crate::dto::progress_dto::VideoEndedRequest;
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::progression_service::{NextClassTimer, VideoEndedOutcome};
use crate::AppState;

#[axum::debug_handler]
pub async fn video_ended(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<VideoEndedRequest>,
) -> Result<Json<VideoEndedOutcome>> {
    payload.validate()?;
    let outcome = state
        .progression
        .video_ended(user.user_id, payload.class_id, payload.video_id)
        .await?;
    Ok(Json(outcome))
}

#[axum::debug_handler]
pub async fn start_video_timer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<i32>,
) -> Result<Json<NextClassTimer>> {
    let next = state
        .progression
        .start_video_timer(user.user_id, video_id)
        .await?;
    Ok(Json(next))
}
