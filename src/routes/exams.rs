use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::dto::progress_dto::SubmitAnswersRequest;
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::exam::ExamSubmission;
use crate::services::progression_service::ExamResult;
use crate::AppState;

#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(exam_id): Path<i32>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<(StatusCode, Json<ExamResult>)> {
    let result = state
        .progression
        .submit_exam(user.user_id, exam_id, payload.answers)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[axum::debug_handler]
pub async fn list_submissions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(exam_id): Path<i32>,
) -> Result<Json<Vec<ExamSubmission>>> {
    let history = state.progression.exam_history(user.user_id, exam_id).await?;
    Ok(Json(history))
}
