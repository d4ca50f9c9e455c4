use axum::{
    extract::{Path, State},
    Extension, Json,
};
use validator::Validate;

use crate::dto::progress_dto::{SubmitAnswersRequest, SubmitAssessmentRequest};
use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::services::progression_service::{AssessmentStatus, SubmissionResult};
use crate::AppState;

#[axum::debug_handler]
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SubmitAssessmentRequest>,
) -> Result<Json<SubmissionResult>> {
    payload.validate()?;
    let result = match (payload.assessment_id, payload.class_id) {
        (Some(assessment_id), _) => {
            state
                .progression
                .submit_assessment(user.user_id, assessment_id, payload.answers)
                .await?
        }
        (None, Some(class_id)) => {
            state
                .progression
                .submit_class_assessment(user.user_id, class_id, payload.answers)
                .await?
        }
        (None, None) => {
            return Err(Error::BadRequest(
                "Either class_id or assessment_id is required".to_string(),
            ))
        }
    };
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn submit_by_id(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(assessment_id): Path<i32>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<Json<SubmissionResult>> {
    let result = state
        .progression
        .submit_assessment(user.user_id, assessment_id, payload.answers)
        .await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(assessment_id): Path<i32>,
) -> Result<Json<AssessmentStatus>> {
    let status = state
        .progression
        .assessment_result(user.user_id, assessment_id)
        .await?;
    Ok(Json(status))
}
