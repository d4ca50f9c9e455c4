use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::progression_service::{ClassDetail, CourseOverview};
use crate::AppState;

#[axum::debug_handler]
pub async fn list_classes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CourseOverview>> {
    let overview = state.progression.overview(user.user_id).await?;
    Ok(Json(overview))
}

#[axum::debug_handler]
pub async fn get_class(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(class_id): Path<i32>,
) -> Result<Json<ClassDetail>> {
    let detail = state.progression.class_detail(user.user_id, class_id).await?;
    Ok(Json(detail))
}
