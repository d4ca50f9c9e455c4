use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::dto::progress_dto::{CheckExpiredResponse, TimerListQuery};
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::progression_service::TimerListing;
use crate::services::timer_service::TimerView;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_timers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TimerListQuery>,
) -> Result<Json<TimerListing>> {
    let listing = state
        .progression
        .list_timers(user.user_id, query.cleanup)
        .await?;
    state.announce(&listing.auto_completed).await;
    Ok(Json(listing))
}

#[axum::debug_handler]
pub async fn check_expired(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CheckExpiredResponse>> {
    let report = state.progression.check_expired_timers(user.user_id).await?;
    let notifications_queued = state.announce(&report.completions).await;
    Ok(Json(CheckExpiredResponse {
        report,
        notifications_queued,
    }))
}

#[axum::debug_handler]
pub async fn get_timer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(class_id): Path<i32>,
) -> Result<Json<TimerView>> {
    let view = state.progression.get_timer(user.user_id, class_id).await?;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn deactivate_timer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(class_id): Path<i32>,
) -> Result<Json<TimerView>> {
    let view = state
        .progression
        .deactivate_timer(user.user_id, class_id)
        .await?;
    Ok(Json(view))
}
