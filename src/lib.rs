pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};

use crate::middleware::auth::{require_user, AuthConfig};
use crate::services::{
    notification_service::NotificationService,
    progression_service::{AutoCompletion, ProgressionService},
};

#[derive(Clone)]
pub struct AppState {
    pub progression: ProgressionService,
    pub notifications: Option<NotificationService>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        progression: ProgressionService,
        notifications: Option<NotificationService>,
        auth: AuthConfig,
    ) -> Self {
        Self {
            progression,
            notifications,
            auth,
        }
    }

    /// Queues webhooks for auto-completions when a notification target is
    /// configured. Returns how many were queued.
    pub async fn announce(&self, events: &[AutoCompletion]) -> usize {
        match &self.notifications {
            Some(notifications) if !events.is_empty() => {
                notifications.enqueue_auto_completions(events).await
            }
            _ => 0,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let learner_api = Router::new()
        .route("/api/classes", get(routes::classes::list_classes))
        .route("/api/classes/:class_id", get(routes::classes::get_class))
        .route("/api/progress/video-ended", post(routes::progress::video_ended))
        .route(
            "/api/videos/:video_id/timer",
            post(routes::progress::start_video_timer),
        )
        .route("/api/assessments/submit", post(routes::assessments::submit))
        .route(
            "/api/assessments/:assessment_id/submit",
            post(routes::assessments::submit_by_id),
        )
        .route(
            "/api/assessments/:assessment_id/result",
            get(routes::assessments::get_result),
        )
        .route("/api/timers", get(routes::timers::list_timers))
        .route(
            "/api/timers/check-expired",
            post(routes::timers::check_expired),
        )
        .route(
            "/api/timers/:class_id",
            get(routes::timers::get_timer).delete(routes::timers::deactivate_timer),
        )
        .route(
            "/api/exams/:exam_id/submit",
            post(routes::exams::submit_exam),
        )
        .route(
            "/api/exams/:exam_id/submissions",
            get(routes::exams::list_submissions),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            require_user,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(learner_api)
        .with_state(state)
}
