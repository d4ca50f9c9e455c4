use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::submission::AnswerMap;
use crate::services::progression_service::AutoCompletionReport;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VideoEndedRequest {
    #[validate(range(min = 1, message = "class_id must be positive"))]
    pub class_id: i32,
    #[validate(range(min = 1, message = "video_id must be positive"))]
    pub video_id: i32,
}

/// Body of the by-class submission path. `assessment_id` wins when both are
/// given.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAssessmentRequest {
    #[validate(range(min = 1))]
    pub class_id: Option<i32>,
    #[validate(range(min = 1))]
    pub assessment_id: Option<i32>,
    pub answers: AnswerMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: AnswerMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerListQuery {
    #[serde(default)]
    pub cleanup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckExpiredResponse {
    #[serde(flatten)]
    pub report: AutoCompletionReport,
    pub notifications_queued: usize,
}
