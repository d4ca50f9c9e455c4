use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::class::Question;
use crate::models::submission::AnswerMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Exam attempts are append-only: one row per submission, no pass/fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSubmission {
    pub id: i32,
    pub user_id: i32,
    pub exam_id: i32,
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub answers: AnswerMap,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExamSubmission {
    pub user_id: i32,
    pub exam_id: i32,
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub answers: AnswerMap,
    pub submitted_at: DateTime<Utc>,
}
