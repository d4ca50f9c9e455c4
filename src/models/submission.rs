use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Question id -> selected option index.
pub type AnswerMap = BTreeMap<i32, usize>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionResult {
    pub question_id: i32,
    pub selected_index: Option<usize>,
    pub selected_answer: Option<String>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentSubmission {
    pub id: i32,
    pub user_id: i32,
    pub assessment_id: i32,
    pub score: i32,
    pub is_passed: bool,
    pub attempt_count: i32,
    pub stored_answers: AnswerMap,
    pub detailed_results: Vec<QuestionResult>,
    pub auto_submitted: bool,
    pub completed_at: DateTime<Utc>,
}

/// A scored attempt about to be written. `is_passed` is not carried here;
/// stores derive it from `score`.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: i32,
    pub assessment_id: i32,
    pub score: i32,
    pub stored_answers: AnswerMap,
    pub detailed_results: Vec<QuestionResult>,
    pub auto_submitted: bool,
    pub completed_at: DateTime<Utc>,
}

impl NewSubmission {
    pub fn is_passed(&self) -> bool {
        self.score == 100
    }
}

#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// Row created (attempt 1) or a failing row updated in place.
    Recorded(AssessmentSubmission),
    /// Nothing written; the stored passing row is returned as-is.
    AlreadyPassed(AssessmentSubmission),
}
