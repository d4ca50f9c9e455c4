use serde::{Deserialize, Serialize};

use crate::models::class::Question;
use crate::models::submission::{AnswerMap, QuestionResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreReport {
    pub score_percent: i32,
    pub correct_count: i32,
    pub total_count: i32,
    pub is_passed: bool,
    pub per_question: Vec<QuestionResult>,
}

pub struct ScoringService;

impl ScoringService {
    /// Scores an answer map against a question list.
    ///
    /// A question counts as correct when the text of the selected option equals
    /// the stored correct answer. Missing answers, out-of-range indexes and
    /// answers for unknown questions never fail the call; they are simply not
    /// correct. An empty question list scores 0 and does not pass.
    pub fn score(questions: &[Question], answers: &AnswerMap) -> ScoreReport {
        let mut correct_count: i32 = 0;
        let mut per_question = Vec::with_capacity(questions.len());

        for q in questions {
            let selected_index = answers.get(&q.id).copied();
            let selected_answer = selected_index.and_then(|idx| q.options.get(idx)).cloned();
            let is_correct = selected_answer
                .as_deref()
                .map(|text| text == q.correct_answer)
                .unwrap_or(false);

            if is_correct {
                correct_count += 1;
            }
            per_question.push(QuestionResult {
                question_id: q.id,
                selected_index,
                selected_answer,
                is_correct,
            });
        }

        let total_count = questions.len() as i32;
        let score_percent = percent(correct_count, total_count);

        ScoreReport {
            score_percent,
            correct_count,
            total_count,
            is_passed: total_count > 0 && score_percent == 100,
            per_question,
        }
    }

    /// Result recorded when a learner never attempted an assessment before its
    /// window closed: every question unanswered.
    pub fn unanswered(questions: &[Question]) -> ScoreReport {
        Self::score(questions, &AnswerMap::new())
    }
}

fn percent(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    (f64::from(correct) / f64::from(total) * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i32, options: &[&str], correct: &str) -> Question {
        Question {
            id,
            text: format!("Question {}", id),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: correct.to_string(),
            order: id,
        }
    }

    fn sample() -> Vec<Question> {
        vec![
            question(1, &["A", "B", "C"], "B"),
            question(2, &["X", "Y"], "X"),
        ]
    }

    #[test]
    fn all_correct_scores_full_marks() {
        let answers = AnswerMap::from([(1, 1), (2, 0)]);
        let report = ScoringService::score(&sample(), &answers);
        assert_eq!(report.score_percent, 100);
        assert_eq!(report.correct_count, 2);
        assert_eq!(report.total_count, 2);
        assert!(report.is_passed);
        assert!(report.per_question.iter().all(|r| r.is_correct));
    }

    #[test]
    fn one_wrong_answer_halves_the_score() {
        let answers = AnswerMap::from([(1, 0), (2, 0)]);
        let report = ScoringService::score(&sample(), &answers);
        assert_eq!(report.score_percent, 50);
        assert!(!report.is_passed);
        assert_eq!(report.per_question[0].selected_answer.as_deref(), Some("A"));
        assert!(!report.per_question[0].is_correct);
    }

    #[test]
    fn out_of_range_and_missing_answers_are_incorrect() {
        let answers = AnswerMap::from([(1, 7), (99, 0)]);
        let report = ScoringService::score(&sample(), &answers);
        assert_eq!(report.correct_count, 0);
        assert_eq!(report.score_percent, 0);
        assert_eq!(report.per_question[0].selected_index, Some(7));
        assert_eq!(report.per_question[0].selected_answer, None);
        assert_eq!(report.per_question[1].selected_index, None);
    }

    #[test]
    fn matches_by_option_text_not_index() {
        // correct answer text appears at index 2 here
        let qs = vec![question(5, &["no", "maybe", "yes"], "yes")];
        let report = ScoringService::score(&qs, &AnswerMap::from([(5, 2)]));
        assert!(report.is_passed);
    }

    #[test]
    fn rounds_to_nearest_percent() {
        let qs = vec![
            question(1, &["a", "b"], "a"),
            question(2, &["a", "b"], "a"),
            question(3, &["a", "b"], "a"),
        ];
        let report = ScoringService::score(&qs, &AnswerMap::from([(1, 0), (2, 0), (3, 1)]));
        assert_eq!(report.score_percent, 67);
    }

    #[test]
    fn empty_question_list_does_not_pass() {
        let report = ScoringService::score(&[], &AnswerMap::new());
        assert_eq!(report.score_percent, 0);
        assert_eq!(report.total_count, 0);
        assert!(!report.is_passed);
    }

    #[test]
    fn unanswered_scores_zero() {
        let report = ScoringService::unanswered(&sample());
        assert_eq!(report.score_percent, 0);
        assert_eq!(report.per_question.len(), 2);
        assert!(!report.is_passed);
    }
}
