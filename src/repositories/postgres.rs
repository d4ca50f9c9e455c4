use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use super::{
    AssessmentSubmissionRepository, ClassRepository, ClassTimerRepository, ExamRepository,
    VideoProgressRepository,
};
use crate::error::{Error, Result};
use crate::models::class::{Assessment, Class, Question, Resource, Video};
use crate::models::class_timer::ClassTimer;
use crate::models::exam::{Exam, ExamSubmission, NewExamSubmission};
use crate::models::progress::VideoProgress;
use crate::models::submission::{
    AnswerMap, AssessmentSubmission, AttemptOutcome, NewSubmission, QuestionResult,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_classes(&self, only: Option<i32>) -> Result<Vec<Class>> {
        let class_rows = sqlx::query_as::<_, ClassRow>(
            r#"SELECT id, title, description, position FROM classes
               WHERE ($1::int IS NULL OR id = $1)
               ORDER BY position ASC"#,
        )
        .bind(only)
        .fetch_all(&self.pool)
        .await?;

        if class_rows.is_empty() {
            return Ok(Vec::new());
        }

        let videos = sqlx::query_as::<_, Video>(
            r#"SELECT id, class_id, url, poster, position FROM videos
               WHERE ($1::int IS NULL OR class_id = $1)
               ORDER BY class_id, position, id"#,
        )
        .bind(only)
        .fetch_all(&self.pool)
        .await?;

        let resources = sqlx::query_as::<_, Resource>(
            r#"SELECT id, class_id, title, url, position FROM resources
               WHERE ($1::int IS NULL OR class_id = $1)
               ORDER BY class_id, position, id"#,
        )
        .bind(only)
        .fetch_all(&self.pool)
        .await?;

        let assessment_rows = sqlx::query_as::<_, AssessmentRow>(
            r#"SELECT id, class_id, title FROM assessments
               WHERE ($1::int IS NULL OR class_id = $1)
               ORDER BY class_id, id"#,
        )
        .bind(only)
        .fetch_all(&self.pool)
        .await?;

        let question_rows = sqlx::query_as::<_, QuestionRow>(
            r#"SELECT q.id, q.assessment_id AS owner_id, q.text,
                      q.options, q.correct_answer, q.position
               FROM assessment_questions q
               JOIN assessments a ON a.id = q.assessment_id
               WHERE ($1::int IS NULL OR a.class_id = $1)
               ORDER BY q.assessment_id, q.position, q.id"#,
        )
        .bind(only)
        .fetch_all(&self.pool)
        .await?;

        let assessments: Vec<Assessment> = assessment_rows
            .into_iter()
            .map(|row| row.into_assessment(&question_rows))
            .collect();

        let classes = class_rows
            .into_iter()
            .map(|row| Class {
                id: row.id,
                title: row.title,
                description: row.description,
                order: row.position,
                videos: videos.iter().filter(|v| v.class_id == row.id).cloned().collect(),
                assessments: assessments
                    .iter()
                    .filter(|a| a.class_id == row.id)
                    .cloned()
                    .collect(),
                resources: resources
                    .iter()
                    .filter(|r| r.class_id == row.id)
                    .cloned()
                    .collect(),
            })
            .collect();

        Ok(classes)
    }

    async fn fetch_submission(
        &self,
        user_id: i32,
        assessment_id: i32,
    ) -> Result<Option<AssessmentSubmission>> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"SELECT id, user_id, assessment_id, score, is_passed, attempt_count,
                      stored_answers, detailed_results, auto_submitted, completed_at
               FROM assessment_submissions
               WHERE user_id = $1 AND assessment_id = $2"#,
        )
        .bind(user_id)
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl ClassRepository for PgStore {
    async fn list_ordered(&self) -> Result<Vec<Class>> {
        self.load_classes(None).await
    }

    async fn get(&self, class_id: i32) -> Result<Option<Class>> {
        Ok(self.load_classes(Some(class_id)).await?.into_iter().next())
    }

    async fn find_assessment(&self, assessment_id: i32) -> Result<Option<Assessment>> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            r#"SELECT id, class_id, title FROM assessments WHERE id = $1"#,
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let questions = sqlx::query_as::<_, QuestionRow>(
            r#"SELECT id, assessment_id AS owner_id, text, options, correct_answer, position
               FROM assessment_questions
               WHERE assessment_id = $1
               ORDER BY position, id"#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_assessment(&questions)))
    }

    async fn find_video(&self, video_id: i32) -> Result<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(
            r#"SELECT id, class_id, url, poster, position FROM videos WHERE id = $1"#,
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(video)
    }
}

#[async_trait]
impl VideoProgressRepository for PgStore {
    async fn find_watched(&self, user_id: i32, video_id: i32) -> Result<Option<VideoProgress>> {
        let row = sqlx::query_as::<_, VideoProgress>(
            r#"SELECT id, user_id, video_id, watched_at, created_at FROM video_progress
               WHERE user_id = $1 AND video_id = $2 AND watched_at IS NOT NULL"#,
        )
        .bind(user_id)
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_watched(&self, user_id: i32) -> Result<Vec<VideoProgress>> {
        let rows = sqlx::query_as::<_, VideoProgress>(
            r#"SELECT id, user_id, video_id, watched_at, created_at FROM video_progress
               WHERE user_id = $1 AND watched_at IS NOT NULL
               ORDER BY video_id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn record_watched(
        &self,
        user_id: i32,
        video_id: i32,
        at: DateTime<Utc>,
    ) -> Result<VideoProgress> {
        let row = sqlx::query_as::<_, VideoProgress>(
            r#"
            INSERT INTO video_progress (user_id, video_id, watched_at, created_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_id, video_id) DO UPDATE
                SET watched_at = COALESCE(video_progress.watched_at, EXCLUDED.watched_at)
            RETURNING id, user_id, video_id, watched_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl ClassTimerRepository for PgStore {
    async fn get(&self, user_id: i32, class_id: i32) -> Result<Option<ClassTimer>> {
        let row = sqlx::query_as::<_, ClassTimer>(
            r#"SELECT user_id, class_id, timer_active, timer_expires_at, updated_at
               FROM class_timers WHERE user_id = $1 AND class_id = $2"#,
        )
        .bind(user_id)
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert(
        &self,
        user_id: i32,
        class_id: i32,
        expires_at: Option<DateTime<Utc>>,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<ClassTimer> {
        let row = sqlx::query_as::<_, ClassTimer>(
            r#"
            INSERT INTO class_timers (user_id, class_id, timer_active, timer_expires_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, class_id) DO UPDATE
                SET timer_active = EXCLUDED.timer_active,
                    timer_expires_at = EXCLUDED.timer_expires_at,
                    updated_at = EXCLUDED.updated_at
            RETURNING user_id, class_id, timer_active, timer_expires_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(class_id)
        .bind(active)
        .bind(expires_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_active(&self, user_id: i32) -> Result<Vec<ClassTimer>> {
        let rows = sqlx::query_as::<_, ClassTimer>(
            r#"SELECT user_id, class_id, timer_active, timer_expires_at, updated_at
               FROM class_timers
               WHERE user_id = $1 AND timer_active = TRUE
               ORDER BY class_id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<ClassTimer>> {
        let rows = sqlx::query_as::<_, ClassTimer>(
            r#"SELECT user_id, class_id, timer_active, timer_expires_at, updated_at
               FROM class_timers
               WHERE timer_active = TRUE
                 AND timer_expires_at IS NOT NULL
                 AND timer_expires_at <= $1
               ORDER BY user_id, class_id"#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn deactivate(
        &self,
        user_id: i32,
        class_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<ClassTimer>> {
        let row = sqlx::query_as::<_, ClassTimer>(
            r#"
            UPDATE class_timers
            SET timer_active = FALSE, timer_expires_at = NULL, updated_at = $3
            WHERE user_id = $1 AND class_id = $2
            RETURNING user_id, class_id, timer_active, timer_expires_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(class_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl AssessmentSubmissionRepository for PgStore {
    async fn find(&self, user_id: i32, assessment_id: i32) -> Result<Option<AssessmentSubmission>> {
        self.fetch_submission(user_id, assessment_id).await
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<AssessmentSubmission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"SELECT id, user_id, assessment_id, score, is_passed, attempt_count,
                      stored_answers, detailed_results, auto_submitted, completed_at
               FROM assessment_submissions
               WHERE user_id = $1
               ORDER BY assessment_id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_if_absent(&self, new: NewSubmission) -> Result<Option<AssessmentSubmission>> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO assessment_submissions (
                user_id, assessment_id, score, is_passed, attempt_count,
                stored_answers, detailed_results, auto_submitted, completed_at
            ) VALUES ($1, $2, $3, $4, 1, $5, $6, $7, $8)
            ON CONFLICT (user_id, assessment_id) DO NOTHING
            RETURNING id, user_id, assessment_id, score, is_passed, attempt_count,
                      stored_answers, detailed_results, auto_submitted, completed_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.assessment_id)
        .bind(new.score)
        .bind(new.is_passed())
        .bind(Json(&new.stored_answers))
        .bind(Json(&new.detailed_results))
        .bind(new.auto_submitted)
        .bind(new.completed_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn record_attempt(&self, new: NewSubmission) -> Result<AttemptOutcome> {
        // The WHERE on the conflict branch makes a passed row terminal without
        // a separate read.
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO assessment_submissions (
                user_id, assessment_id, score, is_passed, attempt_count,
                stored_answers, detailed_results, auto_submitted, completed_at
            ) VALUES ($1, $2, $3, $4, 1, $5, $6, $7, $8)
            ON CONFLICT (user_id, assessment_id) DO UPDATE
                SET score = EXCLUDED.score,
                    is_passed = EXCLUDED.is_passed,
                    attempt_count = assessment_submissions.attempt_count + 1,
                    stored_answers = EXCLUDED.stored_answers,
                    detailed_results = EXCLUDED.detailed_results,
                    auto_submitted = EXCLUDED.auto_submitted,
                    completed_at = EXCLUDED.completed_at
                WHERE assessment_submissions.is_passed = FALSE
            RETURNING id, user_id, assessment_id, score, is_passed, attempt_count,
                      stored_answers, detailed_results, auto_submitted, completed_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.assessment_id)
        .bind(new.score)
        .bind(new.is_passed())
        .bind(Json(&new.stored_answers))
        .bind(Json(&new.detailed_results))
        .bind(new.auto_submitted)
        .bind(new.completed_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(AttemptOutcome::Recorded(row.into()));
        }

        let existing = self
            .fetch_submission(new.user_id, new.assessment_id)
            .await?
            .ok_or_else(|| {
                Error::Internal("Submission upsert returned no row and none exists".to_string())
            })?;
        Ok(AttemptOutcome::AlreadyPassed(existing))
    }
}

#[async_trait]
impl ExamRepository for PgStore {
    async fn get_exam(&self, exam_id: i32) -> Result<Option<Exam>> {
        let row = sqlx::query_as::<_, ExamRow>(
            r#"SELECT id, title, description FROM exams WHERE id = $1"#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let questions = sqlx::query_as::<_, QuestionRow>(
            r#"SELECT id, exam_id AS owner_id, text, options, correct_answer, position
               FROM exam_questions
               WHERE exam_id = $1
               ORDER BY position, id"#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Exam {
            id: row.id,
            title: row.title,
            description: row.description,
            questions: questions.into_iter().map(QuestionRow::into_question).collect(),
        }))
    }

    async fn create_submission(&self, new: NewExamSubmission) -> Result<ExamSubmission> {
        let row = sqlx::query_as::<_, ExamSubmissionRow>(
            r#"
            INSERT INTO exam_submissions (
                user_id, exam_id, score, correct_answers, total_questions, answers, submitted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, exam_id, score, correct_answers, total_questions, answers, submitted_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.exam_id)
        .bind(new.score)
        .bind(new.correct_answers)
        .bind(new.total_questions)
        .bind(Json(&new.answers))
        .bind(new.submitted_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_submissions(&self, user_id: i32, exam_id: i32) -> Result<Vec<ExamSubmission>> {
        let rows = sqlx::query_as::<_, ExamSubmissionRow>(
            r#"SELECT id, user_id, exam_id, score, correct_answers, total_questions, answers, submitted_at
               FROM exam_submissions
               WHERE user_id = $1 AND exam_id = $2
               ORDER BY submitted_at DESC, id DESC"#,
        )
        .bind(user_id)
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(FromRow)]
struct ClassRow {
    id: i32,
    title: String,
    description: Option<String>,
    position: i32,
}

#[derive(FromRow)]
struct AssessmentRow {
    id: i32,
    class_id: i32,
    title: String,
}

impl AssessmentRow {
    fn into_assessment(self, questions: &[QuestionRow]) -> Assessment {
        Assessment {
            id: self.id,
            class_id: self.class_id,
            title: self.title,
            questions: questions
                .iter()
                .filter(|q| q.owner_id == self.id)
                .cloned()
                .map(QuestionRow::into_question)
                .collect(),
        }
    }
}

#[derive(FromRow, Clone)]
struct QuestionRow {
    id: i32,
    owner_id: i32,
    text: String,
    options: Json<Vec<String>>,
    correct_answer: String,
    position: i32,
}

impl QuestionRow {
    fn into_question(self) -> Question {
        Question {
            id: self.id,
            text: self.text,
            options: self.options.0,
            correct_answer: self.correct_answer,
            order: self.position,
        }
    }
}

#[derive(FromRow)]
struct ExamRow {
    id: i32,
    title: String,
    description: Option<String>,
}

#[derive(FromRow)]
struct SubmissionRow {
    id: i32,
    user_id: i32,
    assessment_id: i32,
    score: i32,
    is_passed: bool,
    attempt_count: i32,
    stored_answers: Json<AnswerMap>,
    detailed_results: Json<Vec<QuestionResult>>,
    auto_submitted: bool,
    completed_at: DateTime<Utc>,
}

impl From<SubmissionRow> for AssessmentSubmission {
    fn from(row: SubmissionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            assessment_id: row.assessment_id,
            score: row.score,
            is_passed: row.is_passed,
            attempt_count: row.attempt_count,
            stored_answers: row.stored_answers.0,
            detailed_results: row.detailed_results.0,
            auto_submitted: row.auto_submitted,
            completed_at: row.completed_at,
        }
    }
}

#[derive(FromRow)]
struct ExamSubmissionRow {
    id: i32,
    user_id: i32,
    exam_id: i32,
    score: i32,
    correct_answers: i32,
    total_questions: i32,
    answers: Json<AnswerMap>,
    submitted_at: DateTime<Utc>,
}

impl From<ExamSubmissionRow> for ExamSubmission {
    fn from(row: ExamSubmissionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            exam_id: row.exam_id,
            score: row.score,
            correct_answers: row.correct_answers,
            total_questions: row.total_questions,
            answers: row.answers.0,
            submitted_at: row.submitted_at,
        }
    }
}
