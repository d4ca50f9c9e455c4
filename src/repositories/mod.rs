pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::class::{Assessment, Class, Video};
use crate::models::class_timer::ClassTimer;
use crate::models::exam::{Exam, ExamSubmission, NewExamSubmission};
use crate::models::progress::VideoProgress;
use crate::models::submission::{AssessmentSubmission, AttemptOutcome, NewSubmission};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassRepository: Send + Sync {
    /// All classes by ascending order, each with nested content ordered.
    async fn list_ordered(&self) -> Result<Vec<Class>>;
    async fn get(&self, class_id: i32) -> Result<Option<Class>>;
    async fn find_assessment(&self, assessment_id: i32) -> Result<Option<Assessment>>;
    async fn find_video(&self, video_id: i32) -> Result<Option<Video>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoProgressRepository: Send + Sync {
    async fn find_watched(&self, user_id: i32, video_id: i32) -> Result<Option<VideoProgress>>;
    async fn list_watched(&self, user_id: i32) -> Result<Vec<VideoProgress>>;
    /// Create-if-absent. An existing watched timestamp is never overwritten.
    async fn record_watched(
        &self,
        user_id: i32,
        video_id: i32,
        at: DateTime<Utc>,
    ) -> Result<VideoProgress>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassTimerRepository: Send + Sync {
    async fn get(&self, user_id: i32, class_id: i32) -> Result<Option<ClassTimer>>;
    async fn upsert(
        &self,
        user_id: i32,
        class_id: i32,
        expires_at: Option<DateTime<Utc>>,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<ClassTimer>;
    async fn list_active(&self, user_id: i32) -> Result<Vec<ClassTimer>>;
    /// Active timers of every user whose expiry is at or before `now`.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<ClassTimer>>;
    /// Returns `None` when there is no row to deactivate.
    async fn deactivate(
        &self,
        user_id: i32,
        class_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<ClassTimer>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssessmentSubmissionRepository: Send + Sync {
    async fn find(&self, user_id: i32, assessment_id: i32) -> Result<Option<AssessmentSubmission>>;
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<AssessmentSubmission>>;
    /// Inserts attempt 1 only when no row exists for (user, assessment).
    async fn create_if_absent(&self, new: NewSubmission) -> Result<Option<AssessmentSubmission>>;
    /// Atomic create-or-retake. A passed row is left untouched.
    async fn record_attempt(&self, new: NewSubmission) -> Result<AttemptOutcome>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExamRepository: Send + Sync {
    async fn get_exam(&self, exam_id: i32) -> Result<Option<Exam>>;
    async fn create_submission(&self, new: NewExamSubmission) -> Result<ExamSubmission>;
    async fn list_submissions(&self, user_id: i32, exam_id: i32) -> Result<Vec<ExamSubmission>>;
}

/// Everything the progression controller reads and writes.
pub trait ProgressStore:
    ClassRepository
    + VideoProgressRepository
    + ClassTimerRepository
    + AssessmentSubmissionRepository
    + ExamRepository
{
}

impl<T> ProgressStore for T where
    T: ClassRepository
        + VideoProgressRepository
        + ClassTimerRepository
        + AssessmentSubmissionRepository
        + ExamRepository
{
}
