use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    AssessmentSubmissionRepository, ClassRepository, ClassTimerRepository, ExamRepository,
    VideoProgressRepository,
};
use crate::error::Result;
use crate::models::class::{Assessment, Class, Video};
use crate::models::class_timer::ClassTimer;
use crate::models::exam::{Exam, ExamSubmission, NewExamSubmission};
use crate::models::progress::VideoProgress;
use crate::models::submission::{AssessmentSubmission, AttemptOutcome, NewSubmission};

/// Course content loaded into the in-memory store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub exams: Vec<Exam>,
}

impl Catalog {
    pub fn from_json_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Default)]
struct Inner {
    classes: Vec<Class>,
    exams: BTreeMap<i32, Exam>,
    video_progress: BTreeMap<(i32, i32), VideoProgress>,
    timers: BTreeMap<(i32, i32), ClassTimer>,
    submissions: BTreeMap<(i32, i32), AssessmentSubmission>,
    exam_submissions: Vec<ExamSubmission>,
    next_id: i32,
}

impl Inner {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store kept entirely in process memory. Every operation runs under one
/// lock, so read-check-write sequences are atomic here too.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        let mut classes = catalog.classes;
        for class in classes.iter_mut() {
            class.videos.sort_by_key(|v| (v.order, v.id));
            class.resources.sort_by_key(|r| (r.order, r.id));
            class.assessments.sort_by_key(|a| a.id);
            for assessment in class.assessments.iter_mut() {
                assessment.questions.sort_by_key(|q| (q.order, q.id));
            }
        }
        classes.sort_by_key(|c| c.order);

        let exams = catalog
            .exams
            .into_iter()
            .map(|mut exam| {
                exam.questions.sort_by_key(|q| (q.order, q.id));
                (exam.id, exam)
            })
            .collect();

        Self {
            inner: Arc::new(Mutex::new(Inner {
                classes,
                exams,
                ..Inner::default()
            })),
        }
    }
}

#[async_trait]
impl ClassRepository for InMemoryStore {
    async fn list_ordered(&self) -> Result<Vec<Class>> {
        Ok(self.inner.lock().await.classes.clone())
    }

    async fn get(&self, class_id: i32) -> Result<Option<Class>> {
        let inner = self.inner.lock().await;
        Ok(inner.classes.iter().find(|c| c.id == class_id).cloned())
    }

    async fn find_assessment(&self, assessment_id: i32) -> Result<Option<Assessment>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .classes
            .iter()
            .flat_map(|c| c.assessments.iter())
            .find(|a| a.id == assessment_id)
            .cloned())
    }

    async fn find_video(&self, video_id: i32) -> Result<Option<Video>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .classes
            .iter()
            .flat_map(|c| c.videos.iter())
            .find(|v| v.id == video_id)
            .cloned())
    }
}

#[async_trait]
impl VideoProgressRepository for InMemoryStore {
    async fn find_watched(&self, user_id: i32, video_id: i32) -> Result<Option<VideoProgress>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .video_progress
            .get(&(user_id, video_id))
            .filter(|p| p.is_watched())
            .cloned())
    }

    async fn list_watched(&self, user_id: i32) -> Result<Vec<VideoProgress>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .video_progress
            .values()
            .filter(|p| p.user_id == user_id && p.is_watched())
            .cloned()
            .collect())
    }

    async fn record_watched(
        &self,
        user_id: i32,
        video_id: i32,
        at: DateTime<Utc>,
    ) -> Result<VideoProgress> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.video_progress.get_mut(&(user_id, video_id)) {
            if existing.watched_at.is_none() {
                existing.watched_at = Some(at);
            }
            return Ok(existing.clone());
        }

        let id = inner.next_id();
        let record = VideoProgress {
            id,
            user_id,
            video_id,
            watched_at: Some(at),
            created_at: at,
        };
        inner
            .video_progress
            .insert((user_id, video_id), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ClassTimerRepository for InMemoryStore {
    async fn get(&self, user_id: i32, class_id: i32) -> Result<Option<ClassTimer>> {
        Ok(self.inner.lock().await.timers.get(&(user_id, class_id)).cloned())
    }

    async fn upsert(
        &self,
        user_id: i32,
        class_id: i32,
        expires_at: Option<DateTime<Utc>>,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<ClassTimer> {
        let timer = ClassTimer {
            user_id,
            class_id,
            timer_active: active,
            timer_expires_at: expires_at,
            updated_at: now,
        };
        self.inner
            .lock()
            .await
            .timers
            .insert((user_id, class_id), timer.clone());
        Ok(timer)
    }

    async fn list_active(&self, user_id: i32) -> Result<Vec<ClassTimer>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .timers
            .values()
            .filter(|t| t.user_id == user_id && t.timer_active)
            .cloned()
            .collect())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<ClassTimer>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .timers
            .values()
            .filter(|t| t.timer_active && t.timer_expires_at.map_or(false, |at| at <= now))
            .cloned()
            .collect())
    }

    async fn deactivate(
        &self,
        user_id: i32,
        class_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<ClassTimer>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.timers.get_mut(&(user_id, class_id)).map(|timer| {
            timer.timer_active = false;
            timer.timer_expires_at = None;
            timer.updated_at = now;
            timer.clone()
        }))
    }
}

#[async_trait]
impl AssessmentSubmissionRepository for InMemoryStore {
    async fn find(&self, user_id: i32, assessment_id: i32) -> Result<Option<AssessmentSubmission>> {
        let inner = self.inner.lock().await;
        Ok(inner.submissions.get(&(user_id, assessment_id)).cloned())
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<AssessmentSubmission>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .submissions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_if_absent(&self, new: NewSubmission) -> Result<Option<AssessmentSubmission>> {
        let mut inner = self.inner.lock().await;
        let key = (new.user_id, new.assessment_id);
        if inner.submissions.contains_key(&key) {
            return Ok(None);
        }
        let id = inner.next_id();
        let row = first_attempt(id, new);
        inner.submissions.insert(key, row.clone());
        Ok(Some(row))
    }

    async fn record_attempt(&self, new: NewSubmission) -> Result<AttemptOutcome> {
        let mut inner = self.inner.lock().await;
        let key = (new.user_id, new.assessment_id);

        if let Some(existing) = inner.submissions.get_mut(&key) {
            if existing.is_passed {
                return Ok(AttemptOutcome::AlreadyPassed(existing.clone()));
            }
            existing.is_passed = new.is_passed();
            existing.score = new.score;
            existing.attempt_count += 1;
            existing.stored_answers = new.stored_answers;
            existing.detailed_results = new.detailed_results;
            existing.auto_submitted = new.auto_submitted;
            existing.completed_at = new.completed_at;
            return Ok(AttemptOutcome::Recorded(existing.clone()));
        }

        let id = inner.next_id();
        let row = first_attempt(id, new);
        inner.submissions.insert(key, row.clone());
        Ok(AttemptOutcome::Recorded(row))
    }
}

fn first_attempt(id: i32, new: NewSubmission) -> AssessmentSubmission {
    AssessmentSubmission {
        id,
        user_id: new.user_id,
        assessment_id: new.assessment_id,
        is_passed: new.is_passed(),
        score: new.score,
        attempt_count: 1,
        stored_answers: new.stored_answers,
        detailed_results: new.detailed_results,
        auto_submitted: new.auto_submitted,
        completed_at: new.completed_at,
    }
}

#[async_trait]
impl ExamRepository for InMemoryStore {
    async fn get_exam(&self, exam_id: i32) -> Result<Option<Exam>> {
        Ok(self.inner.lock().await.exams.get(&exam_id).cloned())
    }

    async fn create_submission(&self, new: NewExamSubmission) -> Result<ExamSubmission> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let row = ExamSubmission {
            id,
            user_id: new.user_id,
            exam_id: new.exam_id,
            score: new.score,
            correct_answers: new.correct_answers,
            total_questions: new.total_questions,
            answers: new.answers,
            submitted_at: new.submitted_at,
        };
        inner.exam_submissions.push(row.clone());
        Ok(row)
    }

    async fn list_submissions(&self, user_id: i32, exam_id: i32) -> Result<Vec<ExamSubmission>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<ExamSubmission> = inner
            .exam_submissions
            .iter()
            .filter(|s| s.user_id == user_id && s.exam_id == exam_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}
