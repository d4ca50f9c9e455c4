use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::class::{Assessment, Class, PublicQuestion, Resource, Video};
use crate::models::class_timer::ClassTimer;
use crate::models::exam::{ExamSubmission, NewExamSubmission};
use crate::models::progress::VideoProgress;
use crate::models::submission::{
    AnswerMap, AssessmentSubmission, AttemptOutcome, NewSubmission, QuestionResult,
};
use crate::repositories::{
    AssessmentSubmissionRepository, ClassRepository, ClassTimerRepository, ExamRepository,
    ProgressStore, VideoProgressRepository,
};
use crate::services::scoring_service::ScoringService;
use crate::services::timer_service::{TimerService, TimerSummary, TimerView};
use crate::services::unlock_service::{
    self, ClassAccess, ClassStatus, ProgressSnapshot, VideoCompletionPolicy,
};
use crate::utils::time::Clock;

#[derive(Debug, Clone)]
pub struct ProgressionSettings {
    pub unlock_timer_duration: Duration,
    pub video_policy: VideoCompletionPolicy,
    pub enforce_video_before_assessment: bool,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self {
            unlock_timer_duration: Duration::hours(24),
            video_policy: VideoCompletionPolicy::Any,
            enforce_video_before_assessment: true,
        }
    }
}

impl From<&crate::config::Config> for ProgressionSettings {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            unlock_timer_duration: config.unlock_timer_duration(),
            video_policy: config.video_completion_policy,
            enforce_video_before_assessment: config.enforce_video_before_assessment,
        }
    }
}

/// The individual store seams; any of them can be swapped independently.
#[derive(Clone)]
pub struct Stores {
    pub classes: Arc<dyn ClassRepository>,
    pub videos: Arc<dyn VideoProgressRepository>,
    pub timers: Arc<dyn ClassTimerRepository>,
    pub submissions: Arc<dyn AssessmentSubmissionRepository>,
    pub exams: Arc<dyn ExamRepository>,
}

impl Stores {
    pub fn from_store<S: ProgressStore + 'static>(store: Arc<S>) -> Self {
        Self {
            classes: store.clone(),
            videos: store.clone(),
            timers: store.clone(),
            submissions: store.clone(),
            exams: store,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextClassTimer {
    Armed { class_id: i32, timer: TimerView },
    AlreadyArmed { class_id: i32, timer: TimerView },
    NotYetWatched { class_id: i32 },
    NoNextClass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEndedOutcome {
    pub progress: VideoProgress,
    pub newly_watched: bool,
    pub class_video_watched: bool,
    pub next_class: NextClassTimer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionResult {
    pub assessment_id: i32,
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub is_passed: bool,
    pub can_retake: bool,
    pub attempt_count: i32,
    pub auto_submitted: bool,
    pub completed_at: DateTime<Utc>,
    pub detailed_results: Vec<QuestionResult>,
    pub message: String,
}

impl From<AssessmentSubmission> for SubmissionResult {
    fn from(sub: AssessmentSubmission) -> Self {
        let correct_answers = sub.detailed_results.iter().filter(|r| r.is_correct).count() as i32;
        let message = if sub.is_passed {
            "Perfect score! You have completed this assessment.".to_string()
        } else {
            format!(
                "You scored {}%. A perfect score is required to pass; you can retake this assessment.",
                sub.score
            )
        };
        Self {
            assessment_id: sub.assessment_id,
            score: sub.score,
            correct_answers,
            total_questions: sub.detailed_results.len() as i32,
            is_passed: sub.is_passed,
            can_retake: !sub.is_passed,
            attempt_count: sub.attempt_count,
            auto_submitted: sub.auto_submitted,
            completed_at: sub.completed_at,
            detailed_results: sub.detailed_results,
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentStatus {
    pub assessment_id: i32,
    pub attempted: bool,
    pub attempt_count: i32,
    pub result: Option<SubmissionResult>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResult {
    pub submission: ExamSubmission,
    pub message: String,
}

/// A zero-score submission recorded because an unlock window closed before
/// the learner attempted the prerequisite assessment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoCompletion {
    pub user_id: i32,
    pub class_id: i32,
    pub assessment_id: i32,
    pub assessment_title: String,
    pub timer_class_id: i32,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoCompletionReport {
    pub completions: Vec<AutoCompletion>,
    pub timers_checked: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerListing {
    #[serde(flatten)]
    pub summary: TimerSummary,
    pub auto_completed: Vec<AutoCompletion>,
    pub failures: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentProgress {
    pub assessment_id: i32,
    pub title: String,
    pub total_questions: usize,
    pub attempted: bool,
    pub is_passed: bool,
    pub score: Option<i32>,
    pub attempt_count: i32,
    pub can_retake: bool,
    pub auto_submitted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassOverview {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    #[serde(flatten)]
    pub access: ClassAccess,
    pub video_watched: bool,
    pub assessments: Vec<AssessmentProgress>,
    pub timer: Option<TimerView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOverview {
    pub classes: Vec<ClassOverview>,
    pub completed_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentContent {
    pub id: i32,
    pub title: String,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDetail {
    #[serde(flatten)]
    pub overview: ClassOverview,
    pub videos: Vec<Video>,
    pub resources: Vec<Resource>,
    pub assessment_content: Vec<AssessmentContent>,
}

#[derive(Clone)]
pub struct ProgressionService {
    stores: Stores,
    timers: TimerService,
    clock: Arc<dyn Clock>,
    settings: ProgressionSettings,
}

impl ProgressionService {
    pub fn new<S: ProgressStore + 'static>(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        settings: ProgressionSettings,
    ) -> Self {
        Self::from_stores(Stores::from_store(store), clock, settings)
    }

    pub fn from_stores(stores: Stores, clock: Arc<dyn Clock>, settings: ProgressionSettings) -> Self {
        let timers = TimerService::new(
            stores.timers.clone(),
            clock.clone(),
            settings.unlock_timer_duration,
        );
        Self {
            stores,
            timers,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ProgressionSettings {
        &self.settings
    }

    async fn load_snapshot(&self, user_id: i32, classes: &[Class]) -> Result<ProgressSnapshot> {
        let watched: HashSet<i32> = self
            .stores
            .videos
            .list_watched(user_id)
            .await?
            .into_iter()
            .map(|p| p.video_id)
            .collect();
        let submissions = self.stores.submissions.list_for_user(user_id).await?;
        let timers = self.stores.timers.list_active(user_id).await?;
        Ok(ProgressSnapshot::build(
            classes,
            &watched,
            &submissions,
            timers,
            self.settings.video_policy,
        ))
    }

    fn class_watched(&self, class: &Class, watched: &HashSet<i32>) -> bool {
        let snapshot = ProgressSnapshot::build(
            std::slice::from_ref(class),
            watched,
            &[],
            Vec::new(),
            self.settings.video_policy,
        );
        snapshot.is_video_watched(class.id)
    }

    /// Lock state of every class for one user, recomputed from stored progress.
    pub async fn overview(&self, user_id: i32) -> Result<CourseOverview> {
        let classes = self.stores.classes.list_ordered().await?;
        let snapshot = self.load_snapshot(user_id, &classes).await?;
        let submissions = self.stores.submissions.list_for_user(user_id).await?;
        let now = self.clock.now();

        let access = unlock_service::evaluate(&classes, &snapshot, now);
        let overviews: Vec<ClassOverview> = classes
            .iter()
            .zip(access)
            .map(|(class, access)| class_overview(class, access, &snapshot, &submissions, now))
            .collect();

        Ok(CourseOverview {
            completed_count: overviews
                .iter()
                .filter(|c| c.access.status == ClassStatus::Completed)
                .count(),
            total_count: overviews.len(),
            classes: overviews,
        })
    }

    pub async fn class_detail(&self, user_id: i32, class_id: i32) -> Result<ClassDetail> {
        let classes = self.stores.classes.list_ordered().await?;
        let position = classes
            .iter()
            .position(|c| c.id == class_id)
            .ok_or_else(|| Error::NotFound(format!("Class {} not found", class_id)))?;
        let snapshot = self.load_snapshot(user_id, &classes).await?;
        let submissions = self.stores.submissions.list_for_user(user_id).await?;
        let now = self.clock.now();

        let access = unlock_service::evaluate(&classes, &snapshot, now)
            .into_iter()
            .nth(position)
            .ok_or_else(|| Error::Internal("Lock evaluation skipped a class".to_string()))?;
        let class = &classes[position];

        Ok(ClassDetail {
            overview: class_overview(class, access, &snapshot, &submissions, now),
            videos: class.videos.clone(),
            resources: class.resources.clone(),
            assessment_content: class
                .assessments
                .iter()
                .map(|a| AssessmentContent {
                    id: a.id,
                    title: a.title.clone(),
                    questions: a.questions.iter().map(PublicQuestion::from).collect(),
                })
                .collect(),
        })
    }

    /// Records a finished video and, the first time the class counts as
    /// watched, arms the unlock timer of the class that follows it.
    pub async fn video_ended(
        &self,
        user_id: i32,
        class_id: i32,
        video_id: i32,
    ) -> Result<VideoEndedOutcome> {
        let video = self
            .stores
            .classes
            .find_video(video_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Video {} not found", video_id)))?;
        if video.class_id != class_id {
            return Err(Error::NotFound(format!(
                "Video {} does not belong to class {}",
                video_id, class_id
            )));
        }

        let classes = self.stores.classes.list_ordered().await?;
        let position = classes
            .iter()
            .position(|c| c.id == class_id)
            .ok_or_else(|| Error::NotFound(format!("Class {} not found", class_id)))?;
        let class = &classes[position];

        let mut watched: HashSet<i32> = self
            .stores
            .videos
            .list_watched(user_id)
            .await?
            .into_iter()
            .map(|p| p.video_id)
            .collect();
        let newly_watched = !watched.contains(&video_id);
        let class_watched_before = self.class_watched(class, &watched);

        let now = self.clock.now();
        let progress = self
            .stores
            .videos
            .record_watched(user_id, video_id, now)
            .await?;
        watched.insert(video_id);
        let class_video_watched = self.class_watched(class, &watched);

        tracing::info!(
            user_id,
            class_id,
            video_id,
            newly_watched,
            class_video_watched,
            "Video marked as watched"
        );

        let next_class = match classes.get(position + 1) {
            None => NextClassTimer::NoNextClass,
            Some(next) if !class_video_watched => NextClassTimer::NotYetWatched { class_id: next.id },
            Some(next) if class_watched_before => NextClassTimer::AlreadyArmed {
                class_id: next.id,
                timer: self.timers.view(user_id, next.id).await?,
            },
            Some(next) => {
                let timer = self.timers.arm(user_id, next.id).await?;
                NextClassTimer::Armed {
                    class_id: next.id,
                    timer: TimerView::new(next.id, Some(&timer), now),
                }
            }
        };

        Ok(VideoEndedOutcome {
            progress,
            newly_watched,
            class_video_watched,
            next_class,
        })
    }

    /// Per-video timer request. Needs an existing watch record; arms the timer
    /// of the class after the video's class.
    pub async fn start_video_timer(&self, user_id: i32, video_id: i32) -> Result<NextClassTimer> {
        self.stores
            .videos
            .find_watched(user_id, video_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("No watch record for video {}", video_id))
            })?;
        let video = self
            .stores
            .classes
            .find_video(video_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Video {} not found", video_id)))?;

        let classes = self.stores.classes.list_ordered().await?;
        let position = classes
            .iter()
            .position(|c| c.id == video.class_id)
            .ok_or_else(|| Error::NotFound(format!("Class {} not found", video.class_id)))?;

        match classes.get(position + 1) {
            None => Ok(NextClassTimer::NoNextClass),
            Some(next) => {
                let timer = self.timers.arm(user_id, next.id).await?;
                Ok(NextClassTimer::Armed {
                    class_id: next.id,
                    timer: TimerView::new(next.id, Some(&timer), self.clock.now()),
                })
            }
        }
    }

    /// Submission path for classes with exactly one assessment.
    pub async fn submit_class_assessment(
        &self,
        user_id: i32,
        class_id: i32,
        answers: AnswerMap,
    ) -> Result<SubmissionResult> {
        let class = self
            .stores
            .classes
            .get(class_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Class {} not found", class_id)))?;

        match class.assessments.as_slice() {
            [] => Err(Error::NotFound(format!(
                "Class {} has no assessment",
                class_id
            ))),
            [only] => self.submit_assessment(user_id, only.id, answers).await,
            _ => Err(Error::BadRequest(format!(
                "Class {} has several assessments; submit each one by assessment id",
                class_id
            ))),
        }
    }

    pub async fn submit_assessment(
        &self,
        user_id: i32,
        assessment_id: i32,
        answers: AnswerMap,
    ) -> Result<SubmissionResult> {
        let assessment = self
            .stores
            .classes
            .find_assessment(assessment_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Assessment {} not found", assessment_id)))?;
        if assessment.questions.is_empty() {
            return Err(Error::BadRequest(format!(
                "Assessment {} has no questions",
                assessment_id
            )));
        }

        if self.settings.enforce_video_before_assessment {
            self.ensure_assessment_open(user_id, &assessment).await?;
        }

        let report = ScoringService::score(&assessment.questions, &answers);
        let new = NewSubmission {
            user_id,
            assessment_id,
            score: report.score_percent,
            stored_answers: answers,
            detailed_results: report.per_question,
            auto_submitted: false,
            completed_at: self.clock.now(),
        };

        match self.stores.submissions.record_attempt(new).await? {
            AttemptOutcome::Recorded(sub) => {
                tracing::info!(
                    user_id,
                    assessment_id,
                    score = sub.score,
                    attempt = sub.attempt_count,
                    passed = sub.is_passed,
                    "Assessment attempt recorded"
                );
                Ok(sub.into())
            }
            AttemptOutcome::AlreadyPassed(existing) => {
                tracing::warn!(user_id, assessment_id, "Resubmission of a passed assessment rejected");
                let existing = SubmissionResult::from(existing);
                Err(Error::Conflict {
                    message: "Assessment already completed with a perfect score".to_string(),
                    existing: Some(serde_json::to_value(&existing)?),
                })
            }
        }
    }

    async fn ensure_assessment_open(&self, user_id: i32, assessment: &Assessment) -> Result<()> {
        let classes = self.stores.classes.list_ordered().await?;
        let snapshot = self.load_snapshot(user_id, &classes).await?;
        let access = unlock_service::evaluate(&classes, &snapshot, self.clock.now())
            .into_iter()
            .find(|a| a.class_id == assessment.class_id)
            .ok_or_else(|| {
                Error::NotFound(format!("Class {} not found", assessment.class_id))
            })?;

        if access.locked {
            return Err(Error::Forbidden(access.reason));
        }
        if access.assessments_locked {
            return Err(Error::Forbidden(
                "Watch the class video before taking its assessment".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn assessment_result(&self, user_id: i32, assessment_id: i32) -> Result<AssessmentStatus> {
        self.stores
            .classes
            .find_assessment(assessment_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Assessment {} not found", assessment_id)))?;

        let status = match self.stores.submissions.find(user_id, assessment_id).await? {
            Some(sub) => {
                let result = SubmissionResult::from(sub);
                AssessmentStatus {
                    assessment_id,
                    attempted: true,
                    attempt_count: result.attempt_count,
                    message: result.message.clone(),
                    result: Some(result),
                }
            }
            None => AssessmentStatus {
                assessment_id,
                attempted: false,
                attempt_count: 0,
                result: None,
                message: "No attempts made yet".to_string(),
            },
        };
        Ok(status)
    }

    /// Final exam: every submission is kept, nothing is deduplicated.
    pub async fn submit_exam(&self, user_id: i32, exam_id: i32, answers: AnswerMap) -> Result<ExamResult> {
        let exam = self
            .stores
            .exams
            .get_exam(exam_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Exam {} not found", exam_id)))?;
        if exam.questions.is_empty() {
            return Err(Error::BadRequest(format!("Exam {} has no questions", exam_id)));
        }

        let report = ScoringService::score(&exam.questions, &answers);
        let submission = self
            .stores
            .exams
            .create_submission(NewExamSubmission {
                user_id,
                exam_id,
                score: report.score_percent,
                correct_answers: report.correct_count,
                total_questions: report.total_count,
                answers,
                submitted_at: self.clock.now(),
            })
            .await?;

        tracing::info!(user_id, exam_id, score = submission.score, "Exam submission recorded");
        Ok(ExamResult {
            message: format!(
                "You answered {} of {} questions correctly ({}%).",
                submission.correct_answers, submission.total_questions, submission.score
            ),
            submission,
        })
    }

    pub async fn exam_history(&self, user_id: i32, exam_id: i32) -> Result<Vec<ExamSubmission>> {
        self.stores
            .exams
            .get_exam(exam_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Exam {} not found", exam_id)))?;
        self.stores.exams.list_submissions(user_id, exam_id).await
    }

    pub async fn get_timer(&self, user_id: i32, class_id: i32) -> Result<TimerView> {
        self.stores
            .classes
            .get(class_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Class {} not found", class_id)))?;
        self.timers.view(user_id, class_id).await
    }

    pub async fn deactivate_timer(&self, user_id: i32, class_id: i32) -> Result<TimerView> {
        self.timers.deactivate(user_id, class_id).await
    }

    /// Active timers split by expiry. With `cleanup`, expired timers first get
    /// their auto-completion; only those that succeeded are switched off.
    pub async fn list_timers(&self, user_id: i32, cleanup: bool) -> Result<TimerListing> {
        let (active, expired) = self.timers.partition(user_id).await?;

        let mut auto_completed = Vec::new();
        let mut cleaned_up = 0;
        let mut failures = 0;
        let mut retired = Vec::new();
        if cleanup && !expired.is_empty() {
            let classes = self.stores.classes.list_ordered().await?;
            let (report, handled) = self.auto_complete_all(&classes, &expired).await;
            auto_completed = report.completions;
            failures = report.failures;
            cleaned_up = self.timers.retire(&handled).await?;
            retired = handled;
            tracing::info!(user_id, cleaned_up, failures, "Expired timers cleaned up");
        }

        Ok(TimerListing {
            summary: self.timers.summarize(&active, &expired, &retired, cleaned_up),
            auto_completed,
            failures,
        })
    }

    /// Client poll: auto-completes skipped assessments behind this user's
    /// expired timers.
    pub async fn check_expired_timers(&self, user_id: i32) -> Result<AutoCompletionReport> {
        let (_, expired) = self.timers.partition(user_id).await?;
        if expired.is_empty() {
            return Ok(AutoCompletionReport::default());
        }
        let classes = self.stores.classes.list_ordered().await?;
        let (report, _) = self.auto_complete_all(&classes, &expired).await;
        Ok(report)
    }

    /// Server-side sweep over every user's expired timers. Timers whose
    /// auto-completion succeeded are retired; failed ones stay for the next run.
    pub async fn sweep_expired_timers(&self) -> Result<AutoCompletionReport> {
        let expired = self.timers.list_expired().await?;
        if expired.is_empty() {
            return Ok(AutoCompletionReport::default());
        }
        let classes = self.stores.classes.list_ordered().await?;
        let (report, handled) = self.auto_complete_all(&classes, &expired).await;
        let retired = self.timers.retire(&handled).await?;
        if !report.completions.is_empty() || report.failures > 0 || retired > 0 {
            tracing::info!(
                timers = report.timers_checked,
                completions = report.completions.len(),
                failures = report.failures,
                retired,
                "Expired timer sweep finished"
            );
        }
        Ok(report)
    }

    /// Returns the report and the timers whose auto-completion succeeded.
    async fn auto_complete_all(
        &self,
        classes: &[Class],
        expired: &[ClassTimer],
    ) -> (AutoCompletionReport, Vec<ClassTimer>) {
        let mut report = AutoCompletionReport {
            timers_checked: expired.len(),
            ..AutoCompletionReport::default()
        };
        let mut handled = Vec::with_capacity(expired.len());
        for timer in expired {
            match self.auto_complete_for_timer(classes, timer).await {
                Ok(done) => {
                    report.completions.extend(done);
                    handled.push(timer.clone());
                }
                Err(e) => {
                    tracing::error!(
                        error = ?e,
                        user_id = timer.user_id,
                        class_id = timer.class_id,
                        "Auto-completion failed"
                    );
                    report.failures += 1;
                }
            }
        }
        (report, handled)
    }

    /// The assessments gating a timed class are those of the class right
    /// before it. Each one the user never attempted gets a failing attempt.
    async fn auto_complete_for_timer(
        &self,
        classes: &[Class],
        timer: &ClassTimer,
    ) -> Result<Vec<AutoCompletion>> {
        let Some(position) = classes.iter().position(|c| c.id == timer.class_id) else {
            return Ok(Vec::new());
        };
        if position == 0 {
            return Ok(Vec::new());
        }
        let prerequisite = &classes[position - 1];
        let now = self.clock.now();

        let mut completions = Vec::new();
        for assessment in &prerequisite.assessments {
            let report = ScoringService::unanswered(&assessment.questions);
            let created = self
                .stores
                .submissions
                .create_if_absent(NewSubmission {
                    user_id: timer.user_id,
                    assessment_id: assessment.id,
                    score: report.score_percent,
                    stored_answers: AnswerMap::new(),
                    detailed_results: report.per_question,
                    auto_submitted: true,
                    completed_at: now,
                })
                .await?;

            if created.is_some() {
                tracing::info!(
                    user_id = timer.user_id,
                    assessment_id = assessment.id,
                    "Unattempted assessment auto-submitted after timer expiry"
                );
                completions.push(AutoCompletion {
                    user_id: timer.user_id,
                    class_id: prerequisite.id,
                    assessment_id: assessment.id,
                    assessment_title: assessment.title.clone(),
                    timer_class_id: timer.class_id,
                    submitted_at: now,
                });
            }
        }
        Ok(completions)
    }
}

fn class_overview(
    class: &Class,
    access: ClassAccess,
    snapshot: &ProgressSnapshot,
    submissions: &[AssessmentSubmission],
    now: DateTime<Utc>,
) -> ClassOverview {
    let assessments = class
        .assessments
        .iter()
        .map(|a| {
            let sub = submissions.iter().find(|s| s.assessment_id == a.id);
            AssessmentProgress {
                assessment_id: a.id,
                title: a.title.clone(),
                total_questions: a.questions.len(),
                attempted: sub.is_some(),
                is_passed: sub.map(|s| s.is_passed).unwrap_or(false),
                score: sub.map(|s| s.score),
                attempt_count: sub.map(|s| s.attempt_count).unwrap_or(0),
                can_retake: sub.map(|s| !s.is_passed).unwrap_or(true),
                auto_submitted: sub.map(|s| s.auto_submitted).unwrap_or(false),
            }
        })
        .collect();

    ClassOverview {
        id: class.id,
        title: class.title.clone(),
        description: class.description.clone(),
        order: class.order,
        video_watched: snapshot.is_video_watched(class.id),
        timer: snapshot
            .timers
            .get(&class.id)
            .map(|t| TimerView::new(class.id, Some(t), now)),
        access,
        assessments,
    }
}
