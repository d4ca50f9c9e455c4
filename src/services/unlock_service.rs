use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::models::class::Class;
use crate::models::class_timer::ClassTimer;
use crate::models::submission::AssessmentSubmission;
use crate::utils::time::format_remaining;

/// How many of a class's videos must be watched before the class counts as
/// "video watched".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCompletionPolicy {
    #[default]
    Any,
    All,
}

impl std::str::FromStr for VideoCompletionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            other => Err(format!("unknown video completion policy '{}'", other)),
        }
    }
}

/// Everything the evaluator needs about one user, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    pub video_watched: HashMap<i32, bool>,
    pub assessment_passed: HashMap<i32, bool>,
    pub timers: HashMap<i32, ClassTimer>,
}

impl ProgressSnapshot {
    pub fn build(
        classes: &[Class],
        watched_video_ids: &HashSet<i32>,
        submissions: &[AssessmentSubmission],
        timers: Vec<ClassTimer>,
        policy: VideoCompletionPolicy,
    ) -> Self {
        let video_watched = classes
            .iter()
            .map(|class| {
                let mut ids = class.videos.iter().map(|v| v.id);
                let watched = !class.videos.is_empty()
                    && match policy {
                        VideoCompletionPolicy::Any => ids.any(|id| watched_video_ids.contains(&id)),
                        VideoCompletionPolicy::All => ids.all(|id| watched_video_ids.contains(&id)),
                    };
                (class.id, watched)
            })
            .collect();

        let assessment_passed = submissions
            .iter()
            .map(|s| (s.assessment_id, s.is_passed))
            .collect();

        let timers = timers.into_iter().map(|t| (t.class_id, t)).collect();

        Self {
            video_watched,
            assessment_passed,
            timers,
        }
    }

    pub fn is_video_watched(&self, class_id: i32) -> bool {
        self.video_watched.get(&class_id).copied().unwrap_or(false)
    }

    pub fn all_assessments_passed(&self, class: &Class) -> bool {
        class
            .assessments
            .iter()
            .all(|a| self.assessment_passed.get(&a.id).copied().unwrap_or(false))
    }

    pub fn is_completed(&self, class: &Class) -> bool {
        class.has_valid_id()
            && self.is_video_watched(class.id)
            && self.all_assessments_passed(class)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    Available,
    Completed,
    Locked,
    Timed,
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassAccess {
    pub class_id: i32,
    pub position: usize,
    pub status: ClassStatus,
    pub locked: bool,
    pub reason: String,
    /// Assessments open only once the class is unlocked and its video watched.
    pub assessments_locked: bool,
    pub timer_remaining_seconds: Option<i64>,
}

impl ClassAccess {
    fn new(class_id: i32, position: usize, status: ClassStatus, reason: String) -> Self {
        Self {
            class_id,
            position,
            status,
            locked: matches!(
                status,
                ClassStatus::Locked | ClassStatus::Timed | ClassStatus::Invalid
            ),
            reason,
            assessments_locked: true,
            timer_remaining_seconds: None,
        }
    }
}

/// Computes lock state for every class, in list order.
///
/// The first class is always open. A completed class is always open. Any other
/// class needs its predecessor completed and its unlock timer (if running) to
/// have run out. A malformed entry is reported as invalid without affecting the
/// evaluation of the rest of the list.
pub fn evaluate(
    classes: &[Class],
    snapshot: &ProgressSnapshot,
    now: DateTime<Utc>,
) -> Vec<ClassAccess> {
    (0..classes.len())
        .map(|idx| evaluate_one(classes, idx, snapshot, now))
        .collect()
}

fn evaluate_one(
    classes: &[Class],
    idx: usize,
    snapshot: &ProgressSnapshot,
    now: DateTime<Utc>,
) -> ClassAccess {
    let class = &classes[idx];

    if !class.has_valid_id() {
        return ClassAccess::new(
            class.id,
            idx,
            ClassStatus::Invalid,
            "Class data is invalid".to_string(),
        );
    }

    let completed = snapshot.is_completed(class);
    let open_status = if completed {
        ClassStatus::Completed
    } else {
        ClassStatus::Available
    };

    let mut access = if idx == 0 || completed {
        ClassAccess::new(class.id, idx, open_status, String::new())
    } else {
        let previous = &classes[idx - 1];
        if !snapshot.is_completed(previous) {
            ClassAccess::new(
                class.id,
                idx,
                ClassStatus::Locked,
                format!(
                    "Complete Class {} (\"{}\") first: watch the video and score 100% on all assessments.",
                    idx, previous.title
                ),
            )
        } else {
            match running_timer(snapshot.timers.get(&class.id), now) {
                Some(remaining) => {
                    let mut timed = ClassAccess::new(
                        class.id,
                        idx,
                        ClassStatus::Timed,
                        format!("Available in {}", format_remaining(remaining)),
                    );
                    timed.timer_remaining_seconds = Some(remaining.num_seconds().max(0));
                    timed
                }
                None => ClassAccess::new(class.id, idx, ClassStatus::Available, String::new()),
            }
        }
    };

    access.assessments_locked = access.locked || !snapshot.is_video_watched(class.id);
    access
}

/// Remaining time of an active timer that has not yet expired.
fn running_timer(timer: Option<&ClassTimer>, now: DateTime<Utc>) -> Option<chrono::Duration> {
    let timer = timer.filter(|t| t.timer_active)?;
    let expires_at = timer.timer_expires_at?;
    (now < expires_at).then(|| expires_at - now)
}
