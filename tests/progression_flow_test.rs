use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use course_backend::error::Error;
use course_backend::models::class::{Assessment, Class, Question, Video};
use course_backend::models::exam::Exam;
use course_backend::models::submission::AnswerMap;
use course_backend::repositories::memory::Catalog;
use course_backend::repositories::InMemoryStore;
use course_backend::services::progression_service::{
    NextClassTimer, ProgressionService, ProgressionSettings,
};
use course_backend::services::timer_service::TimerState;
use course_backend::services::unlock_service::ClassStatus;
use course_backend::utils::time::ManualClock;

const USER: i32 = 17;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap()
}

fn question(id: i32, options: &[&str], correct: &str, order: i32) -> Question {
    Question {
        id,
        text: format!("Question {}", id),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer: correct.to_string(),
        order,
    }
}

fn video(id: i32, class_id: i32) -> Video {
    Video {
        id,
        class_id,
        url: format!("https://cdn.example.com/videos/{}.mp4", id),
        poster: None,
        order: 0,
    }
}

/// Three classes. Class 1 carries the two-question quiz 101 unless
/// `first_class_assessed` is false; class 2 has quiz 201; class 3 has two
/// quizzes.
fn catalog(first_class_assessed: bool) -> Catalog {
    let first_assessments = if first_class_assessed {
        vec![Assessment {
            id: 101,
            class_id: 1,
            title: "Foundations quiz".into(),
            questions: vec![
                question(1001, &["A", "B", "C"], "B", 0),
                question(1002, &["X", "Y"], "X", 1),
            ],
        }]
    } else {
        Vec::new()
    };

    Catalog {
        classes: vec![
            Class {
                id: 1,
                title: "Foundations".into(),
                description: Some("Start here".into()),
                order: 1,
                videos: vec![video(11, 1)],
                assessments: first_assessments,
                resources: vec![],
            },
            Class {
                id: 2,
                title: "Practice".into(),
                description: None,
                order: 2,
                videos: vec![video(21, 2)],
                assessments: vec![Assessment {
                    id: 201,
                    class_id: 2,
                    title: "Practice quiz".into(),
                    questions: vec![question(2001, &["yes", "no"], "yes", 0)],
                }],
                resources: vec![],
            },
            Class {
                id: 3,
                title: "Wrap-up".into(),
                description: None,
                order: 3,
                videos: vec![video(31, 3)],
                assessments: vec![
                    Assessment {
                        id: 301,
                        class_id: 3,
                        title: "Recap part one".into(),
                        questions: vec![question(3001, &["p", "q"], "p", 0)],
                    },
                    Assessment {
                        id: 302,
                        class_id: 3,
                        title: "Recap part two".into(),
                        questions: vec![question(3002, &["r", "s"], "s", 0)],
                    },
                ],
                resources: vec![],
            },
        ],
        exams: vec![Exam {
            id: 7,
            title: "Final exam".into(),
            description: None,
            questions: vec![
                question(7001, &["1", "2", "3"], "3", 0),
                question(7002, &["red", "blue"], "blue", 1),
            ],
        }],
    }
}

fn setup_with(catalog: Catalog, settings: ProgressionSettings) -> (ProgressionService, ManualClock) {
    let clock = ManualClock::new(start());
    let store = Arc::new(InMemoryStore::from_catalog(catalog));
    let svc = ProgressionService::new(store, Arc::new(clock.clone()), settings);
    (svc, clock)
}

fn setup() -> (ProgressionService, ManualClock) {
    setup_with(catalog(true), ProgressionSettings::default())
}

fn perfect() -> AnswerMap {
    AnswerMap::from([(1001, 1), (1002, 0)])
}

#[tokio::test]
async fn fresh_learner_sees_only_the_first_class_open() {
    let (svc, _) = setup();
    let overview = svc.overview(USER).await.unwrap();

    assert_eq!(overview.total_count, 3);
    assert_eq!(overview.completed_count, 0);
    assert!(!overview.classes[0].access.locked);
    assert_eq!(overview.classes[0].access.status, ClassStatus::Available);
    assert!(overview.classes[0].access.assessments_locked);

    assert!(overview.classes[1].access.locked);
    assert!(overview.classes[1].access.reason.contains("Complete Class 1"));
    assert!(overview.classes[2].access.locked);
}

#[tokio::test]
async fn video_only_class_completes_but_next_class_waits_for_its_timer() {
    let (svc, clock) = setup_with(catalog(false), ProgressionSettings::default());

    let outcome = svc.video_ended(USER, 1, 11).await.unwrap();
    assert!(matches!(outcome.next_class, NextClassTimer::Armed { class_id: 2, .. }));

    let overview = svc.overview(USER).await.unwrap();
    assert_eq!(overview.classes[0].access.status, ClassStatus::Completed);
    assert_eq!(overview.classes[1].access.status, ClassStatus::Timed);
    assert!(overview.classes[1].access.locked);

    clock.advance(Duration::hours(24));
    let overview = svc.overview(USER).await.unwrap();
    assert_eq!(overview.classes[1].access.status, ClassStatus::Available);
}

#[tokio::test]
async fn running_timer_shows_remaining_time_then_unlocks() {
    let settings = ProgressionSettings {
        unlock_timer_duration: Duration::seconds(10),
        ..ProgressionSettings::default()
    };
    let (svc, clock) = setup_with(catalog(true), settings);

    svc.video_ended(USER, 1, 11).await.unwrap();
    let result = svc.submit_assessment(USER, 101, perfect()).await.unwrap();
    assert!(result.is_passed);

    let overview = svc.overview(USER).await.unwrap();
    let second = &overview.classes[1].access;
    assert_eq!(second.status, ClassStatus::Timed);
    assert!(second.reason.contains("0m 10s"), "reason was {}", second.reason);
    assert_eq!(second.timer_remaining_seconds, Some(10));

    clock.advance(Duration::seconds(11));
    let overview = svc.overview(USER).await.unwrap();
    assert!(!overview.classes[1].access.locked);
    assert_eq!(overview.classes[0].access.status, ClassStatus::Completed);
}

#[tokio::test]
async fn passed_assessment_rejects_resubmission() {
    let (svc, _) = setup();
    svc.video_ended(USER, 1, 11).await.unwrap();

    let first = svc.submit_assessment(USER, 101, perfect()).await.unwrap();
    assert_eq!(first.score, 100);
    assert_eq!(first.attempt_count, 1);
    assert!(!first.can_retake);

    let err = svc
        .submit_assessment(USER, 101, AnswerMap::from([(1001, 0), (1002, 1)]))
        .await
        .unwrap_err();
    match err {
        Error::Conflict { existing, .. } => {
            let existing = existing.expect("existing result attached");
            assert_eq!(existing["score"], 100);
            assert_eq!(existing["attempt_count"], 1);
        }
        other => panic!("expected conflict, got {:?}", other),
    }

    let status = svc.assessment_result(USER, 101).await.unwrap();
    let stored = status.result.unwrap();
    assert_eq!(stored.score, 100);
    assert_eq!(stored.attempt_count, 1);
}

#[tokio::test]
async fn failing_retakes_accumulate_and_keep_the_latest_score() {
    let (svc, _) = setup();
    svc.video_ended(USER, 1, 11).await.unwrap();

    let one = svc
        .submit_assessment(USER, 101, AnswerMap::from([(1001, 0), (1002, 0)]))
        .await
        .unwrap();
    assert_eq!((one.score, one.attempt_count, one.is_passed), (50, 1, false));

    let two = svc
        .submit_assessment(USER, 101, AnswerMap::from([(1001, 0), (1002, 1)]))
        .await
        .unwrap();
    assert_eq!((two.score, two.attempt_count, two.is_passed), (0, 2, false));

    let three = svc.submit_assessment(USER, 101, perfect()).await.unwrap();
    assert_eq!((three.score, three.attempt_count, three.is_passed), (100, 3, true));
}

#[tokio::test]
async fn finishing_a_video_arms_the_next_class_once() {
    let (svc, clock) = setup();

    let first = svc.video_ended(USER, 1, 11).await.unwrap();
    assert!(first.newly_watched);
    assert!(first.class_video_watched);
    let armed_expiry = match first.next_class {
        NextClassTimer::Armed { class_id, timer } => {
            assert_eq!(class_id, 2);
            assert_eq!(timer.state, TimerState::Active);
            assert_eq!(timer.timer_expires_at, Some(start() + Duration::hours(24)));
            timer.timer_expires_at
        }
        other => panic!("expected armed timer, got {:?}", other),
    };

    clock.advance(Duration::hours(1));
    let replay = svc.video_ended(USER, 1, 11).await.unwrap();
    assert!(!replay.newly_watched);
    assert_eq!(replay.progress.watched_at, Some(start()));
    match replay.next_class {
        NextClassTimer::AlreadyArmed { timer, .. } => {
            assert_eq!(timer.timer_expires_at, armed_expiry);
        }
        other => panic!("expected the existing timer, got {:?}", other),
    }
}

#[tokio::test]
async fn last_class_has_no_timer_to_arm() {
    let settings = ProgressionSettings {
        enforce_video_before_assessment: false,
        ..ProgressionSettings::default()
    };
    let (svc, _) = setup_with(catalog(true), settings);
    let outcome = svc.video_ended(USER, 3, 31).await.unwrap();
    assert_eq!(outcome.next_class, NextClassTimer::NoNextClass);
}

#[tokio::test]
async fn video_must_belong_to_the_named_class() {
    let (svc, _) = setup();
    let err = svc.video_ended(USER, 2, 11).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let err = svc.video_ended(USER, 1, 999).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn assessments_stay_closed_until_the_class_video_is_watched() {
    let (svc, _) = setup();

    let err = svc.submit_assessment(USER, 101, perfect()).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = svc
        .submit_assessment(USER, 201, AnswerMap::from([(2001, 0)]))
        .await
        .unwrap_err();
    match err {
        Error::Forbidden(reason) => assert!(reason.contains("Complete Class 1")),
        other => panic!("expected forbidden, got {:?}", other),
    }

    let relaxed = ProgressionSettings {
        enforce_video_before_assessment: false,
        ..ProgressionSettings::default()
    };
    let (svc, _) = setup_with(catalog(true), relaxed);
    assert!(svc.submit_assessment(USER, 101, perfect()).await.is_ok());
}

#[tokio::test]
async fn by_class_submission_needs_exactly_one_assessment() {
    let relaxed = ProgressionSettings {
        enforce_video_before_assessment: false,
        ..ProgressionSettings::default()
    };
    let (svc, _) = setup_with(catalog(true), relaxed);

    let result = svc.submit_class_assessment(USER, 1, perfect()).await.unwrap();
    assert_eq!(result.assessment_id, 101);

    let err = svc
        .submit_class_assessment(USER, 3, AnswerMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let err = svc
        .submit_class_assessment(USER, 99, AnswerMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn unattempted_result_reports_no_attempts() {
    let (svc, _) = setup();
    let status = svc.assessment_result(USER, 101).await.unwrap();
    assert!(!status.attempted);
    assert_eq!(status.attempt_count, 0);
    assert!(status.result.is_none());
    assert_eq!(status.message, "No attempts made yet");

    let err = svc.assessment_result(USER, 404).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn expired_timer_fails_the_skipped_prerequisite_once() {
    let (svc, clock) = setup();
    svc.video_ended(USER, 1, 11).await.unwrap();

    let early = svc.check_expired_timers(USER).await.unwrap();
    assert!(early.completions.is_empty());

    clock.advance(Duration::hours(25));
    let report = svc.check_expired_timers(USER).await.unwrap();
    assert_eq!(report.completions.len(), 1);
    let done = &report.completions[0];
    assert_eq!(done.assessment_id, 101);
    assert_eq!(done.class_id, 1);
    assert_eq!(done.timer_class_id, 2);

    let status = svc.assessment_result(USER, 101).await.unwrap();
    let stored = status.result.unwrap();
    assert!(stored.auto_submitted);
    assert_eq!(stored.score, 0);
    assert!(stored.can_retake);
    assert!(stored.detailed_results.iter().all(|r| r.selected_index.is_none()));

    let again = svc.check_expired_timers(USER).await.unwrap();
    assert!(again.completions.is_empty());
    let sweep = svc.sweep_expired_timers().await.unwrap();
    assert!(sweep.completions.is_empty());
    assert_eq!(sweep.failures, 0);
}

#[tokio::test]
async fn expiry_never_overwrites_a_real_attempt() {
    let (svc, clock) = setup();
    svc.video_ended(USER, 1, 11).await.unwrap();
    svc.submit_assessment(USER, 101, AnswerMap::from([(1001, 0), (1002, 0)]))
        .await
        .unwrap();

    clock.advance(Duration::hours(25));
    let report = svc.sweep_expired_timers().await.unwrap();
    assert_eq!(report.timers_checked, 1);
    assert!(report.completions.is_empty());

    let stored = svc.assessment_result(USER, 101).await.unwrap().result.unwrap();
    assert_eq!(stored.score, 50);
    assert!(!stored.auto_submitted);
}

#[tokio::test]
async fn sweep_retires_handled_timers() {
    let (svc, clock) = setup();
    svc.video_ended(USER, 1, 11).await.unwrap();
    svc.submit_assessment(USER, 101, perfect()).await.unwrap();

    clock.advance(Duration::hours(25));
    let first = svc.sweep_expired_timers().await.unwrap();
    assert_eq!(first.timers_checked, 1);
    assert!(first.completions.is_empty());
    assert_eq!(svc.get_timer(USER, 2).await.unwrap().state, TimerState::Inactive);

    for _ in 0..30 {
        clock.advance(Duration::days(1));
        let later = svc.sweep_expired_timers().await.unwrap();
        assert_eq!(later.timers_checked, 0);
    }

    let overview = svc.overview(USER).await.unwrap();
    assert_eq!(overview.classes[1].access.status, ClassStatus::Available);
}

#[tokio::test]
async fn timer_listing_with_cleanup_retires_expired_timers() {
    let (svc, clock) = setup();
    svc.video_ended(USER, 1, 11).await.unwrap();

    let listing = svc.list_timers(USER, false).await.unwrap();
    assert_eq!(listing.summary.active_count, 1);
    assert_eq!(listing.summary.expired_count, 0);

    clock.advance(Duration::hours(30));
    let listing = svc.list_timers(USER, true).await.unwrap();
    assert_eq!(listing.summary.active_count, 0);
    assert_eq!(listing.summary.expired_count, 1);
    assert_eq!(listing.summary.cleaned_up, 1);
    assert_eq!(listing.auto_completed.len(), 1);
    assert_eq!(listing.failures, 0);

    let timer = svc.get_timer(USER, 2).await.unwrap();
    assert_eq!(timer.state, TimerState::Inactive);
    assert!(!timer.timer_active);
}

#[tokio::test]
async fn timer_lookup_and_deactivation() {
    let (svc, _) = setup();

    assert_eq!(svc.get_timer(USER, 2).await.unwrap().state, TimerState::Absent);
    assert!(matches!(
        svc.get_timer(USER, 99).await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        svc.deactivate_timer(USER, 2).await.unwrap_err(),
        Error::NotFound(_)
    ));

    svc.video_ended(USER, 1, 11).await.unwrap();
    let view = svc.deactivate_timer(USER, 2).await.unwrap();
    assert_eq!(view.state, TimerState::Inactive);

    // An inactive timer no longer gates the class.
    let overview = svc.overview(USER).await.unwrap();
    assert_eq!(overview.classes[1].access.status, ClassStatus::Locked);
    assert!(overview.classes[1].timer.is_none());
}

#[tokio::test]
async fn per_video_timer_needs_a_watch_record_and_rearms() {
    let (svc, clock) = setup();

    let err = svc.start_video_timer(USER, 11).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(svc.get_timer(USER, 2).await.unwrap().state, TimerState::Absent);

    svc.video_ended(USER, 1, 11).await.unwrap();
    clock.advance(Duration::hours(2));
    match svc.start_video_timer(USER, 11).await.unwrap() {
        NextClassTimer::Armed { class_id, timer } => {
            assert_eq!(class_id, 2);
            assert_eq!(
                timer.timer_expires_at,
                Some(start() + Duration::hours(26))
            );
        }
        other => panic!("expected armed timer, got {:?}", other),
    }
}

#[tokio::test]
async fn exam_submissions_are_all_kept_newest_first() {
    let (svc, clock) = setup();

    let first = svc
        .submit_exam(USER, 7, AnswerMap::from([(7001, 2), (7002, 0)]))
        .await
        .unwrap();
    assert_eq!(first.submission.score, 50);
    assert_eq!(first.submission.correct_answers, 1);
    assert_eq!(first.submission.total_questions, 2);

    clock.advance(Duration::minutes(5));
    let second = svc
        .submit_exam(USER, 7, AnswerMap::from([(7001, 2), (7002, 1)]))
        .await
        .unwrap();
    assert_eq!(second.submission.score, 100);

    let history = svc.exam_history(USER, 7).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.submission.id);
    assert_eq!(history[1].id, first.submission.id);

    assert!(svc.exam_history(USER + 1, 7).await.unwrap().is_empty());
    assert!(matches!(
        svc.submit_exam(USER, 8, AnswerMap::new()).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn class_detail_never_exposes_answers() {
    let (svc, _) = setup();
    let detail = svc.class_detail(USER, 1).await.unwrap();
    assert_eq!(detail.videos.len(), 1);
    assert_eq!(detail.assessment_content[0].questions.len(), 2);

    let json = serde_json::to_string(&detail).unwrap();
    assert!(!json.contains("correct_answer"));

    assert!(matches!(
        svc.class_detail(USER, 42).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn concurrent_perfect_submissions_record_a_single_pass() {
    let (svc, _) = setup();
    svc.video_ended(USER, 1, 11).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.submit_assessment(USER, 101, perfect()).await })
        })
        .collect();

    let mut recorded = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => recorded += 1,
            Err(Error::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }
    assert_eq!(recorded, 1);
    assert_eq!(conflicts, 7);

    let stored = svc.assessment_result(USER, 101).await.unwrap().result.unwrap();
    assert_eq!(stored.attempt_count, 1);
}

#[tokio::test]
async fn progress_is_scoped_per_user() {
    let (svc, _) = setup();
    svc.video_ended(USER, 1, 11).await.unwrap();
    svc.submit_assessment(USER, 101, perfect()).await.unwrap();

    let other = svc.overview(USER + 1).await.unwrap();
    assert_eq!(other.completed_count, 0);
    assert!(!other.classes[0].video_watched);
    assert!(other.classes[1].access.locked);
}
