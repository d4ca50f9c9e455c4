use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::class_timer::ClassTimer;
use crate::repositories::ClassTimerRepository;
use crate::utils::time::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Absent,
    Active,
    Expired,
    Inactive,
}

impl TimerState {
    pub fn of(timer: Option<&ClassTimer>, now: DateTime<Utc>) -> Self {
        match timer {
            None => Self::Absent,
            Some(t) if !t.timer_active => Self::Inactive,
            Some(t) => match t.timer_expires_at {
                Some(at) if now < at => Self::Active,
                _ => Self::Expired,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimerView {
    pub class_id: i32,
    pub state: TimerState,
    pub timer_active: bool,
    pub timer_expires_at: Option<DateTime<Utc>>,
    pub remaining_seconds: i64,
}

impl TimerView {
    pub fn new(class_id: i32, timer: Option<&ClassTimer>, now: DateTime<Utc>) -> Self {
        let state = TimerState::of(timer, now);
        let expires_at = timer.and_then(|t| t.timer_expires_at);
        let remaining_seconds = match (state, expires_at) {
            (TimerState::Active, Some(at)) => (at - now).num_seconds().max(0),
            _ => 0,
        };
        Self {
            class_id,
            state,
            timer_active: timer.map(|t| t.timer_active).unwrap_or(false),
            timer_expires_at: expires_at,
            remaining_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSummary {
    pub active: Vec<TimerView>,
    pub expired: Vec<TimerView>,
    pub active_count: usize,
    pub expired_count: usize,
    pub cleaned_up: usize,
}

/// Arms, reads and retires per-class unlock timers.
#[derive(Clone)]
pub struct TimerService {
    timers: Arc<dyn ClassTimerRepository>,
    clock: Arc<dyn Clock>,
    duration: Duration,
}

impl TimerService {
    pub fn new(timers: Arc<dyn ClassTimerRepository>, clock: Arc<dyn Clock>, duration: Duration) -> Self {
        Self {
            timers,
            clock,
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Starts (or restarts) the countdown on `class_id`, superseding any
    /// previous expiry.
    pub async fn arm(&self, user_id: i32, class_id: i32) -> Result<ClassTimer> {
        let now = self.clock.now();
        let expires_at = now + self.duration;
        let timer = self
            .timers
            .upsert(user_id, class_id, Some(expires_at), true, now)
            .await?;
        tracing::info!(user_id, class_id, %expires_at, "Unlock timer armed");
        Ok(timer)
    }

    pub async fn find(&self, user_id: i32, class_id: i32) -> Result<Option<ClassTimer>> {
        self.timers.get(user_id, class_id).await
    }

    pub async fn view(&self, user_id: i32, class_id: i32) -> Result<TimerView> {
        let timer = self.timers.get(user_id, class_id).await?;
        Ok(TimerView::new(class_id, timer.as_ref(), self.clock.now()))
    }

    pub async fn deactivate(&self, user_id: i32, class_id: i32) -> Result<TimerView> {
        let now = self.clock.now();
        let timer = self
            .timers
            .deactivate(user_id, class_id, now)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No timer for class {}", class_id)))?;
        tracing::info!(user_id, class_id, "Unlock timer deactivated");
        Ok(TimerView::new(class_id, Some(&timer), now))
    }

    /// Splits a user's active timers into still-running and expired.
    pub async fn partition(&self, user_id: i32) -> Result<(Vec<ClassTimer>, Vec<ClassTimer>)> {
        let now = self.clock.now();
        let timers = self.timers.list_active(user_id).await?;
        Ok(timers
            .into_iter()
            .partition(|t| TimerState::of(Some(t), now) == TimerState::Active))
    }

    /// Flips the given expired timers to inactive; returns how many changed.
    pub async fn retire(&self, expired: &[ClassTimer]) -> Result<usize> {
        let now = self.clock.now();
        let mut retired = 0;
        for timer in expired {
            if self
                .timers
                .deactivate(timer.user_id, timer.class_id, now)
                .await?
                .is_some()
            {
                retired += 1;
            }
        }
        Ok(retired)
    }

    pub async fn list_expired(&self) -> Result<Vec<ClassTimer>> {
        self.timers.list_expired(self.clock.now()).await
    }

    /// Views for a listing. Expired timers present in `retired` are shown as
    /// switched off.
    pub fn summarize(
        &self,
        active: &[ClassTimer],
        expired: &[ClassTimer],
        retired: &[ClassTimer],
        cleaned_up: usize,
    ) -> TimerSummary {
        let now = self.clock.now();
        let views = |timers: &[ClassTimer]| -> Vec<TimerView> {
            timers
                .iter()
                .map(|t| TimerView::new(t.class_id, Some(t), now))
                .collect()
        };
        let active = views(active);
        let mut expired = views(expired);
        for view in expired.iter_mut() {
            if retired.iter().any(|t| t.class_id == view.class_id) {
                view.state = TimerState::Inactive;
                view.timer_active = false;
                view.timer_expires_at = None;
            }
        }
        TimerSummary {
            active_count: active.len(),
            expired_count: expired.len(),
            active,
            expired,
            cleaned_up,
        }
    }
}
