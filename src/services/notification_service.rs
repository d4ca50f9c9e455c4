use crate::error::Result;
use crate::models::notification_log::NotificationLog;
use crate::services::progression_service::AutoCompletion;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub const AUTO_COMPLETION_EVENT: &str = "assessment.auto_submitted";

const OUTBOX_COLUMNS: &str = "id, user_id, event_type, payload, target_url, http_status, attempts, \
     max_attempts, next_retry_at, status, created_at";

/// Webhook body announcing an assessment that was failed automatically.
pub fn auto_completion_payload(event: &AutoCompletion) -> JsonValue {
    json!({
        "event": AUTO_COMPLETION_EVENT,
        "user_id": event.user_id,
        "class_id": event.class_id,
        "assessment_id": event.assessment_id,
        "assessment_title": event.assessment_title,
        "unlocked_class_id": event.timer_class_id,
        "score": 0,
        "submitted_at": event.submitted_at,
        "message": format!(
            "The unlock window closed before \"{}\" was attempted, so it was recorded with a score of 0.",
            event.assessment_title
        ),
    })
}

#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    client: Client,
    target_url: String,
    secret: Option<String>,
}

impl NotificationService {
    pub fn new(pool: PgPool, target_url: String, secret: Option<String>) -> Self {
        Self {
            pool,
            client: Client::new(),
            target_url,
            secret,
        }
    }

    pub async fn enqueue(
        &self,
        user_id: i32,
        event_type: &str,
        payload: &JsonValue,
    ) -> Result<NotificationLog> {
        let sql = format!(
            "INSERT INTO notification_outbox (user_id, event_type, payload, target_url, status)
             VALUES ($1, $2, $3, $4, 'pending')
             RETURNING {}",
            OUTBOX_COLUMNS
        );
        let row = sqlx::query_as::<_, NotificationLog>(&sql)
            .bind(user_id)
            .bind(event_type)
            .bind(payload)
            .bind(&self.target_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// Queues one webhook per auto-completion. A failed insert is logged and
    /// does not stop the rest.
    pub async fn enqueue_auto_completions(&self, events: &[AutoCompletion]) -> usize {
        let mut queued = 0;
        for event in events {
            let payload = auto_completion_payload(event);
            match self.enqueue(event.user_id, AUTO_COMPLETION_EVENT, &payload).await {
                Ok(_) => queued += 1,
                Err(e) => tracing::error!(
                    error = ?e,
                    user_id = event.user_id,
                    assessment_id = event.assessment_id,
                    "Failed to queue auto-completion notification"
                ),
            }
        }
        queued
    }

    pub async fn deliver_once(&self, log_id: Uuid) -> Result<()> {
        let sql = format!("SELECT {} FROM notification_outbox WHERE id = $1", OUTBOX_COLUMNS);
        let log = sqlx::query_as::<_, NotificationLog>(&sql)
            .bind(log_id)
            .fetch_one(&self.pool)
            .await?;

        let mut request = self.client.post(&log.target_url).json(&log.payload);
        if let Some(secret) = &self.secret {
            request = request.header("X-Webhook-Secret", secret);
        }

        match request.send().await {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                sqlx::query(
                    r#"UPDATE notification_outbox
                       SET http_status = $1,
                           status = CASE WHEN $1 BETWEEN 200 AND 299 THEN 'success' ELSE 'failed' END,
                           attempts = attempts + 1
                       WHERE id = $2"#,
                )
                .bind(status)
                .bind(log.id)
                .execute(&self.pool)
                .await?;
            }
            Err(err) => {
                tracing::warn!(error = %err, notification_id = %log.id, "Notification delivery failed");
                sqlx::query(
                    r#"UPDATE notification_outbox
                       SET status = 'failed', attempts = attempts + 1
                       WHERE id = $1"#,
                )
                .bind(log.id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Delivers at most one due notification. Returns whether one was picked.
    pub async fn run_once(&self) -> Result<bool> {
        let row_opt = sqlx::query(
            r#"SELECT id FROM notification_outbox
               WHERE (status = 'pending' OR (status = 'failed' AND attempts < max_attempts))
                 AND (next_retry_at IS NULL OR next_retry_at <= NOW())
               ORDER BY created_at ASC
               FOR UPDATE SKIP LOCKED
               LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row_opt else { return Ok(false) };
        let id: Uuid = row.try_get("id")?;

        let _ = self.deliver_once(id).await;

        let row2 = sqlx::query(
            r#"SELECT attempts, max_attempts, status FROM notification_outbox WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        let attempts: i32 = row2.try_get("attempts")?;
        let max_attempts: i32 = row2.try_get("max_attempts")?;
        let status: String = row2.try_get("status")?;

        if status == "failed" && attempts < max_attempts {
            sqlx::query(
                r#"UPDATE notification_outbox
                   SET next_retry_at = NOW() + make_interval(secs => LEAST(3600, 30 * power(2::float, GREATEST(0, attempts-1))::int))
                   WHERE id = $1"#,
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn payload_names_the_failed_assessment() {
        let event = AutoCompletion {
            user_id: 4,
            class_id: 1,
            assessment_id: 11,
            assessment_title: "Intro quiz".into(),
            timer_class_id: 2,
            submitted_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
        };
        let payload = auto_completion_payload(&event);
        assert_eq!(payload["event"], AUTO_COMPLETION_EVENT);
        assert_eq!(payload["assessment_id"], 11);
        assert_eq!(payload["unlocked_class_id"], 2);
        assert_eq!(payload["score"], 0);
        assert!(payload["message"].as_str().unwrap().contains("Intro quiz"));
    }
}
