//! Best-effort audit log and notification inserts
//!
//! These record user-visible notifications and an activity trail. Failures
//! are logged and swallowed; they never fail the operation that triggered
//! them.

use sqlx::PgPool;
use uuid::Uuid;

pub async fn log_activity(
    db: &PgPool,
    user_id: Option<Uuid>,
    action: &str,
    entity_type: Option<&str>,
    entity_id: Option<&str>,
    description: &str,
) {
    let result = sqlx::query(
        "INSERT INTO activity_logs (id, user_id, action, entity_type, entity_id, description)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(description)
    .execute(db)
    .await;

    if let Err(err) = result {
        tracing::error!(action, "failed to write activity log: {}", err);
    }
}

pub async fn notify_user(
    db: &PgPool,
    user_id: Uuid,
    kind: &str,
    title: &str,
    message: &str,
    link: Option<&str>,
) {
    let result = sqlx::query(
        "INSERT INTO notifications (id, user_id, type, title, message, link)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(message)
    .bind(link)
    .execute(db)
    .await;

    if let Err(err) = result {
        tracing::error!(kind, "failed to insert notification: {}", err);
    }
}
