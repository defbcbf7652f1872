//! Audit trail. Appends participate in the caller's transaction so an
//! audited action and its audit record commit or roll back together.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::AppError;

/// One audit entry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditEvent {
    pub audit_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub detail: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Filter parameters for listing audit events.
#[derive(Debug, Clone, Default)]
pub struct ListAuditEventsFilter {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// Append one audit entry on the given connection. Pass the open transaction
/// of the action being audited.
pub async fn record_audit(
    conn: &mut PgConnection,
    action: &str,
    entity_type: &str,
    entity_id: Option<Uuid>,
    actor_id: Option<Uuid>,
    detail: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (audit_id, action, entity_type, entity_id, actor_id, detail)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(actor_id)
    .bind(detail)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to write audit entry: {}", e)))?;

    Ok(())
}
