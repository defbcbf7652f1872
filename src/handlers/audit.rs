//! Audit event query handler.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::audit::ListAuditEventsFilter;
use crate::startup::AppState;

/// Query params for listing audit events.
#[derive(Debug, Deserialize)]
pub struct ListAuditEventsQuery {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

/// List audit events with filtering and pagination.
///
/// GET /audit/events
#[tracing::instrument(skip(state), fields(action = ?query.action, entity_type = ?query.entity_type))]
pub async fn list_audit_events(
    State(state): State<AppState>,
    Query(query): Query<ListAuditEventsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = ListAuditEventsFilter {
        action: query.action,
        entity_type: query.entity_type,
        entity_id: query.entity_id,
        limit: query.limit,
        offset: query.offset,
    };
    let events = state.db.list_audit_events(&filter).await?;
    Ok(Json(json!({ "events": events })))
}
