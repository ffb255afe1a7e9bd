use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{AuditRepo, RepoError};
use crate::domain::entities::AuditLogRecord;

const MAX_AUDIT_PAGE: u32 = 200;

/// Append-only record of admin mutations, cache purges and site imports.
#[derive(Clone)]
pub struct AdminAuditService {
    repo: Arc<dyn AuditRepo>,
}

impl AdminAuditService {
    pub fn new(repo: Arc<dyn AuditRepo>) -> Self {
        Self { repo }
    }

    /// Store one entry. `payload` is kept as JSON text next to the action.
    pub async fn record<S>(
        &self,
        actor: &str,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        payload: Option<&S>,
    ) -> Result<(), RepoError>
    where
        S: Serialize,
    {
        let payload_text = payload
            .map(serde_json::to_string)
            .transpose()
            .map_err(RepoError::from_persistence)?;

        self.repo
            .append_log(AuditLogRecord {
                id: Uuid::new_v4(),
                actor: actor.to_owned(),
                action: action.to_owned(),
                entity_type: entity_type.to_owned(),
                entity_id: entity_id.map(str::to_owned),
                payload_text,
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(
            target: "quire::admin",
            actor,
            action,
            entity_type,
            entity_id = entity_id.unwrap_or("-"),
            "Admin action recorded"
        );
        Ok(())
    }

    /// Newest entries first, at most `MAX_AUDIT_PAGE` of them.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
        self.repo.list_recent(limit.clamp(1, MAX_AUDIT_PAGE)).await
    }
}
