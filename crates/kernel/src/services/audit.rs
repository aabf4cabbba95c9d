//! Audit logging service.
//!
//! Records authoring and publishing actions: entity creation, draft
//! saves, publish/discard (single and bulk), deletions, and resume
//! activation.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::debug;

/// Audit logging service.
#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    /// Create a new audit service.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Log an auditable action.
    pub async fn log(
        &self,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, action, entity_type, entity_id, details, created)
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5)
            "#,
        )
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(&details)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("failed to write audit log")?;

        debug!(
            action = %action,
            entity_type = %entity_type,
            entity_id = %entity_id,
            "audit log entry created"
        );

        Ok(())
    }

    /// Cleanup audit log entries beyond the retention period.
    pub async fn cleanup(&self, retention_days: i64) -> Result<u64> {
        let cutoff = chrono::Utc::now().timestamp() - (retention_days * 86400);

        let result = sqlx::query("DELETE FROM audit_log WHERE created < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("failed to cleanup audit log")?;

        Ok(result.rows_affected())
    }
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish()
    }
}
