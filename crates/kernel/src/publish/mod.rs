//! Draft/publish engine.
//!
//! The single place that moves values between the draft and published
//! shadows. Publishing copies draft values into the published columns and
//! flips `is_published`; discarding copies the other way (or resets the
//! draft where nothing was ever published). Either direction covers the
//! entity and its live children as one store transaction, so a failure
//! leaves the prior state intact.
//!
//! Bulk operations deliberately trade that atomicity for isolation: each
//! root entity publishes or discards in its own transaction, and failures
//! are collected into a [`BatchReport`] instead of aborting siblings.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::content::{
    descriptor, validate_fields, values_equal, EntityType, ALL_ENTITY_TYPES, ROOT_ENTITY_TYPES,
};
use crate::error::{AppError, AppResult};
use crate::models::{ChangeSummary, EntityRow};
use crate::store::{ColumnWrite, ContentStore, RowWrite};

/// One failed item in a bulk operation.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub item: ChangeSummary,
    pub error: String,
}

/// Outcome of `publish_all` / `discard_all`.
///
/// Always returned, never thrown: the caller decides whether a non-zero
/// failure count is fatal to the overall action, and can retry exactly
/// the named items.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<ChangeSummary>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// True when every item went through.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Draft/publish engine over an injected content store.
#[derive(Clone)]
pub struct PublishService {
    store: Arc<dyn ContentStore>,
}

impl PublishService {
    /// Create a new engine.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Fetch a row, treating missing and soft-deleted rows as not found.
    async fn fetch_live(&self, entity: EntityType, id: Uuid) -> AppResult<EntityRow> {
        let row = self.store.fetch(entity, id).await?;
        match row {
            Some(row) if !row.is_deleted() => Ok(row),
            _ => Err(AppError::NotFound),
        }
    }

    /// The row plus its live children — the unit publish and discard
    /// operate on. The cascade is exactly one level deep.
    async fn subtree(&self, row: &EntityRow) -> AppResult<Vec<EntityRow>> {
        let mut rows = vec![row.clone()];
        if let Some(child) = descriptor(row.entity).children {
            rows.extend(self.store.list_children(child, row.id).await?);
        }
        Ok(rows)
    }

    /// Save draft values for an entity. Published columns are untouched;
    /// there is no cascade.
    pub async fn save_draft(
        &self,
        entity: EntityType,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> AppResult<EntityRow> {
        let desc = descriptor(entity);
        validate_fields(desc, &fields, false)?;

        let row = self.fetch_live(entity, id).await?;
        if fields.is_empty() {
            return Ok(row);
        }

        let mut write = RowWrite::new(entity, id);
        for spec in desc.fields {
            if let Some(value) = fields.get(spec.name) {
                write.push(ColumnWrite::Draft(spec.name, value.clone()));
            }
        }

        if !self.store.update(write).await? {
            return Err(AppError::NotFound);
        }

        debug!(entity = %entity, id = %id, fields = fields.len(), "draft saved");
        self.fetch_live(entity, id).await
    }

    /// Publish an entity: copy the draft snapshot of the whole subtree
    /// into the published columns, atomically.
    pub async fn publish(&self, entity: EntityType, id: Uuid) -> AppResult<EntityRow> {
        let row = self.fetch_live(entity, id).await?;
        let rows = self.subtree(&row).await?;

        let mut writes = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut write = RowWrite::new(row.entity, row.id);
            for spec in descriptor(row.entity).fields {
                let value = row.draft_value(spec.name).cloned().unwrap_or(Value::Null);
                write.push(ColumnWrite::Published(spec.name, value));
            }
            write.push(ColumnWrite::IsPublished(true));
            writes.push(write);
        }

        self.store
            .update_all(writes)
            .await
            .map_err(AppError::PublishFailed)?;

        info!(entity = %entity, id = %id, rows = rows.len(), "published");
        self.fetch_live(entity, id).await
    }

    /// Discard an entity's draft: reset the subtree's draft columns to the
    /// published snapshot, or to defaults where nothing was ever published.
    /// Published columns are never altered.
    pub async fn discard(&self, entity: EntityType, id: Uuid) -> AppResult<EntityRow> {
        let row = self.fetch_live(entity, id).await?;
        let rows = self.subtree(&row).await?;

        let mut writes = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut write = RowWrite::new(row.entity, row.id);
            for spec in descriptor(row.entity).fields {
                let value = if row.is_published {
                    row.published_value(spec.name)
                        .cloned()
                        .unwrap_or(Value::Null)
                } else {
                    Value::Null
                };
                write.push(ColumnWrite::Draft(spec.name, value));
            }
            writes.push(write);
        }

        self.store
            .update_all(writes)
            .await
            .map_err(AppError::DiscardFailed)?;

        info!(entity = %entity, id = %id, rows = rows.len(), "draft discarded");
        self.fetch_live(entity, id).await
    }

    /// Check whether an entity has unpublished changes.
    ///
    /// The baseline is the published snapshot once one exists, otherwise
    /// per-field defaults — so a never-published entity whose draft was
    /// discarded reads clean. Parents also report dirty when any live
    /// child does. Pure read.
    pub async fn has_unpublished_changes(&self, entity: EntityType, id: Uuid) -> AppResult<bool> {
        let row = self.fetch_live(entity, id).await?;
        self.entity_has_changes(&row).await
    }

    async fn entity_has_changes(&self, row: &EntityRow) -> AppResult<bool> {
        if row_is_dirty(row) {
            return Ok(true);
        }
        if let Some(child) = descriptor(row.entity).children {
            let children = self.store.list_children(child, row.id).await?;
            return Ok(children.iter().any(row_is_dirty));
        }
        Ok(false)
    }

    /// Every entity with unpublished changes, ordered by entity type then
    /// `display_order`. Children are listed in their own right.
    pub async fn list_unpublished_items(&self) -> AppResult<Vec<ChangeSummary>> {
        let mut items = Vec::new();
        for entity in ALL_ENTITY_TYPES {
            let desc = descriptor(entity);
            for row in self.store.list(entity).await? {
                if self.entity_has_changes(&row).await? {
                    items.push(ChangeSummary {
                        id: row.id,
                        entity,
                        display_name: row.display_name(desc),
                    });
                }
            }
        }
        Ok(items)
    }

    /// Publish everything with unpublished changes.
    ///
    /// Walks root entity types only — a dirty child makes its parent
    /// dirty, so the parent cascade reaches it. Per-entity transactions:
    /// one failure never aborts the rest.
    pub async fn publish_all(&self) -> AppResult<BatchReport> {
        self.sweep(SweepAction::Publish).await
    }

    /// Discard every unpublished change, with the same per-entity
    /// isolation as [`Self::publish_all`].
    pub async fn discard_all(&self) -> AppResult<BatchReport> {
        self.sweep(SweepAction::Discard).await
    }

    async fn sweep(&self, action: SweepAction) -> AppResult<BatchReport> {
        let mut report = BatchReport::default();

        for entity in ROOT_ENTITY_TYPES {
            let desc = descriptor(entity);
            for row in self.store.list(entity).await? {
                if !self.entity_has_changes(&row).await? {
                    continue;
                }

                let item = ChangeSummary {
                    id: row.id,
                    entity,
                    display_name: row.display_name(desc),
                };

                let outcome = match action {
                    SweepAction::Publish => self.publish(entity, row.id).await,
                    SweepAction::Discard => self.discard(entity, row.id).await,
                };

                match outcome {
                    Ok(_) => report.succeeded.push(item),
                    Err(e) => {
                        warn!(
                            entity = %entity,
                            id = %row.id,
                            error = %e,
                            "bulk {action} skipped failed item"
                        );
                        report.failed.push(BatchFailure {
                            item,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            "bulk {action} finished"
        );
        Ok(report)
    }

    /// Make one resume asset the active one, deactivating all others in
    /// the same transaction. There is never a window with zero or two
    /// active assets.
    pub async fn activate_resume(&self, id: Uuid) -> AppResult<EntityRow> {
        let target = self.fetch_live(EntityType::ResumeAsset, id).await?;
        let assets = self.store.list(EntityType::ResumeAsset).await?;

        let mut writes = Vec::new();
        for asset in &assets {
            if asset.id == target.id {
                writes.push(
                    RowWrite::new(EntityType::ResumeAsset, asset.id)
                        .set(ColumnWrite::IsActive(true)),
                );
            } else if asset.is_active {
                writes.push(
                    RowWrite::new(EntityType::ResumeAsset, asset.id)
                        .set(ColumnWrite::IsActive(false)),
                );
            }
        }

        self.store.update_all(writes).await?;

        info!(id = %id, "resume asset activated");
        self.fetch_live(EntityType::ResumeAsset, id).await
    }
}

#[derive(Debug, Clone, Copy)]
enum SweepAction {
    Publish,
    Discard,
}

impl std::fmt::Display for SweepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Publish => f.write_str("publish"),
            Self::Discard => f.write_str("discard"),
        }
    }
}

/// Dirty check for a single row, ignoring children.
fn row_is_dirty(row: &EntityRow) -> bool {
    let desc = descriptor(row.entity);
    desc.fields.iter().any(|spec| {
        let draft = row.draft_value(spec.name);
        let baseline = if row.is_published {
            row.published_value(spec.name)
        } else {
            // Never published: the baseline is the per-field default.
            None
        };
        !values_equal(draft, baseline)
    })
}

impl std::fmt::Debug for PublishService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishService").finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bare_row(entity: EntityType) -> EntityRow {
        EntityRow {
            id: Uuid::now_v7(),
            entity,
            parent_id: None,
            slug: None,
            is_published: false,
            is_visible: true,
            is_active: false,
            display_order: 0,
            created: 0,
            changed: 0,
            deleted: None,
            draft: Map::new(),
            published: Map::new(),
        }
    }

    #[test]
    fn fresh_entity_with_content_is_dirty() {
        let mut section = bare_row(EntityType::Section);
        section.draft.insert("title".to_string(), json!("About"));
        assert!(row_is_dirty(&section));
    }

    #[test]
    fn never_published_default_draft_is_clean() {
        // The state discard leaves a never-published entity in.
        let row = bare_row(EntityType::Section);
        assert!(!row_is_dirty(&row));

        let mut row = bare_row(EntityType::Section);
        row.draft.insert("title".to_string(), Value::Null);
        assert!(!row_is_dirty(&row));
    }

    #[test]
    fn published_entity_clean_until_draft_drifts() {
        let mut project = bare_row(EntityType::Project);
        project.is_published = true;
        project.draft.insert("title".to_string(), json!("Old Title"));
        project
            .published
            .insert("title".to_string(), json!("Old Title"));
        assert!(!row_is_dirty(&project));

        project
            .draft
            .insert("title".to_string(), json!("New Title"));
        assert!(row_is_dirty(&project));
    }

    #[test]
    fn json_drift_is_structural() {
        let mut section = bare_row(EntityType::Section);
        section.is_published = true;
        section
            .draft
            .insert("body".to_string(), json!({"a": 1, "b": [1, 2]}));
        section
            .published
            .insert("body".to_string(), json!({"b": [1, 2], "a": 1}));
        assert!(!row_is_dirty(&section));
    }

    #[test]
    fn batch_report_counts() {
        let mut report = BatchReport::default();
        assert!(report.is_clean());

        report.succeeded.push(ChangeSummary {
            id: Uuid::now_v7(),
            entity: EntityType::Section,
            display_name: "About".to_string(),
        });
        report.failed.push(BatchFailure {
            item: ChangeSummary {
                id: Uuid::now_v7(),
                entity: EntityType::Project,
                display_name: "Broken".to_string(),
            },
            error: "publish failed".to_string(),
        });

        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn batch_report_serializes_item_identity() {
        let mut report = BatchReport::default();
        report.failed.push(BatchFailure {
            item: ChangeSummary {
                id: Uuid::nil(),
                entity: EntityType::SocialLink,
                display_name: "GitHub".to_string(),
            },
            error: "boom".to_string(),
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failed"][0]["item"]["entity"], "social_link");
        assert_eq!(json["failed"][0]["error"], "boom");
    }
}
