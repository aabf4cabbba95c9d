//! Content authoring service.
//!
//! CRUD over publishable entities: creation (draft side only), direct
//! lookups, visibility, soft deletion, and sibling reordering. Everything
//! that moves values between the draft and published shadows lives in the
//! publish engine instead.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::content::{descriptor, validate_fields, EntityType};
use crate::error::{AppError, AppResult};
use crate::models::{EntityRow, NewEntity};
use crate::store::{ColumnWrite, ContentStore, RowWrite};

/// Service for entity authoring operations.
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn ContentStore>,
}

impl ContentService {
    /// Create a new content service.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Create an entity. Only draft fields are populated; the entity stays
    /// unpublished until its first publish.
    pub async fn create(&self, entity: EntityType, input: NewEntity) -> AppResult<EntityRow> {
        let desc = descriptor(entity);
        validate_fields(desc, &input.fields, true)?;

        match (desc.parent, input.parent_id) {
            (Some(parent), Some(parent_id)) => {
                // The parent must exist and be live.
                match self.store.fetch(parent, parent_id).await? {
                    Some(row) if !row.is_deleted() => {}
                    _ => return Err(AppError::NotFound),
                }
            }
            (Some(_), None) => {
                return Err(AppError::Validation(format!(
                    "entity type {} requires a parent_id",
                    entity.as_str()
                )));
            }
            (None, Some(_)) => {
                return Err(AppError::Validation(format!(
                    "entity type {} does not take a parent_id",
                    entity.as_str()
                )));
            }
            (None, None) => {}
        }

        if desc.has_slug {
            let Some(slug) = input.slug.as_deref() else {
                return Err(AppError::Validation(format!(
                    "entity type {} requires a slug",
                    entity.as_str()
                )));
            };
            if self.store.fetch_by_slug(entity, slug).await?.is_some() {
                return Err(AppError::Validation(format!(
                    "slug {slug:?} already exists for {}",
                    entity.as_str()
                )));
            }
        } else if input.slug.is_some() {
            return Err(AppError::Validation(format!(
                "entity type {} does not take a slug",
                entity.as_str()
            )));
        }

        let row = self.store.insert(entity, input).await?;
        info!(entity = %entity, id = %row.id, "entity created");
        Ok(row)
    }

    /// Direct-by-id lookup. The one read that returns soft-deleted rows.
    pub async fn load(&self, entity: EntityType, id: Uuid) -> AppResult<EntityRow> {
        self.store
            .fetch(entity, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Look up a key-value entry by its natural key.
    pub async fn load_by_slug(&self, entity: EntityType, slug: &str) -> AppResult<EntityRow> {
        self.store
            .fetch_by_slug(entity, slug)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// List live entities of a type in presentation order.
    pub async fn list(&self, entity: EntityType) -> AppResult<Vec<EntityRow>> {
        Ok(self.store.list(entity).await?)
    }

    /// List live children of a parent row in presentation order.
    pub async fn list_children(
        &self,
        entity: EntityType,
        parent_id: Uuid,
    ) -> AppResult<Vec<EntityRow>> {
        Ok(self.store.list_children(entity, parent_id).await?)
    }

    /// Toggle visibility. Independent of publish state.
    pub async fn set_visibility(
        &self,
        entity: EntityType,
        id: Uuid,
        visible: bool,
    ) -> AppResult<EntityRow> {
        self.require_live(entity, id).await?;

        let write = RowWrite::new(entity, id).set(ColumnWrite::IsVisible(visible));
        if !self.store.update(write).await? {
            return Err(AppError::NotFound);
        }

        self.load(entity, id).await
    }

    /// Soft-delete an entity. The row stays readable by direct id lookup
    /// but drops out of listings, change detection, and bulk sweeps.
    pub async fn soft_delete(&self, entity: EntityType, id: Uuid) -> AppResult<()> {
        if !self.store.soft_delete(entity, id).await? {
            return Err(AppError::NotFound);
        }
        info!(entity = %entity, id = %id, "entity soft-deleted");
        Ok(())
    }

    /// Persist a full sibling ordering: `ids` in the order they should
    /// display. Every id must name a live row of the type.
    pub async fn reorder(&self, entity: EntityType, ids: &[Uuid]) -> AppResult<()> {
        let mut writes = Vec::with_capacity(ids.len());
        for (position, id) in ids.iter().enumerate() {
            self.require_live(entity, *id).await?;
            writes.push(
                RowWrite::new(entity, *id).set(ColumnWrite::DisplayOrder(position as i32)),
            );
        }

        self.store.update_all(writes).await?;
        info!(entity = %entity, count = ids.len(), "entities reordered");
        Ok(())
    }

    async fn require_live(&self, entity: EntityType, id: Uuid) -> AppResult<()> {
        match self.store.fetch(entity, id).await? {
            Some(row) if !row.is_deleted() => Ok(()),
            _ => Err(AppError::NotFound),
        }
    }
}

impl std::fmt::Debug for ContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentService").finish()
    }
}
