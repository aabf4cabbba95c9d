#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Tests drive the REAL services (ContentService, PublishService,
//! Projector) over [`MemoryStore`], an in-memory [`ContentStore`] with
//! transactional `update_all` semantics. This exercises the injected
//! store seam the engine is written against, including rollback on
//! mid-transaction failure via [`MemoryStore::fail_writes`].

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use vetrina_kernel::content::{descriptor, ContentService, EntityType};
use vetrina_kernel::models::{EntityRow, NewEntity};
use vetrina_kernel::projector::Projector;
use vetrina_kernel::publish::PublishService;
use vetrina_kernel::store::{ColumnWrite, ContentStore, RowWrite};

use vetrina_test_utils::{
    bullet_fields, project_fields, project_page_fields, resume_fields, section_fields,
    setting_fields, social_link_fields,
};

/// In-memory content store with transactional `update_all`.
pub struct MemoryStore {
    rows: RwLock<HashMap<Uuid, EntityRow>>,
    /// Row ids whose writes fail, to simulate store failures mid-cascade.
    failing: RwLock<HashSet<Uuid>>,
    /// Monotonic fake clock so `created` tie-breaks are deterministic.
    clock: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            clock: AtomicI64::new(1),
        }
    }

    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Make every write against this row fail until cleared.
    pub fn fail_writes(&self, id: Uuid) {
        self.failing.write().insert(id);
    }

    /// Clear simulated failures.
    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    /// Raw row access for assertions.
    pub fn raw(&self, id: Uuid) -> Option<EntityRow> {
        self.rows.read().get(&id).cloned()
    }

    fn live_of_type<'a>(
        rows: &'a HashMap<Uuid, EntityRow>,
        entity: EntityType,
    ) -> Vec<&'a EntityRow> {
        let mut out: Vec<&EntityRow> = rows
            .values()
            .filter(|r| r.entity == entity && !r.is_deleted())
            .collect();
        out.sort_by_key(|r| (r.display_order, r.created, r.id));
        out
    }

    fn apply(&self, row: &mut EntityRow, columns: &[ColumnWrite]) {
        for column in columns {
            match column {
                ColumnWrite::Draft(field, value) => {
                    if value.is_null() {
                        row.draft.remove(*field);
                    } else {
                        row.draft.insert((*field).to_string(), value.clone());
                    }
                }
                ColumnWrite::Published(field, value) => {
                    if value.is_null() {
                        row.published.remove(*field);
                    } else {
                        row.published.insert((*field).to_string(), value.clone());
                    }
                }
                ColumnWrite::IsPublished(flag) => row.is_published = *flag,
                ColumnWrite::IsVisible(flag) => row.is_visible = *flag,
                ColumnWrite::IsActive(flag) => row.is_active = *flag,
                ColumnWrite::DisplayOrder(order) => row.display_order = *order,
            }
        }
        row.changed = self.tick();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch(&self, entity: EntityType, id: Uuid) -> Result<Option<EntityRow>> {
        Ok(self
            .rows
            .read()
            .get(&id)
            .filter(|r| r.entity == entity)
            .cloned())
    }

    async fn fetch_by_slug(&self, entity: EntityType, slug: &str) -> Result<Option<EntityRow>> {
        Ok(self
            .rows
            .read()
            .values()
            .find(|r| {
                r.entity == entity && !r.is_deleted() && r.slug.as_deref() == Some(slug)
            })
            .cloned())
    }

    async fn list(&self, entity: EntityType) -> Result<Vec<EntityRow>> {
        let rows = self.rows.read();
        Ok(Self::live_of_type(&rows, entity)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn list_children(&self, entity: EntityType, parent_id: Uuid) -> Result<Vec<EntityRow>> {
        let rows = self.rows.read();
        Ok(Self::live_of_type(&rows, entity)
            .into_iter()
            .filter(|r| r.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn insert(&self, entity: EntityType, input: NewEntity) -> Result<EntityRow> {
        let desc = descriptor(entity);
        let mut rows = self.rows.write();

        let display_order = input.display_order.unwrap_or_else(|| {
            Self::live_of_type(&rows, entity)
                .iter()
                .filter(|r| r.parent_id == input.parent_id)
                .map(|r| r.display_order + 1)
                .max()
                .unwrap_or(0)
        });

        let mut draft = Map::new();
        for spec in desc.fields {
            if let Some(value) = input.fields.get(spec.name) {
                if !value.is_null() {
                    draft.insert(spec.name.to_string(), value.clone());
                }
            }
        }

        let now = self.tick();
        let row = EntityRow {
            id: Uuid::now_v7(),
            entity,
            parent_id: input.parent_id,
            slug: input.slug,
            is_published: false,
            is_visible: input.is_visible.unwrap_or(true),
            is_active: false,
            display_order,
            created: now,
            changed: now,
            deleted: None,
            draft,
            published: Map::new(),
        };

        rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, write: RowWrite) -> Result<bool> {
        if self.failing.read().contains(&write.id) {
            anyhow::bail!("simulated store failure for {}", write.id);
        }

        let mut rows = self.rows.write();
        let Some(row) = rows.get_mut(&write.id).filter(|r| r.entity == write.entity) else {
            return Ok(false);
        };

        let mut updated = row.clone();
        self.apply(&mut updated, &write.columns);
        *row = updated;
        Ok(true)
    }

    async fn update_all(&self, writes: Vec<RowWrite>) -> Result<()> {
        let mut rows = self.rows.write();
        let failing = self.failing.read();

        // Stage every write against copies; commit only if all succeed.
        let mut staged: HashMap<Uuid, EntityRow> = HashMap::new();
        for write in &writes {
            if failing.contains(&write.id) {
                anyhow::bail!("simulated store failure for {}", write.id);
            }
            let mut row = staged
                .get(&write.id)
                .cloned()
                .or_else(|| rows.get(&write.id).cloned())
                .filter(|r| r.entity == write.entity)
                .ok_or_else(|| anyhow::anyhow!("row {} not found", write.id))?;
            self.apply(&mut row, &write.columns);
            staged.insert(row.id, row);
        }

        for (id, row) in staged {
            rows.insert(id, row);
        }
        Ok(())
    }

    async fn soft_delete(&self, entity: EntityType, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.write();
        let Some(row) = rows.get_mut(&id).filter(|r| r.entity == entity) else {
            return Ok(false);
        };
        if row.is_deleted() {
            return Ok(false);
        }
        let now = self.tick();
        row.deleted = Some(now);
        row.changed = now;
        Ok(true)
    }
}

/// Real services wired over a shared [`MemoryStore`].
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub content: ContentService,
    pub publisher: PublishService,
    pub projector: Projector,
}

pub fn test_env() -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    TestEnv {
        content: ContentService::new(store.clone()),
        publisher: PublishService::new(store.clone()),
        projector: Projector::new(store.clone()),
        store,
    }
}

impl TestEnv {
    pub async fn create_section(&self, title: &str) -> EntityRow {
        self.content
            .create(
                EntityType::Section,
                NewEntity {
                    fields: section_fields(title).build(),
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create section")
    }

    pub async fn create_bullet(&self, section_id: Uuid, text: &str) -> EntityRow {
        self.content
            .create(
                EntityType::SectionBullet,
                NewEntity {
                    parent_id: Some(section_id),
                    fields: bullet_fields(text).build(),
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create bullet")
    }

    pub async fn create_project(&self, title: &str) -> EntityRow {
        self.content
            .create(
                EntityType::Project,
                NewEntity {
                    fields: project_fields(title).build(),
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create project")
    }

    pub async fn create_project_page(&self, project_id: Uuid, title: &str) -> EntityRow {
        self.content
            .create(
                EntityType::ProjectPage,
                NewEntity {
                    parent_id: Some(project_id),
                    fields: project_page_fields(title).build(),
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create project page")
    }

    pub async fn create_social_link(&self, platform: &str, url: &str) -> EntityRow {
        self.content
            .create(
                EntityType::SocialLink,
                NewEntity {
                    fields: social_link_fields(platform, url).build(),
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create social link")
    }

    pub async fn create_resume(&self, label: &str) -> EntityRow {
        self.content
            .create(
                EntityType::ResumeAsset,
                NewEntity {
                    fields: resume_fields(label, "https://example.com/resume.pdf").build(),
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create resume asset")
    }

    pub async fn create_setting(
        &self,
        entity: EntityType,
        slug: &str,
        value: Value,
    ) -> EntityRow {
        self.content
            .create(
                entity,
                NewEntity {
                    slug: Some(slug.to_string()),
                    fields: setting_fields(value).build(),
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create setting")
    }
}
