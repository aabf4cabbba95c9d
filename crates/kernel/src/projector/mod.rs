//! Preview projector.
//!
//! Read-only flattening of the draft/published shadow columns into the
//! shape renderers consume: one value per field, no `_draft`/`_published`
//! suffixes, children embedded under their parents. Draft mode shows the
//! latest authored content whether or not it was ever published; published
//! mode additionally hides entities that never were.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::content::{descriptor, EntityType};
use crate::error::{AppError, AppResult};
use crate::models::EntityRow;
use crate::store::ContentStore;

/// Which side of the shadow columns to project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    /// Latest authored content, published or not (admin preview).
    Draft,
    /// Last promoted content only (the public site).
    Published,
}

impl std::str::FromStr for PreviewMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(AppError::Validation(format!(
                "unknown preview mode: {other:?} (expected draft or published)"
            ))),
        }
    }
}

impl std::fmt::Display for PreviewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => f.write_str("draft"),
            Self::Published => f.write_str("published"),
        }
    }
}

/// One flattened entity: a single value per field, children embedded.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectedEntity {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub children: Vec<ProjectedEntity>,
}

/// The full projected site, ready for a renderer.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContent {
    pub sections: Vec<ProjectedEntity>,
    pub projects: Vec<ProjectedEntity>,
    pub social_links: Vec<ProjectedEntity>,
    pub site: Map<String, Value>,
    pub theme: Map<String, Value>,
    pub resume: Option<ProjectedEntity>,
}

/// Read-only projection over the content store.
#[derive(Clone)]
pub struct Projector {
    store: Arc<dyn ContentStore>,
}

impl Projector {
    /// Create a new projector.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Project the whole site in the given mode. Pure read.
    pub async fn project(&self, mode: PreviewMode) -> AppResult<SiteContent> {
        Ok(SiteContent {
            sections: self.project_tree(EntityType::Section, mode).await?,
            projects: self.project_tree(EntityType::Project, mode).await?,
            social_links: self.project_tree(EntityType::SocialLink, mode).await?,
            site: self.project_settings(EntityType::SiteSetting, mode).await?,
            theme: self.project_settings(EntityType::ThemeSetting, mode).await?,
            resume: self.project_resume(mode).await?,
        })
    }

    /// Project a root entity type with its children embedded. The store
    /// delivers rows in presentation order and without soft-deleted rows.
    async fn project_tree(
        &self,
        entity: EntityType,
        mode: PreviewMode,
    ) -> AppResult<Vec<ProjectedEntity>> {
        let child_type = descriptor(entity).children;
        let mut out = Vec::new();

        for row in self.store.list(entity).await? {
            if !include(&row, mode) {
                continue;
            }
            let mut projected = flatten(&row, mode);
            if let Some(child) = child_type {
                for child_row in self.store.list_children(child, row.id).await? {
                    if include(&child_row, mode) {
                        projected.children.push(flatten(&child_row, mode));
                    }
                }
            }
            out.push(projected);
        }

        Ok(out)
    }

    /// Key-value entries collapse to a `slug → value` map.
    async fn project_settings(
        &self,
        entity: EntityType,
        mode: PreviewMode,
    ) -> AppResult<Map<String, Value>> {
        let mut out = Map::new();
        for row in self.store.list(entity).await? {
            if !include(&row, mode) {
                continue;
            }
            let Some(slug) = row.slug.clone() else {
                continue;
            };
            out.insert(slug, field_value(&row, mode, "value"));
        }
        Ok(out)
    }

    /// The single active resume asset, if one qualifies for the mode.
    async fn project_resume(&self, mode: PreviewMode) -> AppResult<Option<ProjectedEntity>> {
        let assets = self.store.list(EntityType::ResumeAsset).await?;
        Ok(assets
            .iter()
            .find(|row| row.is_active && include(row, mode))
            .map(|row| flatten(row, mode)))
    }
}

/// Mode filter: hidden entities never project; published mode also
/// requires at least one past publish.
fn include(row: &EntityRow, mode: PreviewMode) -> bool {
    row.is_visible && (mode == PreviewMode::Draft || row.is_published)
}

/// Collapse the shadow columns of one row to a flat record.
fn flatten(row: &EntityRow, mode: PreviewMode) -> ProjectedEntity {
    let mut fields = Map::new();
    for spec in descriptor(row.entity).fields {
        fields.insert(spec.name.to_string(), field_value(row, mode, spec.name));
    }
    ProjectedEntity {
        id: row.id,
        fields,
        children: Vec::new(),
    }
}

fn field_value(row: &EntityRow, mode: PreviewMode, field: &str) -> Value {
    let source = match mode {
        PreviewMode::Draft => &row.draft,
        PreviewMode::Published => &row.published,
    };
    source.get(field).cloned().unwrap_or(Value::Null)
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projector").finish()
    }
}
