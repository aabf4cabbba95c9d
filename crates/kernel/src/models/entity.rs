//! Generic entity row shapes.
//!
//! All publishable tables share one column layout, so a single row type
//! covers every entity. Field values travel as JSON maps keyed by field
//! name; the store maps them to and from the `_draft`/`_published` column
//! pairs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::content::{EntityDescriptor, EntityType};

/// One row of a publishable table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRow {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Entity type this row belongs to.
    pub entity: EntityType,

    /// Parent row for child entities (bullets, project pages).
    pub parent_id: Option<Uuid>,

    /// Natural key for key-value entries (site/theme settings).
    pub slug: Option<String>,

    /// True once at least one publish has occurred. Does not mean the
    /// draft still matches the published snapshot.
    pub is_published: bool,

    /// Visibility toggle, independent of publish state.
    pub is_visible: bool,

    /// Single-active flag (resume assets only).
    pub is_active: bool,

    /// Ordering among siblings; ties broken by `created`.
    pub display_order: i32,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp of the last draft or published mutation.
    pub changed: i64,

    /// Soft-delete timestamp; set rows are inert.
    pub deleted: Option<i64>,

    /// Draft values keyed by field name.
    pub draft: Map<String, Value>,

    /// Published values keyed by field name.
    pub published: Map<String, Value>,
}

impl EntityRow {
    /// Check if this row is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    /// Draft value for a field, if set.
    pub fn draft_value(&self, field: &str) -> Option<&Value> {
        self.draft.get(field)
    }

    /// Published value for a field, if set.
    pub fn published_value(&self, field: &str) -> Option<&Value> {
        self.published.get(field)
    }

    /// Human-readable label for summaries: the descriptor's display field
    /// from the draft, falling back to the slug, then the id.
    pub fn display_name(&self, desc: &EntityDescriptor) -> String {
        if let Some(field) = desc.display_field {
            if let Some(text) = self.draft_value(field).and_then(Value::as_str) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
        if let Some(slug) = &self.slug {
            return slug.clone();
        }
        self.id.to_string()
    }
}

/// Input for creating an entity. Only draft fields are populated; the
/// published side stays empty until the first publish.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEntity {
    pub parent_id: Option<Uuid>,
    pub slug: Option<String>,
    pub fields: Map<String, Value>,
    pub display_order: Option<i32>,
    pub is_visible: Option<bool>,
}

/// Summary of an entity with unpublished changes.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSummary {
    pub id: Uuid,
    pub entity: EntityType,
    pub display_name: String,
}
