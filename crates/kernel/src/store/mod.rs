//! Content store abstraction layer.
//!
//! All entity reads and writes go through the [`ContentStore`] trait. The
//! publish engine and projector are written against this boundary, never
//! against tables, which keeps the draft/publish semantics in one place
//! and lets tests drive the real services over an in-memory store.
//!
//! Writes are expressed as named-column patches ([`RowWrite`]); the
//! transactional form [`ContentStore::update_all`] commits a set of
//! patches across rows as one unit, which is what subtree publish and
//! discard rely on for atomicity.

pub mod postgres;

pub use postgres::PgContentStore;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::content::EntityType;
use crate::models::{EntityRow, NewEntity};

/// One column assignment within a row patch.
#[derive(Debug, Clone)]
pub enum ColumnWrite {
    /// Set a field's draft column.
    Draft(&'static str, Value),
    /// Set a field's published column. Only the publish engine writes
    /// these, and only by copying the current draft.
    Published(&'static str, Value),
    IsPublished(bool),
    IsVisible(bool),
    IsActive(bool),
    DisplayOrder(i32),
}

/// A patch of named-column writes against one row. Every applied patch
/// also bumps the row's `changed` timestamp.
#[derive(Debug, Clone)]
pub struct RowWrite {
    pub entity: EntityType,
    pub id: Uuid,
    pub columns: Vec<ColumnWrite>,
}

impl RowWrite {
    pub fn new(entity: EntityType, id: Uuid) -> Self {
        Self {
            entity,
            id,
            columns: Vec::new(),
        }
    }

    pub fn set(mut self, column: ColumnWrite) -> Self {
        self.columns.push(column);
        self
    }

    pub fn push(&mut self, column: ColumnWrite) {
        self.columns.push(column);
    }
}

/// The storage boundary for publishable entities.
///
/// Implementations must keep `list`/`list_children` restricted to
/// non-deleted rows ordered by `display_order ASC, created ASC`, while
/// `fetch` returns soft-deleted rows too (direct-by-id admin lookups).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a row by id, including soft-deleted rows.
    async fn fetch(&self, entity: EntityType, id: Uuid) -> Result<Option<EntityRow>>;

    /// Fetch a row by its natural key (key-value entries).
    async fn fetch_by_slug(&self, entity: EntityType, slug: &str) -> Result<Option<EntityRow>>;

    /// List non-deleted rows of a type, ordered for presentation.
    async fn list(&self, entity: EntityType) -> Result<Vec<EntityRow>>;

    /// List non-deleted children of a parent row, ordered for presentation.
    async fn list_children(&self, entity: EntityType, parent_id: Uuid) -> Result<Vec<EntityRow>>;

    /// Insert a new row with draft fields only.
    async fn insert(&self, entity: EntityType, input: NewEntity) -> Result<EntityRow>;

    /// Apply a single row patch. Returns `false` if the row is missing.
    async fn update(&self, write: RowWrite) -> Result<bool>;

    /// Apply a set of row patches in one transaction (all or none).
    async fn update_all(&self, writes: Vec<RowWrite>) -> Result<()>;

    /// Soft-delete a row. Returns `false` if missing or already deleted.
    async fn soft_delete(&self, entity: EntityType, id: Uuid) -> Result<bool>;
}
