//! PostgreSQL-backed content store.
//!
//! SQL is built from the entity descriptors: SELECTs through SeaQuery
//! (dynamic table/column identifiers), writes through numbered-placeholder
//! statements with sqlx binds so JSONB values travel as parameters.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_query::{Alias, Expr, Order, PostgresQueryBuilder, Query, SelectStatement};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use crate::content::{descriptor, EntityDescriptor, EntityType, FieldKind, FieldSpec};
use crate::models::{EntityRow, NewEntity};

use super::{ColumnWrite, ContentStore, RowWrite};

/// Bookkeeping columns shared by every publishable table.
const COMMON_COLUMNS: [&str; 10] = [
    "id",
    "parent_id",
    "slug",
    "is_published",
    "is_visible",
    "is_active",
    "display_order",
    "created",
    "changed",
    "deleted",
];

/// PostgreSQL implementation of [`ContentStore`].
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    /// Create a new store over a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Next free `display_order` among live siblings.
    async fn next_display_order(
        &self,
        desc: &EntityDescriptor,
        parent_id: Option<Uuid>,
    ) -> Result<i32> {
        let order: i32 = if let Some(parent_id) = parent_id {
            sqlx::query_scalar(&format!(
                "SELECT COALESCE(MAX(display_order) + 1, 0) FROM {} WHERE deleted IS NULL AND parent_id = $1",
                desc.table
            ))
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await
        } else {
            sqlx::query_scalar(&format!(
                "SELECT COALESCE(MAX(display_order) + 1, 0) FROM {} WHERE deleted IS NULL",
                desc.table
            ))
            .fetch_one(&self.pool)
            .await
        }
        .with_context(|| format!("failed to compute display_order for {}", desc.table))?;

        Ok(order)
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn fetch(&self, entity: EntityType, id: Uuid) -> Result<Option<EntityRow>> {
        let desc = descriptor(entity);
        let sql = {
            let mut query = select_statement(desc);
            query.and_where(Expr::col(Alias::new("id")).eq(id));
            query.to_string(PostgresQueryBuilder)
        };

        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to fetch {} by id", desc.table))?;

        row.map(|r| row_from_pg(entity, &r)).transpose()
    }

    async fn fetch_by_slug(&self, entity: EntityType, slug: &str) -> Result<Option<EntityRow>> {
        let desc = descriptor(entity);
        let sql = {
            let mut query = select_statement(desc);
            query
                .and_where(Expr::col(Alias::new("slug")).eq(slug))
                .and_where(Expr::col(Alias::new("deleted")).is_null());
            query.to_string(PostgresQueryBuilder)
        };

        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to fetch {} by slug", desc.table))?;

        row.map(|r| row_from_pg(entity, &r)).transpose()
    }

    async fn list(&self, entity: EntityType) -> Result<Vec<EntityRow>> {
        let desc = descriptor(entity);
        let sql = {
            let mut query = select_statement(desc);
            query.and_where(Expr::col(Alias::new("deleted")).is_null());
            add_presentation_order(&mut query);
            query.to_string(PostgresQueryBuilder)
        };

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to list {}", desc.table))?;

        rows.iter().map(|r| row_from_pg(entity, r)).collect()
    }

    async fn list_children(&self, entity: EntityType, parent_id: Uuid) -> Result<Vec<EntityRow>> {
        let desc = descriptor(entity);
        let sql = {
            let mut query = select_statement(desc);
            query
                .and_where(Expr::col(Alias::new("deleted")).is_null())
                .and_where(Expr::col(Alias::new("parent_id")).eq(parent_id));
            add_presentation_order(&mut query);
            query.to_string(PostgresQueryBuilder)
        };

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to list {} children", desc.table))?;

        rows.iter().map(|r| row_from_pg(entity, r)).collect()
    }

    async fn insert(&self, entity: EntityType, input: NewEntity) -> Result<EntityRow> {
        let desc = descriptor(entity);
        let now = chrono::Utc::now().timestamp();
        let id = Uuid::now_v7();

        let display_order = match input.display_order {
            Some(order) => order,
            None => self.next_display_order(desc, input.parent_id).await?,
        };

        let mut columns: Vec<String> = [
            "id",
            "parent_id",
            "slug",
            "is_published",
            "is_visible",
            "is_active",
            "display_order",
            "created",
            "changed",
        ]
        .iter()
        .map(|c| (*c).to_string())
        .collect();

        let mut provided: Vec<&FieldSpec> = Vec::new();
        for spec in desc.fields {
            if input.fields.contains_key(spec.name) {
                columns.push(spec.draft_column());
                provided.push(spec);
            }
        }

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            desc.table,
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql)
            .bind(id)
            .bind(input.parent_id)
            .bind(&input.slug)
            .bind(false)
            .bind(input.is_visible.unwrap_or(true))
            .bind(false)
            .bind(display_order)
            .bind(now)
            .bind(now);

        for spec in &provided {
            query = bind_field_value(query, spec, input.fields.get(spec.name));
        }

        query
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to insert {}", desc.table))?;

        self.fetch(entity, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("failed to fetch created {}", desc.table))
    }

    async fn update(&self, write: RowWrite) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let affected = apply_row_write(&self.pool, &write, now).await?;
        Ok(affected > 0)
    }

    async fn update_all(&self, writes: Vec<RowWrite>) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start transaction")?;

        for write in &writes {
            let affected = apply_row_write(&mut *tx, write, now).await?;
            if affected == 0 {
                anyhow::bail!(
                    "row {} of {} vanished mid-transaction",
                    write.id,
                    write.entity
                );
            }
        }

        tx.commit().await.context("failed to commit transaction")?;
        Ok(())
    }

    async fn soft_delete(&self, entity: EntityType, id: Uuid) -> Result<bool> {
        let desc = descriptor(entity);
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(&format!(
            "UPDATE {} SET deleted = $1, changed = $1 WHERE id = $2 AND deleted IS NULL",
            desc.table
        ))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to soft-delete {}", desc.table))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Base SELECT over all common and shadow columns of a table.
fn select_statement(desc: &EntityDescriptor) -> SelectStatement {
    let mut query = Query::select();
    for col in COMMON_COLUMNS {
        query.column(Alias::new(col));
    }
    for spec in desc.fields {
        query.column(Alias::new(spec.draft_column()));
        query.column(Alias::new(spec.published_column()));
    }
    query.from(Alias::new(desc.table));
    query
}

/// Presentation order: `display_order ASC`, ties broken by `created ASC`.
fn add_presentation_order(query: &mut SelectStatement) {
    query
        .order_by(Alias::new("display_order"), Order::Asc)
        .order_by(Alias::new("created"), Order::Asc);
}

/// Decode a database row into the generic entity shape.
fn row_from_pg(entity: EntityType, row: &PgRow) -> Result<EntityRow> {
    let desc = descriptor(entity);

    let mut draft = Map::new();
    let mut published = Map::new();
    for spec in desc.fields {
        if let Some(value) = decode_field(row, spec, &spec.draft_column())? {
            draft.insert(spec.name.to_string(), value);
        }
        if let Some(value) = decode_field(row, spec, &spec.published_column())? {
            published.insert(spec.name.to_string(), value);
        }
    }

    Ok(EntityRow {
        id: row.try_get("id")?,
        entity,
        parent_id: row.try_get("parent_id")?,
        slug: row.try_get("slug")?,
        is_published: row.try_get("is_published")?,
        is_visible: row.try_get("is_visible")?,
        is_active: row.try_get("is_active")?,
        display_order: row.try_get("display_order")?,
        created: row.try_get("created")?,
        changed: row.try_get("changed")?,
        deleted: row.try_get("deleted")?,
        draft,
        published,
    })
}

fn decode_field(row: &PgRow, spec: &FieldSpec, column: &str) -> Result<Option<Value>> {
    let value = match spec.kind {
        FieldKind::Json => row.try_get::<Option<Value>, _>(column)?,
        FieldKind::Text | FieldKind::Url => row
            .try_get::<Option<String>, _>(column)?
            .map(Value::String),
    };
    Ok(value)
}

/// Resolve a [`ColumnWrite`] to its SQL column name.
fn column_name(desc: &EntityDescriptor, column: &ColumnWrite) -> Result<String> {
    let name = match column {
        ColumnWrite::Draft(field, _) => field_spec(desc, field)?.draft_column(),
        ColumnWrite::Published(field, _) => field_spec(desc, field)?.published_column(),
        ColumnWrite::IsPublished(_) => "is_published".to_string(),
        ColumnWrite::IsVisible(_) => "is_visible".to_string(),
        ColumnWrite::IsActive(_) => "is_active".to_string(),
        ColumnWrite::DisplayOrder(_) => "display_order".to_string(),
    };
    Ok(name)
}

fn field_spec<'d>(desc: &'d EntityDescriptor, name: &str) -> Result<&'d FieldSpec> {
    desc.fields
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| anyhow::anyhow!("no field {:?} on entity type {}", name, desc.entity))
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

fn bind_field_value<'q>(
    query: PgQuery<'q>,
    spec: &FieldSpec,
    value: Option<&Value>,
) -> PgQuery<'q> {
    let value = value.cloned().unwrap_or(Value::Null);
    match spec.kind {
        FieldKind::Json => {
            if value.is_null() {
                query.bind(None::<Value>)
            } else {
                query.bind(value)
            }
        }
        FieldKind::Text | FieldKind::Url => query.bind(value.as_str().map(String::from)),
    }
}

fn bind_column<'q>(
    query: PgQuery<'q>,
    desc: &EntityDescriptor,
    column: &ColumnWrite,
) -> Result<PgQuery<'q>> {
    let query = match column {
        ColumnWrite::Draft(field, value) | ColumnWrite::Published(field, value) => {
            bind_field_value(query, field_spec(desc, field)?, Some(value))
        }
        ColumnWrite::IsPublished(flag) => query.bind(*flag),
        ColumnWrite::IsVisible(flag) => query.bind(*flag),
        ColumnWrite::IsActive(flag) => query.bind(*flag),
        ColumnWrite::DisplayOrder(order) => query.bind(*order),
    };
    Ok(query)
}

/// Apply one row patch against any executor (pool or open transaction).
async fn apply_row_write<'e, E>(executor: E, write: &RowWrite, now: i64) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let desc = descriptor(write.entity);

    let mut assignments = vec!["changed = $1".to_string()];
    let mut idx = 2;
    for column in &write.columns {
        assignments.push(format!("{} = ${idx}", column_name(desc, column)?));
        idx += 1;
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ${idx}",
        desc.table,
        assignments.join(", ")
    );

    let mut query = sqlx::query(&sql).bind(now);
    for column in &write.columns {
        query = bind_column(query, desc, column)?;
    }
    query = query.bind(write.id);

    let result = query
        .execute(executor)
        .await
        .with_context(|| format!("failed to update {}", desc.table))?;

    Ok(result.rows_affected())
}

impl std::fmt::Debug for PgContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgContentStore").finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_covers_all_shadow_columns() {
        let desc = descriptor(EntityType::Project);
        let sql = select_statement(desc).to_string(PostgresQueryBuilder);

        assert!(sql.contains("\"project\""));
        for spec in desc.fields {
            assert!(sql.contains(&spec.draft_column()), "missing {spec:?} draft");
            assert!(
                sql.contains(&spec.published_column()),
                "missing {spec:?} published"
            );
        }
    }

    #[test]
    fn presentation_order_breaks_ties_by_created() {
        let desc = descriptor(EntityType::SocialLink);
        let mut query = select_statement(desc);
        add_presentation_order(&mut query);
        let sql = query.to_string(PostgresQueryBuilder);

        let order_pos = sql.find("\"display_order\" ASC").unwrap();
        let created_pos = sql.rfind("\"created\" ASC").unwrap();
        assert!(order_pos < created_pos);
    }

    #[test]
    fn column_names_resolve_shadow_pairs() {
        let desc = descriptor(EntityType::Section);

        let draft = column_name(desc, &ColumnWrite::Draft("title", json!("x"))).unwrap();
        assert_eq!(draft, "title_draft");

        let published = column_name(desc, &ColumnWrite::Published("title", json!("x"))).unwrap();
        assert_eq!(published, "title_published");

        assert!(column_name(desc, &ColumnWrite::Draft("nope", json!("x"))).is_err());
    }
}
