//! Admin route handlers.
//!
//! JSON endpoints for authoring and publishing. Each handler is a thin
//! mapper onto `ContentService` or `PublishService`; mutations are
//! recorded in the audit log, and an audit write failure never fails the
//! user action.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::content::EntityType;
use crate::error::AppResult;
use crate::models::{ChangeSummary, EntityRow, NewEntity};
use crate::publish::BatchReport;
use crate::state::AppState;

/// Request for creating an entity.
#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub parent_id: Option<Uuid>,
    pub slug: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    pub display_order: Option<i32>,
    pub is_visible: Option<bool>,
}

/// Request for saving draft fields.
#[derive(Debug, Deserialize)]
pub struct SaveDraftRequest {
    pub fields: Map<String, Value>,
}

/// Request for toggling visibility.
#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// Request for reordering siblings.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<Uuid>,
}

/// Response for change detection on one entity.
#[derive(Debug, Serialize)]
pub struct ChangesResponse {
    pub has_unpublished_changes: bool,
}

async fn audit(state: &AppState, action: &str, entity: EntityType, id: Uuid, details: Value) {
    if let Err(e) = state
        .audit()
        .log(action, entity.as_str(), &id.to_string(), details)
        .await
    {
        warn!(error = %e, action = %action, "audit log write failed");
    }
}

async fn create_entity(
    State(state): State<AppState>,
    Path(entity): Path<EntityType>,
    Json(request): Json<CreateEntityRequest>,
) -> AppResult<Json<EntityRow>> {
    let row = state
        .content()
        .create(
            entity,
            NewEntity {
                parent_id: request.parent_id,
                slug: request.slug,
                fields: request.fields,
                display_order: request.display_order,
                is_visible: request.is_visible,
            },
        )
        .await?;

    audit(&state, "create", entity, row.id, Value::Null).await;
    Ok(Json(row))
}

async fn list_entities(
    State(state): State<AppState>,
    Path(entity): Path<EntityType>,
) -> AppResult<Json<Vec<EntityRow>>> {
    Ok(Json(state.content().list(entity).await?))
}

async fn get_entity(
    State(state): State<AppState>,
    Path((entity, id)): Path<(EntityType, Uuid)>,
) -> AppResult<Json<EntityRow>> {
    Ok(Json(state.content().load(entity, id).await?))
}

async fn save_draft(
    State(state): State<AppState>,
    Path((entity, id)): Path<(EntityType, Uuid)>,
    Json(request): Json<SaveDraftRequest>,
) -> AppResult<Json<EntityRow>> {
    let fields: Vec<&String> = request.fields.keys().collect();
    let details = serde_json::json!({ "fields": fields });

    let row = state.publisher().save_draft(entity, id, request.fields).await?;

    audit(&state, "save_draft", entity, id, details).await;
    Ok(Json(row))
}

async fn publish_entity(
    State(state): State<AppState>,
    Path((entity, id)): Path<(EntityType, Uuid)>,
) -> AppResult<Json<EntityRow>> {
    let row = state.publisher().publish(entity, id).await?;
    audit(&state, "publish", entity, id, Value::Null).await;
    Ok(Json(row))
}

async fn discard_entity(
    State(state): State<AppState>,
    Path((entity, id)): Path<(EntityType, Uuid)>,
) -> AppResult<Json<EntityRow>> {
    let row = state.publisher().discard(entity, id).await?;
    audit(&state, "discard", entity, id, Value::Null).await;
    Ok(Json(row))
}

async fn entity_changes(
    State(state): State<AppState>,
    Path((entity, id)): Path<(EntityType, Uuid)>,
) -> AppResult<Json<ChangesResponse>> {
    let dirty = state.publisher().has_unpublished_changes(entity, id).await?;
    Ok(Json(ChangesResponse {
        has_unpublished_changes: dirty,
    }))
}

async fn delete_entity(
    State(state): State<AppState>,
    Path((entity, id)): Path<(EntityType, Uuid)>,
) -> AppResult<()> {
    state.content().soft_delete(entity, id).await?;
    audit(&state, "delete", entity, id, Value::Null).await;
    Ok(())
}

async fn set_visibility(
    State(state): State<AppState>,
    Path((entity, id)): Path<(EntityType, Uuid)>,
    Json(request): Json<VisibilityRequest>,
) -> AppResult<Json<EntityRow>> {
    let row = state
        .content()
        .set_visibility(entity, id, request.visible)
        .await?;

    audit(
        &state,
        "set_visibility",
        entity,
        id,
        serde_json::json!({ "visible": request.visible }),
    )
    .await;
    Ok(Json(row))
}

async fn reorder_entities(
    State(state): State<AppState>,
    Path(entity): Path<EntityType>,
    Json(request): Json<ReorderRequest>,
) -> AppResult<()> {
    state.content().reorder(entity, &request.ids).await?;
    Ok(())
}

async fn list_changes(State(state): State<AppState>) -> AppResult<Json<Vec<ChangeSummary>>> {
    Ok(Json(state.publisher().list_unpublished_items().await?))
}

async fn publish_all(State(state): State<AppState>) -> AppResult<Json<BatchReport>> {
    let report = state.publisher().publish_all().await?;
    audit_bulk(&state, "publish_all", &report).await;
    Ok(Json(report))
}

async fn discard_all(State(state): State<AppState>) -> AppResult<Json<BatchReport>> {
    let report = state.publisher().discard_all().await?;
    audit_bulk(&state, "discard_all", &report).await;
    Ok(Json(report))
}

async fn audit_bulk(state: &AppState, action: &str, report: &BatchReport) {
    let details = serde_json::json!({
        "succeeded": report.succeeded_count(),
        "failed": report.failed_count(),
    });
    if let Err(e) = state.audit().log(action, "bulk", "-", details).await {
        warn!(error = %e, action = %action, "audit log write failed");
    }
}

async fn activate_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EntityRow>> {
    let row = state.publisher().activate_resume(id).await?;
    audit(&state, "activate", EntityType::ResumeAsset, id, Value::Null).await;
    Ok(Json(row))
}

/// Create the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/content/{entity}", post(create_entity))
        .route("/admin/content/{entity}", get(list_entities))
        .route("/admin/content/{entity}/reorder", post(reorder_entities))
        .route("/admin/content/{entity}/{id}", get(get_entity))
        .route("/admin/content/{entity}/{id}", delete(delete_entity))
        .route("/admin/content/{entity}/{id}/draft", put(save_draft))
        .route("/admin/content/{entity}/{id}/publish", post(publish_entity))
        .route("/admin/content/{entity}/{id}/discard", post(discard_entity))
        .route("/admin/content/{entity}/{id}/changes", get(entity_changes))
        .route(
            "/admin/content/{entity}/{id}/visibility",
            post(set_visibility),
        )
        .route("/admin/changes", get(list_changes))
        .route("/admin/publish-all", post(publish_all))
        .route("/admin/discard-all", post(discard_all))
        .route("/admin/resume/{id}/activate", post(activate_resume))
}
