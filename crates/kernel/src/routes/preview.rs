//! Projection endpoints.
//!
//! `/content` serves the published projection (what the public site
//! renders); `/preview/{mode}` lets the admin UI see either side.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::projector::{PreviewMode, SiteContent};
use crate::state::AppState;

async fn published_content(State(state): State<AppState>) -> AppResult<Json<SiteContent>> {
    Ok(Json(state.projector().project(PreviewMode::Published).await?))
}

async fn preview_content(
    State(state): State<AppState>,
    Path(mode): Path<String>,
) -> AppResult<Json<SiteContent>> {
    let mode: PreviewMode = mode.parse()?;
    Ok(Json(state.projector().project(mode).await?))
}

/// Create the projection router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/content", get(published_content))
        .route("/preview/{mode}", get(preview_content))
}
