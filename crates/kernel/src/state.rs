//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::content::ContentService;
use crate::db;
use crate::projector::Projector;
use crate::publish::PublishService;
use crate::services::AuditService;
use crate::store::{ContentStore, PgContentStore};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Content store. All entity reads/writes go through this interface.
    store: Arc<dyn ContentStore>,

    /// Authoring CRUD service.
    content: ContentService,

    /// Draft/publish engine.
    publisher: PublishService,

    /// Preview projector.
    projector: Projector,

    /// Audit logging service.
    audit: AuditService,

    /// Loaded configuration.
    config: Config,
}

impl AppState {
    /// Initialize state: connect, apply schema, wire services.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config).await?;
        db::migrate(&pool).await?;

        let store: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(pool.clone()));

        let state = Self::with_store(pool, store, config.clone());
        info!("application state initialized");
        Ok(state)
    }

    /// Wire services over an explicit store. Used by `new` and by tests
    /// that substitute the store implementation.
    pub fn with_store(db: PgPool, store: Arc<dyn ContentStore>, config: Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                content: ContentService::new(store.clone()),
                publisher: PublishService::new(store.clone()),
                projector: Projector::new(store.clone()),
                audit: AuditService::new(db.clone()),
                db,
                store,
                config,
            }),
        }
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the content store.
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.inner.store
    }

    /// Get the authoring service.
    pub fn content(&self) -> &ContentService {
        &self.inner.content
    }

    /// Get the draft/publish engine.
    pub fn publisher(&self) -> &PublishService {
        &self.inner.publisher
    }

    /// Get the preview projector.
    pub fn projector(&self) -> &Projector {
        &self.inner.projector
    }

    /// Get the audit service.
    pub fn audit(&self) -> &AuditService {
        &self.inner.audit
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Check database health.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}
