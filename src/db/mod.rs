pub mod models;
pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::config::{parse_env, required, ConfigError};
use models::{
    Admin, Blog, BlogChanges, BlogFilter, Category, CategoryChanges, NewAdmin, NewBlog,
    NewCategory, Page, PopulatedBlog,
};

pub use postgres::PgStore;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: required("DATABASE_URL")?,
            max_connections: parse_env("DB_POOL_MAX", 10)?,
            min_connections: parse_env("DB_POOL_MIN", 0)?,
            acquire_timeout_secs: parse_env("DB_ACQUIRE_TIMEOUT", 5)?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT", 300)?,
        })
    }
}

/// Build the process-wide connection pool.
///
/// The pool connects lazily so the server can start (and report
/// `connecting` on `/_health`) while the database is still coming up.
pub fn init_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .connect_lazy(&config.url)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Database connectivity as reported by `/_health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Connecting,
    Disconnecting,
    Disconnected,
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// All categories ordered by name ascending.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    /// Insert a category, deriving its slug. Fails with
    /// [`StoreError::Conflict`] when the name or slug is taken.
    async fn create_category(&self, category: NewCategory) -> StoreResult<Category>;
    /// Apply `changes`; returns `None` when no category has `id`.
    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>>;
    /// Hard delete. Blogs referencing the category are left untouched.
    async fn delete_category(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn create_blog(&self, blog: NewBlog) -> StoreResult<Blog>;
    /// Live blogs, newest first, with the total matching count.
    async fn list_blogs(
        &self,
        filter: &BlogFilter,
        page: Page,
    ) -> StoreResult<(i64, Vec<PopulatedBlog>)>;
    /// Live blogs matching any term of `query` in title or content, most
    /// relevant first.
    async fn search_blogs(&self, query: &str, page: Page)
        -> StoreResult<(i64, Vec<PopulatedBlog>)>;
    async fn get_blog(&self, id: Uuid, include_deleted: bool)
        -> StoreResult<Option<PopulatedBlog>>;
    /// Unpopulated lookup regardless of the soft-delete flag.
    async fn find_blog(&self, id: Uuid) -> StoreResult<Option<Blog>>;
    async fn update_blog(&self, id: Uuid, changes: BlogChanges) -> StoreResult<Option<Blog>>;
    /// Set `is_deleted`; returns whether a blog with `id` exists.
    async fn soft_delete_blog(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>>;
    async fn create_admin(&self, admin: NewAdmin) -> StoreResult<Admin>;
}

/// Everything the HTTP layer needs from persistence.
#[async_trait]
pub trait Store: CategoryStore + BlogStore + AdminStore {
    async fn connection_state(&self) -> ConnectionState;
}
