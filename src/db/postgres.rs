//! PostgreSQL-backed store.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::models::{
    slugify, Admin, Blog, BlogChanges, BlogFilter, BlogImage, Category, CategoryChanges,
    NewAdmin, NewBlog, NewCategory, Page, PopulatedBlog,
};
use super::{
    AdminStore, BlogStore, CategoryStore, ConnectionState, Store, StoreError, StoreResult,
};

const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

const BLOG_COLUMNS: &str =
    "id, title, description, content, category_id, images, author, is_deleted, created_at, updated_at";

const POPULATED_BLOG_SELECT: &str = r#"
    SELECT b.id, b.title, b.description, b.content, b.category_id, b.images, b.author,
           b.is_deleted, b.created_at, b.updated_at,
           c.id AS cat_id, c.name AS cat_name, c.slug AS cat_slug,
           c.description AS cat_description, c.created_at AS cat_created_at,
           c.updated_at AS cat_updated_at
    FROM blogs b
    LEFT JOIN categories c ON c.id = b.category_id
"#;

/// OR semantics over the stemmed terms of the search string.
const SEARCH_QUERY: &str = "replace(plainto_tsquery('english', $1)::text, '&', '|')::tsquery";

#[derive(Debug, FromRow)]
struct BlogRow {
    id: Uuid,
    title: String,
    description: String,
    content: String,
    category_id: Uuid,
    images: Json<Vec<BlogImage>>,
    author: String,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BlogRow> for Blog {
    fn from(row: BlogRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            content: row.content,
            category: row.category_id,
            images: row.images.0,
            author: row.author,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PopulatedBlogRow {
    #[sqlx(flatten)]
    blog: BlogRow,
    cat_id: Option<Uuid>,
    cat_name: Option<String>,
    cat_slug: Option<String>,
    cat_description: Option<String>,
    cat_created_at: Option<DateTime<Utc>>,
    cat_updated_at: Option<DateTime<Utc>>,
}

impl From<PopulatedBlogRow> for PopulatedBlog {
    fn from(row: PopulatedBlogRow) -> Self {
        let category = match (
            row.cat_id,
            row.cat_name,
            row.cat_slug,
            row.cat_created_at,
            row.cat_updated_at,
        ) {
            (Some(id), Some(name), Some(slug), Some(created_at), Some(updated_at)) => {
                Some(Category {
                    id,
                    name,
                    slug,
                    description: row.cat_description,
                    created_at,
                    updated_at,
                })
            }
            _ => None,
        };
        Blog::from(row.blog).populate(category)
    }
}

/// Map unique-constraint violations to [`StoreError::Conflict`].
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(db_err.constraint().unwrap_or("unique").to_string());
        }
    }
    StoreError::Database(err)
}

pub struct PgStore {
    pool: PgPool,
    ever_connected: AtomicBool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            ever_connected: AtomicBool::new(false),
        }
    }

    /// Close every pooled connection; used on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        tracing::info!("Running database migrations...");

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name TEXT NOT NULL UNIQUE,
                slug TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS blogs (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                content TEXT NOT NULL,
                category_id UUID NOT NULL,
                images JSONB NOT NULL DEFAULT '[]',
                author TEXT NOT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT false,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                search_vector TSVECTOR GENERATED ALWAYS AS (
                    to_tsvector('english', title || ' ' || content)
                ) STORED
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_blogs_search ON blogs USING GIN(search_vector)",
            "CREATE INDEX IF NOT EXISTS idx_blogs_live_created ON blogs(is_deleted, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_blogs_category ON blogs(category_id)",
            r#"
            CREATE TABLE IF NOT EXISTS admins (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_admins_email_lower ON admins(LOWER(email))",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        tracing::info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let sql = format!(
            "INSERT INTO categories (id, name, slug, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, now(), now()) \
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(Uuid::new_v4())
            .bind(&category.name)
            .bind(slugify(&category.name))
            .bind(&category.description)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        let slug = changes.name.as_deref().map(slugify);
        let clear_or_set_description = changes.description.is_some();
        let description = changes.description.flatten();

        let sql = format!(
            "UPDATE categories \
             SET name = COALESCE($2, name), \
                 slug = COALESCE($3, slug), \
                 description = CASE WHEN $4 THEN $5 ELSE description END, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(&changes.name)
            .bind(&slug)
            .bind(clear_or_set_description)
            .bind(&description)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BlogStore for PgStore {
    async fn create_blog(&self, blog: NewBlog) -> StoreResult<Blog> {
        let sql = format!(
            "INSERT INTO blogs (id, title, description, content, category_id, images, author, \
                                is_deleted, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, false, now(), now()) \
             RETURNING {BLOG_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&blog.title)
            .bind(&blog.description)
            .bind(&blog.content)
            .bind(blog.category)
            .bind(Json(&blog.images))
            .bind(&blog.author)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(row.into())
    }

    async fn list_blogs(
        &self,
        filter: &BlogFilter,
        page: Page,
    ) -> StoreResult<(i64, Vec<PopulatedBlog>)> {
        let sql = format!(
            "{POPULATED_BLOG_SELECT} \
             WHERE b.is_deleted = false AND ($1::uuid IS NULL OR b.category_id = $1) \
             ORDER BY b.created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, PopulatedBlogRow>(&sql)
            .bind(filter.category)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM blogs \
             WHERE is_deleted = false AND ($1::uuid IS NULL OR category_id = $1)",
        )
        .bind(filter.category)
        .fetch_one(&self.pool)
        .await?;

        Ok((total, rows.into_iter().map(Into::into).collect()))
    }

    async fn search_blogs(
        &self,
        query: &str,
        page: Page,
    ) -> StoreResult<(i64, Vec<PopulatedBlog>)> {
        let sql = format!(
            "WITH q AS (SELECT {SEARCH_QUERY} AS query) \
             {POPULATED_BLOG_SELECT} \
             CROSS JOIN q \
             WHERE b.is_deleted = false AND b.search_vector @@ q.query \
             ORDER BY ts_rank(b.search_vector, q.query) DESC, b.created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, PopulatedBlogRow>(&sql)
            .bind(query)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM blogs \
             WHERE is_deleted = false AND search_vector @@ {SEARCH_QUERY}"
        );
        let (total,): (i64,) = sqlx::query_as(&count_sql)
            .bind(query)
            .fetch_one(&self.pool)
            .await?;

        Ok((total, rows.into_iter().map(Into::into).collect()))
    }

    async fn get_blog(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> StoreResult<Option<PopulatedBlog>> {
        let sql = format!("{POPULATED_BLOG_SELECT} WHERE b.id = $1 AND ($2 OR b.is_deleted = false)");
        let row = sqlx::query_as::<_, PopulatedBlogRow>(&sql)
            .bind(id)
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_blog(&self, id: Uuid) -> StoreResult<Option<Blog>> {
        let sql = format!("SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1");
        let row = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn update_blog(&self, id: Uuid, changes: BlogChanges) -> StoreResult<Option<Blog>> {
        let sql = format!(
            "UPDATE blogs \
             SET title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 content = COALESCE($4, content), \
                 category_id = COALESCE($5, category_id), \
                 author = COALESCE($6, author), \
                 images = COALESCE($7, images), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {BLOG_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(&changes.content)
            .bind(changes.category)
            .bind(&changes.author)
            .bind(changes.images.as_ref().map(Json))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(row.map(Into::into))
    }

    async fn soft_delete_blog(&self, id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE blogs SET is_deleted = true, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        Ok(sqlx::query_as::<_, Admin>(
            "SELECT id, email, password_hash, created_at FROM admins WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_admin(&self, admin: NewAdmin) -> StoreResult<Admin> {
        sqlx::query_as::<_, Admin>(
            "INSERT INTO admins (id, email, password_hash, created_at) \
             VALUES ($1, $2, $3, now()) \
             RETURNING id, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn connection_state(&self) -> ConnectionState {
        if self.pool.is_closed() {
            return if self.pool.size() > 0 {
                ConnectionState::Disconnecting
            } else {
                ConnectionState::Disconnected
            };
        }

        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => {
                self.ever_connected.store(true, Ordering::Relaxed);
                ConnectionState::Connected
            }
            Err(e) => {
                tracing::debug!(error = %e, "database ping failed");
                if self.ever_connected.load(Ordering::Relaxed) {
                    ConnectionState::Disconnected
                } else {
                    ConnectionState::Connecting
                }
            }
        }
    }
}
