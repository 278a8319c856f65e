//! Database Models - entities persisted by the store and serialised to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Derive a category slug: lower-case, every character outside
/// `[a-zA-Z0-9]` replaced by `-`.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Category model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New category for insertion. The slug is derived by the store.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// Allow-listed category mutation.
///
/// `description: Some(None)` clears the stored description.
#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

/// Image stored on the external host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogImage {
    pub url: String,
    pub public_id: String,
}

/// Blog model with its category as a bare reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: Uuid,
    pub images: Vec<BlogImage>,
    pub author: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Blog with its category resolved; `None` when the category was deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedBlog {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: Option<Category>,
    pub images: Vec<BlogImage>,
    pub author: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    pub fn populate(self, category: Option<Category>) -> PopulatedBlog {
        PopulatedBlog {
            id: self.id,
            title: self.title,
            description: self.description,
            content: self.content,
            category,
            images: self.images,
            author: self.author,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// New blog for creation. Always stored with `is_deleted = false`.
#[derive(Debug, Clone)]
pub struct NewBlog {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: Uuid,
    pub author: String,
    pub images: Vec<BlogImage>,
}

/// Allow-listed blog mutation; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct BlogChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: Option<Uuid>,
    pub author: Option<String>,
    pub images: Option<Vec<BlogImage>>,
}

/// Filter for live-blog listings.
#[derive(Debug, Clone, Default)]
pub struct BlogFilter {
    pub category: Option<Uuid>,
}

/// One page of a listing, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        (total - 1) / self.limit + 1
    }
}

/// Admin account. The hash never leaves the server.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub password_hash: String,
}
