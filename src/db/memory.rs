use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    slugify, Admin, Blog, BlogChanges, BlogFilter, Category, CategoryChanges, NewAdmin, NewBlog,
    NewCategory, Page, PopulatedBlog,
};
use super::{
    AdminStore, BlogStore, CategoryStore, ConnectionState, Store, StoreError, StoreResult,
};

/// In-memory store used by handler tests.
pub struct MemoryStore {
    categories: RwLock<Vec<Category>>,
    blogs: RwLock<Vec<Blog>>,
    admins: RwLock<Vec<Admin>>,
    state: RwLock<ConnectionState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            categories: RwLock::new(Vec::new()),
            blogs: RwLock::new(Vec::new()),
            admins: RwLock::new(Vec::new()),
            state: RwLock::new(ConnectionState::Connected),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_connection_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    pub async fn blog_count(&self) -> usize {
        self.blogs.read().await.len()
    }

    pub async fn category_count(&self) -> usize {
        self.categories.read().await.len()
    }

    async fn populate(&self, blogs: Vec<Blog>) -> Vec<PopulatedBlog> {
        let categories = self.categories.read().await;
        blogs
            .into_iter()
            .map(|blog| {
                let category = categories.iter().find(|c| c.id == blog.category).cloned();
                blog.populate(category)
            })
            .collect()
    }

    /// Newest first; blogs created within the same instant keep reverse
    /// insertion order.
    fn newest_first(mut blogs: Vec<Blog>) -> Vec<Blog> {
        blogs.reverse();
        blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        blogs
    }

    fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
        items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect()
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn relevance(blog: &Blog, query_terms: &[String]) -> usize {
    let words = terms(&format!("{} {}", blog.title, blog.content));
    words.iter().filter(|w| query_terms.contains(w)).count()
}

fn taken(categories: &[Category], name: &str, slug: &str, except: Option<Uuid>) -> bool {
    categories
        .iter()
        .filter(|c| Some(c.id) != except)
        .any(|c| c.name == name || c.slug == slug)
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let mut categories = self.categories.read().await.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self
            .categories
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut categories = self.categories.write().await;
        let slug = slugify(&category.name);
        if taken(&categories, &category.name, &slug, None) {
            return Err(StoreError::Conflict("categories_name_key".to_string()));
        }
        let now = Utc::now();
        let created = Category {
            id: Uuid::new_v4(),
            name: category.name,
            slug,
            description: category.description,
            created_at: now,
            updated_at: now,
        };
        categories.push(created.clone());
        Ok(created)
    }

    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        let mut categories = self.categories.write().await;
        let Some(index) = categories.iter().position(|c| c.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &changes.name {
            if taken(&categories, name, &slugify(name), Some(id)) {
                return Err(StoreError::Conflict("categories_name_key".to_string()));
            }
        }

        let category = &mut categories[index];
        if let Some(name) = changes.name {
            category.slug = slugify(&name);
            category.name = name;
        }
        if let Some(description) = changes.description {
            category.description = description;
        }
        category.updated_at = Utc::now();
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<bool> {
        let mut categories = self.categories.write().await;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        Ok(categories.len() < before)
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn create_blog(&self, blog: NewBlog) -> StoreResult<Blog> {
        let now = Utc::now();
        let created = Blog {
            id: Uuid::new_v4(),
            title: blog.title,
            description: blog.description,
            content: blog.content,
            category: blog.category,
            images: blog.images,
            author: blog.author,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.blogs.write().await.push(created.clone());
        Ok(created)
    }

    async fn list_blogs(
        &self,
        filter: &BlogFilter,
        page: Page,
    ) -> StoreResult<(i64, Vec<PopulatedBlog>)> {
        let live: Vec<Blog> = self
            .blogs
            .read()
            .await
            .iter()
            .filter(|b| !b.is_deleted)
            .filter(|b| filter.category.map_or(true, |c| b.category == c))
            .cloned()
            .collect();
        let total = live.len() as i64;
        let items = Self::paginate(Self::newest_first(live), page);
        Ok((total, self.populate(items).await))
    }

    async fn search_blogs(
        &self,
        query: &str,
        page: Page,
    ) -> StoreResult<(i64, Vec<PopulatedBlog>)> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, Blog)> = Self::newest_first(
            self.blogs
                .read()
                .await
                .iter()
                .filter(|b| !b.is_deleted)
                .cloned()
                .collect(),
        )
        .into_iter()
        .map(|b| (relevance(&b, &query_terms), b))
        .filter(|(score, _)| *score > 0)
        .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let total = scored.len() as i64;
        let items = Self::paginate(scored.into_iter().map(|(_, b)| b).collect(), page);
        Ok((total, self.populate(items).await))
    }

    async fn get_blog(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> StoreResult<Option<PopulatedBlog>> {
        let blog = self
            .blogs
            .read()
            .await
            .iter()
            .find(|b| b.id == id && (include_deleted || !b.is_deleted))
            .cloned();
        match blog {
            Some(blog) => Ok(self.populate(vec![blog]).await.pop()),
            None => Ok(None),
        }
    }

    async fn find_blog(&self, id: Uuid) -> StoreResult<Option<Blog>> {
        Ok(self.blogs.read().await.iter().find(|b| b.id == id).cloned())
    }

    async fn update_blog(&self, id: Uuid, changes: BlogChanges) -> StoreResult<Option<Blog>> {
        let mut blogs = self.blogs.write().await;
        let Some(blog) = blogs.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            blog.title = title;
        }
        if let Some(description) = changes.description {
            blog.description = description;
        }
        if let Some(content) = changes.content {
            blog.content = content;
        }
        if let Some(category) = changes.category {
            blog.category = category;
        }
        if let Some(author) = changes.author {
            blog.author = author;
        }
        if let Some(images) = changes.images {
            blog.images = images;
        }
        blog.updated_at = Utc::now();
        Ok(Some(blog.clone()))
    }

    async fn soft_delete_blog(&self, id: Uuid) -> StoreResult<bool> {
        let mut blogs = self.blogs.write().await;
        match blogs.iter_mut().find(|b| b.id == id) {
            Some(blog) => {
                blog.is_deleted = true;
                blog.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        Ok(self
            .admins
            .read()
            .await
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_admin(&self, admin: NewAdmin) -> StoreResult<Admin> {
        let mut admins = self.admins.write().await;
        if admins.iter().any(|a| a.email.eq_ignore_ascii_case(&admin.email)) {
            return Err(StoreError::Conflict("admins_email_key".to_string()));
        }
        let created = Admin {
            id: Uuid::new_v4(),
            email: admin.email,
            password_hash: admin.password_hash,
            created_at: Utc::now(),
        };
        admins.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }
}
