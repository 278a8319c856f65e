//! Admin blog endpoints (`/api/blogs`). Every route sits behind the auth gate.

use std::borrow::Cow;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::form::FormBody;
use super::{parse_id, validate_form, BlogPage, ListQuery};
use crate::db::models::{Blog, BlogChanges, BlogFilter, NewBlog, PopulatedBlog};
use crate::error::{AppError, AppResult, FieldError, MessageResponse};
use crate::media;
use crate::state::AppState;

pub const BLOG_NOT_FOUND: &str = "Blog not found";
const INVALID_CATEGORY: &str = "Invalid category id";

fn not_found() -> AppError {
    AppError::NotFound(BLOG_NOT_FOUND.to_string())
}

/// Empty values are left to the length rule.
fn uuid_or_empty(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || Uuid::parse_str(value).is_ok() {
        return Ok(());
    }
    Err(ValidationError::new("uuid").with_message(Cow::Borrowed(INVALID_CATEGORY)))
}

fn category_id(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| {
        AppError::Validation(vec![FieldError::body("category", INVALID_CATEGORY)])
    })
}

#[derive(Debug, Validate)]
struct CreateBlogForm {
    #[validate(length(min = 1))]
    title: String,
    #[validate(length(min = 1))]
    description: String,
    #[validate(length(min = 1))]
    content: String,
    #[validate(length(min = 1), custom(function = "uuid_or_empty"))]
    category: String,
    #[validate(length(min = 1))]
    author: String,
}

impl CreateBlogForm {
    fn from_body(body: &FormBody) -> Self {
        Self {
            title: body.text("title").unwrap_or_default(),
            description: body.text("description").unwrap_or_default(),
            content: body.text("content").unwrap_or_default(),
            category: body.text("category").unwrap_or_default(),
            author: body.text("author").unwrap_or_default(),
        }
    }
}

/// Only these fields can change; anything else in the body is ignored.
#[derive(Debug, Validate)]
struct UpdateBlogForm {
    #[validate(length(min = 1))]
    title: Option<String>,
    #[validate(length(min = 1))]
    description: Option<String>,
    #[validate(length(min = 1))]
    content: Option<String>,
    #[validate(length(min = 1), custom(function = "uuid_or_empty"))]
    category: Option<String>,
    #[validate(length(min = 1))]
    author: Option<String>,
}

impl UpdateBlogForm {
    fn from_body(body: &FormBody) -> Self {
        Self {
            title: body.text("title"),
            description: body.text("description"),
            content: body.text("content"),
            category: body.text("category"),
            author: body.text("author"),
        }
    }
}

/// POST /api/blogs
pub async fn create_blog(
    State(state): State<AppState>,
    body: FormBody,
) -> AppResult<(StatusCode, Json<Blog>)> {
    let form = CreateBlogForm::from_body(&body);
    validate_form(&form, Vec::new())?;
    let category = category_id(&form.category)?;

    let images = media::upload_all(state.images.as_ref(), &body.files).await?;

    let new_blog = NewBlog {
        title: form.title,
        description: form.description,
        content: form.content,
        category,
        author: form.author,
        images,
    };
    let stored = new_blog.images.clone();
    let blog = match state.store.create_blog(new_blog).await {
        Ok(blog) => blog,
        Err(e) => {
            media::delete_all(state.images.as_ref(), &stored).await;
            return Err(e.into());
        }
    };

    tracing::info!(blog_id = %blog.id, images = blog.images.len(), "blog created");
    Ok((StatusCode::CREATED, Json(blog)))
}

/// GET /api/blogs
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<BlogPage>> {
    let page = query.page();
    let (total, blogs) = state
        .store
        .list_blogs(&BlogFilter::default(), page)
        .await?;
    Ok(Json(BlogPage::new(page, total, blogs)))
}

/// GET /api/blogs/{id}, soft-deleted blogs included.
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PopulatedBlog>> {
    let id = parse_id(&id).ok_or_else(not_found)?;
    let blog = state.store.get_blog(id, true).await?.ok_or_else(not_found)?;
    Ok(Json(blog))
}

/// PUT /api/blogs/{id}
///
/// New files replace the stored images entirely. They are uploaded before
/// anything is written; the old images are removed from the host only once
/// the blog points at the new ones.
pub async fn update_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: FormBody,
) -> AppResult<Json<Blog>> {
    let id = parse_id(&id).ok_or_else(not_found)?;
    let existing = state.store.find_blog(id).await?.ok_or_else(not_found)?;

    let form = UpdateBlogForm::from_body(&body);
    validate_form(&form, Vec::new())?;
    let category = form.category.as_deref().map(category_id).transpose()?;

    let new_images = if body.files.is_empty() {
        None
    } else {
        Some(media::upload_all(state.images.as_ref(), &body.files).await?)
    };

    let changes = BlogChanges {
        title: form.title,
        description: form.description,
        content: form.content,
        category,
        author: form.author,
        images: new_images.clone(),
    };

    let updated = match state.store.update_blog(id, changes).await {
        Ok(Some(blog)) => blog,
        outcome => {
            if let Some(images) = &new_images {
                media::delete_all(state.images.as_ref(), images).await;
            }
            return Err(match outcome {
                Err(e) => e.into(),
                _ => not_found(),
            });
        }
    };

    // The blog already points at the new images, so a failed delete of an
    // old one is logged and leaves an orphan on the host rather than failing
    // a committed update.
    if new_images.is_some() {
        media::delete_all(state.images.as_ref(), &existing.images).await;
    }

    tracing::info!(blog_id = %updated.id, "blog updated");
    Ok(Json(updated))
}

/// DELETE /api/blogs/{id}: sets the soft-delete flag, keeping the images.
pub async fn delete_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id).ok_or_else(not_found)?;
    if !state.store.soft_delete_blog(id).await? {
        return Err(not_found());
    }
    tracing::info!(blog_id = %id, "blog soft-deleted");
    Ok(MessageResponse::new("Blog deleted successfully"))
}
