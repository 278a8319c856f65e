//! Public read endpoints (`/api/public`). Soft-deleted blogs never appear.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::blogs::BLOG_NOT_FOUND;
use super::{parse_id, BlogPage, ListQuery};
use crate::db::models::{BlogFilter, Category, PopulatedBlog};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/public/blogs, optionally filtered by `category` id.
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<BlogPage>> {
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            parse_id(raw).ok_or_else(|| AppError::BadRequest("Invalid category id".to_string()))?,
        ),
    };

    let page = query.page();
    let (total, blogs) = state
        .store
        .list_blogs(&BlogFilter { category }, page)
        .await?;
    Ok(Json(BlogPage::new(page, total, blogs)))
}

/// GET /api/public/blogs/{id}
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PopulatedBlog>> {
    let not_found = || AppError::NotFound(BLOG_NOT_FOUND.to_string());
    let id = parse_id(&id).ok_or_else(not_found)?;
    let blog = state
        .store
        .get_blog(id, false)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(blog))
}

/// GET /api/public/categories
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.store.list_categories().await?))
}

/// GET /api/public/search?q=
pub async fn search_blogs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<BlogPage>> {
    let terms = query.q.as_deref().map(str::trim).unwrap_or_default();
    if terms.is_empty() {
        return Err(AppError::BadRequest("Search query is required".to_string()));
    }

    let page = query.page();
    let (total, blogs) = state.store.search_blogs(terms, page).await?;
    tracing::debug!(q = %terms, total, "search");
    Ok(Json(BlogPage::new(page, total, blogs)))
}
