//! Admin category endpoints (`/api/categories`).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::form::FormBody;
use super::{parse_id, validate_form};
use crate::db::models::{Category, CategoryChanges, NewCategory};
use crate::db::StoreError;
use crate::error::{AppError, AppResult, MessageResponse};
use crate::state::AppState;

pub const CATEGORY_NOT_FOUND: &str = "Category not found";

fn not_found() -> AppError {
    AppError::NotFound(CATEGORY_NOT_FOUND.to_string())
}

/// Unique-constraint failures become a 400 with `message`.
fn conflict(err: StoreError, message: &str) -> AppError {
    match err {
        StoreError::Conflict(constraint) => {
            tracing::debug!(%constraint, "category name taken");
            AppError::BadRequest(message.to_string())
        }
        other => other.into(),
    }
}

#[derive(Debug, Validate)]
struct CreateCategoryForm {
    #[validate(length(min = 1))]
    name: String,
    description: Option<String>,
}

#[derive(Debug, Validate)]
struct UpdateCategoryForm {
    #[validate(length(min = 1))]
    name: Option<String>,
    description: Option<Option<String>>,
}

impl UpdateCategoryForm {
    fn from_body(body: &FormBody) -> Self {
        Self {
            name: body.text("name"),
            // Absent leaves the description alone; null or blank clears it.
            description: body
                .field("description")
                .map(|value| value.filter(|d| !d.is_empty())),
        }
    }
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    body: FormBody,
) -> AppResult<(StatusCode, Json<Category>)> {
    let form = CreateCategoryForm {
        name: body.text("name").unwrap_or_default(),
        description: body.text("description").filter(|d| !d.is_empty()),
    };
    validate_form(&form, Vec::new())?;

    let category = state
        .store
        .create_category(NewCategory {
            name: form.name,
            description: form.description,
        })
        .await
        .map_err(|e| conflict(e, "Category already exists"))?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.store.list_categories().await?))
}

/// GET /api/categories/{id}
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Category>> {
    let id = parse_id(&id).ok_or_else(not_found)?;
    let category = state.store.get_category(id).await?.ok_or_else(not_found)?;
    Ok(Json(category))
}

/// PUT /api/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: FormBody,
) -> AppResult<Json<Category>> {
    let id = parse_id(&id).ok_or_else(not_found)?;
    let form = UpdateCategoryForm::from_body(&body);
    validate_form(&form, Vec::new())?;

    let changes = CategoryChanges {
        name: form.name,
        description: form.description,
    };
    let category = state
        .store
        .update_category(id, changes)
        .await
        .map_err(|e| conflict(e, "Category name already exists"))?
        .ok_or_else(not_found)?;

    tracing::info!(category_id = %category.id, "category updated");
    Ok(Json(category))
}

/// DELETE /api/categories/{id}
///
/// Blogs keep their reference; reads then show `category: null`.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id).ok_or_else(not_found)?;
    if !state.store.delete_category(id).await? {
        return Err(not_found());
    }
    tracing::info!(category_id = %id, "category deleted");
    Ok(MessageResponse::new("Category deleted successfully"))
}
