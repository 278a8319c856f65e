/**
 * Routes Module
 * Router assembly plus the pieces shared by every route group
 */
pub mod admin;
pub mod blogs;
pub mod categories;
pub mod form;
pub mod health;
pub mod public;

#[cfg(test)]
pub mod test_support;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::require_admin;
use crate::db::models::{Page, PopulatedBlog};
use crate::error::{field_errors, AppError, AppResult, FieldError, MessageResponse};
use crate::state::AppState;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Mount every route group on one router.
pub fn router(state: AppState) -> Router {
    let guard = middleware::from_fn_with_state(state.clone(), require_admin);

    let admin = Router::new()
        .route("/login", post(admin::login))
        .route("/me", get(admin::me).route_layer(guard.clone()));

    let blogs = Router::new()
        .route("/", get(blogs::list_blogs).post(blogs::create_blog))
        .route(
            "/{id}",
            get(blogs::get_blog)
                .put(blogs::update_blog)
                .delete(blogs::delete_blog),
        )
        .route_layer(guard.clone());

    let categories = Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route_layer(guard);

    let public = Router::new()
        .route("/blogs", get(public::list_blogs))
        .route("/blogs/{id}", get(public::get_blog))
        .route("/categories", get(public::list_categories))
        .route("/search", get(public::search_blogs));

    Router::new()
        .nest("/api/admin", admin)
        .nest("/api/blogs", blogs)
        .nest("/api/categories", categories)
        .nest("/api/public", public)
        .route("/_health", get(health::health))
        .fallback(route_not_found)
        .with_state(state)
}

async fn route_not_found() -> (StatusCode, Json<MessageResponse>) {
    (StatusCode::NOT_FOUND, MessageResponse::new("Route not found"))
}

/// Query string shared by the listing endpoints. Everything arrives as text
/// so malformed numbers fall back to defaults instead of rejecting the
/// request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub q: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        Page {
            page: positive_or(self.page.as_deref(), DEFAULT_PAGE),
            limit: positive_or(self.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }
}

fn positive_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(leading_int).filter(|n| *n >= 1).unwrap_or(default)
}

/// Parse the leading integer of `raw`: `"12abc"` is 12, `"2.5"` is 2.
fn leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |end| sign_len + end);
    s[..digits].parse().ok()
}

/// One page of a blog listing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPage {
    pub blogs: Vec<PopulatedBlog>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total: i64,
}

impl BlogPage {
    pub fn new(page: Page, total: i64, blogs: Vec<PopulatedBlog>) -> Self {
        Self {
            blogs,
            current_page: page.page,
            total_pages: page.total_pages(total),
            total,
        }
    }
}

/// Path ids that are not UUIDs cannot match any row.
pub(crate) fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

/// Run the derived rules plus any checks made by hand, reporting all of them
/// together.
pub(crate) fn validate_form<T: Validate>(form: &T, extra: Vec<FieldError>) -> AppResult<()> {
    let mut errors = match form.validate() {
        Ok(()) => Vec::new(),
        Err(e) => field_errors(&e),
    };
    errors.extend(extra);
    if errors.is_empty() {
        return Ok(());
    }
    errors.sort_by(|a, b| a.path.cmp(&b.path));
    Err(AppError::Validation(errors))
}
