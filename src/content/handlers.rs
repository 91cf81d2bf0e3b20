use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser,
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    pagination::Pagination,
    state::AppState,
};

use super::repo::{self, HeroSlide, SlideFields};

#[derive(Debug, Deserialize)]
pub struct SlideQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "crate::pagination::default_limit")]
    pub limit: i64,
    pub is_active: Option<bool>,
}

/// Create and update share one body. On update absent fields keep their value
/// and an explicit `null` clears them.
#[derive(Debug, Deserialize)]
pub struct SlideRequest {
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub subtitle: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub display_order: Option<Option<i32>>,
}

impl From<SlideRequest> for SlideFields {
    fn from(r: SlideRequest) -> Self {
        Self {
            title: r.title,
            subtitle: r.subtitle,
            image_url: r.image_url,
            is_active: r.is_active,
            display_order: r.display_order,
        }
    }
}

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/content/hero-slides", get(list_slides).post(create_slide))
        .route(
            "/content/hero-slides/:id",
            put(update_slide).delete(delete_slide),
        )
}

/// Public: no token needed.
#[instrument(skip(state))]
pub async fn list_slides(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<SlideQuery>,
) -> Result<Json<Vec<HeroSlide>>, AppError> {
    Pagination {
        skip: q.skip,
        limit: q.limit,
    }
    .validate()?;
    let slides = repo::list(&state.db, q.is_active, q.skip, q.limit).await?;
    Ok(Json(slides))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn create_slide(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<SlideRequest>,
) -> Result<(StatusCode, Json<HeroSlide>), AppError> {
    let slide = repo::create(&state.db, payload.into()).await?;
    info!(slide_id = %slide.id, "hero slide created");
    Ok((StatusCode::CREATED, Json(slide)))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn update_slide(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<SlideRequest>,
) -> Result<Json<HeroSlide>, AppError> {
    let slide = repo::update(&state.db, id, payload.into())
        .await?
        .ok_or(AppError::NotFound("Hero slide"))?;
    info!(slide_id = %slide.id, "hero slide updated");
    Ok(Json(slide))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_slide(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::NotFound("Hero slide"));
    }
    info!(slide_id = %id, "hero slide deleted");
    Ok(StatusCode::NO_CONTENT)
}
