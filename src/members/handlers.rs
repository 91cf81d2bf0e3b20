use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, CurrentUser},
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

use super::{
    dto::{CreateMemberRequest, MemberQuery, UpdateMemberRequest},
    repo,
    repo_types::{Member, MemberChanges, NewMember},
};

pub fn members_routes() -> Router<AppState> {
    Router::new()
        .route("/members", get(list_members).post(create_member))
        .route(
            "/members/:id",
            get(get_member).put(update_member).delete(delete_member),
        )
}

#[instrument(skip(state, _caller))]
pub async fn list_members(
    State(state): State<AppState>,
    _caller: CurrentUser,
    AppQuery(q): AppQuery<MemberQuery>,
) -> Result<Json<Vec<Member>>, AppError> {
    let filter = q.into_filter()?;
    let members = repo::list(&state.db, &filter).await?;
    Ok(Json(members))
}

#[instrument(skip(state, _caller))]
pub async fn get_member(
    State(state): State<AppState>,
    _caller: CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Member>, AppError> {
    let member = repo::get(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Member"))?;
    Ok(Json(member))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn create_member(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<CreateMemberRequest>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    let new = NewMember::from(payload);
    if new.name.is_empty() {
        return Err(AppError::Validation("Name must not be empty".into()));
    }
    let member = repo::create(&state.db, new).await?;
    info!(member_id = %member.id, "member created");
    Ok((StatusCode::CREATED, Json(member)))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn update_member(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateMemberRequest>,
) -> Result<Json<Member>, AppError> {
    let changes = MemberChanges::from(payload);
    if changes.name.as_deref() == Some("") {
        return Err(AppError::Validation("Name must not be empty".into()));
    }
    let member = repo::update(&state.db, id, changes)
        .await?
        .ok_or(AppError::NotFound("Member"))?;
    info!(member_id = %member.id, "member updated");
    Ok(Json(member))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_member(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !repo::deactivate(&state.db, id).await? {
        return Err(AppError::NotFound("Member"));
    }
    info!(member_id = %id, "member deactivated");
    Ok(Json(json!({ "message": "Member deleted successfully" })))
}
