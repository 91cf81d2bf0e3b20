use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{PublicUser, RegisterRequest},
        extractors::{AdminUser, CurrentUser},
        password::hash_password,
        repo_types::{Role, UserChanges},
        services::{self, validate_name, validate_password},
    },
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    pagination::Pagination,
    state::AppState,
};

use super::dto::{UpdateMeRequest, UpdateUserRequest};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/me", patch(update_me))
        .route("/users/:id", patch(update_user))
}

#[instrument(skip(state, _caller))]
pub async fn list_users(
    State(state): State<AppState>,
    _caller: CurrentUser,
    AppQuery(p): AppQuery<Pagination>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    p.validate()?;
    let users = state.users.list(p.skip, p.limit).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.0.id))]
pub async fn create_user(
    State(state): State<AppState>,
    admin: AdminUser,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::register(state.users.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, me, payload), fields(user_id = %me.id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    AppJson(payload): AppJson<UpdateMeRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let mut changes = UserChanges::default();
    if let Some(name) = payload.name {
        changes.name = Some(validate_name(&name)?);
    }
    if let Some(password) = payload.password {
        validate_password(&password)?;
        changes.password_hash = Some(hash_password(&password)?);
    }

    let user = state
        .users
        .update(me.id, changes)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    info!("profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    if id == admin.id
        && (payload.is_active == Some(false) || payload.role == Some(Role::Member))
    {
        return Err(AppError::Validation(
            "Admins cannot deactivate or demote themselves".into(),
        ));
    }

    let changes = UserChanges {
        name: payload.name.as_deref().map(validate_name).transpose()?,
        password_hash: None,
        role: payload.role,
        is_active: payload.is_active,
    };

    let user = state
        .users
        .update(id, changes)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    info!(user_id = %user.id, role = user.role.as_str(), is_active = user.is_active, "user updated");
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        app::build_app,
        auth::{
            password::hash_password,
            repo_types::{NewUser, Role, User},
        },
        state::AppState,
    };

    async fn seed(state: &AppState, email: &str, role: Role) -> (User, String) {
        let user = state
            .users
            .insert(NewUser {
                email: email.into(),
                password_hash: hash_password("pw123").unwrap(),
                name: "Seed".into(),
                role,
                is_active: true,
            })
            .await
            .unwrap()
            .unwrap();
        let token = state.keys.issue(email).unwrap().token;
        (user, token)
    }

    async fn call(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json");
        let req = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn member_can_list_but_not_create() {
        let state = AppState::fake();
        let (_, token) = seed(&state, "ana@x.com", Role::Member).await;
        let app = build_app(state);

        let (status, body) = call(&app, "GET", "/api/v1/users", &token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/users",
            &token,
            Some(json!({"email": "new@x.com", "password": "pw", "name": "New"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_creates_and_deactivates_user() {
        let state = AppState::fake();
        let (_, admin_token) = seed(&state, "boss@x.com", Role::Admin).await;
        let (member, member_token) = seed(&state, "ana@x.com", Role::Member).await;
        let app = build_app(state);

        let (status, created) = call(
            &app,
            "POST",
            "/api/v1/users",
            &admin_token,
            Some(json!({"email": "new@x.com", "password": "pw", "name": "New"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["email"], "new@x.com");

        let (status, updated) = call(
            &app,
            "PATCH",
            &format!("/api/v1/users/{}", member.id),
            &admin_token,
            Some(json!({"is_active": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["is_active"], false);

        // the deactivated member's still-unexpired token no longer works
        let (status, _) = call(&app, "GET", "/api/v1/auth/me", &member_token, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_cannot_demote_self() {
        let state = AppState::fake();
        let (admin, token) = seed(&state, "boss@x.com", Role::Admin).await;
        let app = build_app(state);

        let (status, _) = call(
            &app,
            "PATCH",
            &format!("/api/v1/users/{}", admin.id),
            &token,
            Some(json!({"role": "member"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn update_unknown_user_is_404() {
        let state = AppState::fake();
        let (_, token) = seed(&state, "boss@x.com", Role::Admin).await;
        let app = build_app(state);

        let (status, body) = call(
            &app,
            "PATCH",
            &format!("/api/v1/users/{}", uuid::Uuid::new_v4()),
            &token,
            Some(json!({"name": "X"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "User not found");
    }

    #[tokio::test]
    async fn password_change_takes_effect_on_login() {
        let state = AppState::fake();
        let (_, token) = seed(&state, "ana@x.com", Role::Member).await;
        let app = build_app(state);

        let (status, _) = call(
            &app,
            "PATCH",
            "/api/v1/users/me",
            &token,
            Some(json!({"password": "n3w-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (old, _) = call(
            &app,
            "POST",
            "/api/v1/auth/login",
            "",
            Some(json!({"email": "ana@x.com", "password": "pw123"})),
        )
        .await;
        let (new, _) = call(
            &app,
            "POST",
            "/api/v1/auth/login",
            "",
            Some(json!({"email": "ana@x.com", "password": "n3w-pass"})),
        )
        .await;
        assert_eq!(old, StatusCode::UNAUTHORIZED);
        assert_eq!(new, StatusCode::OK);
    }
}
