use axum::extract::{Path, Query, State};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

use super::ApiJson;
use crate::auth::password::hash_password;
use crate::database::models::user::redact;
use crate::database::models::{Role, UserInput, UserUpdate, USER_FIELDS};
use crate::database::paginate;
use crate::database::store::{Collection, Document};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

/// GET /api/v1/users - List users (admin)
pub async fn list(
    State(state): State<AppState>,
    admin: CurrentUser,
    Query(raw): Query<BTreeMap<String, String>>,
) -> ApiResult<Vec<Document>> {
    admin.authorize(&[Role::Admin])?;
    let query = state.translator(USER_FIELDS).translate(&raw)?;
    let mut page = paginate::execute(state.store.as_ref(), Collection::Users, &query, None).await?;
    page.records = page.records.into_iter().map(redact).collect();
    Ok(ApiResponse::page(page))
}

/// GET /api/v1/users/:id - Get a single user (admin)
pub async fn get(State(state): State<AppState>, admin: CurrentUser, Path(id): Path<String>) -> ApiResult<Document> {
    admin.authorize(&[Role::Admin])?;
    let user = state
        .store
        .find_by_id(Collection::Users, &id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("User", &id))?;
    Ok(ApiResponse::success(redact(user)))
}

/// POST /api/v1/users - Create a user with any role (admin)
pub async fn create(
    State(state): State<AppState>,
    admin: CurrentUser,
    ApiJson(input): ApiJson<UserInput>,
) -> ApiResult<Document> {
    admin.authorize(&[Role::Admin])?;
    let role = input.validate(true)?;

    let password_hash = hash_password(input.password.as_deref().unwrap_or_default())?;
    let doc = input.into_document(role, password_hash);

    let user = state.store.insert(Collection::Users, doc).await?;
    info!("Admin {} created user {}", admin.id(), user["id"]);
    Ok(ApiResponse::created(redact(user)))
}

/// PUT /api/v1/users/:id - Update name, email or role (admin)
pub async fn update(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UserUpdate>,
) -> ApiResult<Document> {
    admin.authorize(&[Role::Admin])?;
    let user = state
        .store
        .update(Collection::Users, &id, input.into_document()?)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("User", &id))?;
    Ok(ApiResponse::success(redact(user)))
}

/// DELETE /api/v1/users/:id - Delete a user (admin)
pub async fn delete(State(state): State<AppState>, admin: CurrentUser, Path(id): Path<String>) -> ApiResult<Value> {
    admin.authorize(&[Role::Admin])?;
    state
        .store
        .delete(Collection::Users, &id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("User", &id))?;
    info!("Admin {} deleted user {}", admin.id(), id);
    Ok(ApiResponse::success(json!({})))
}
