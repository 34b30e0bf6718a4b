use axum::extract::{Path, Query, State};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::{ensure_owner, ApiJson};
use crate::database::models::course::refresh_average_cost;
use crate::database::models::{CourseInput, Role, COURSE_FIELDS};
use crate::database::paginate::{self, include_related, Include};
use crate::database::store::{Collection, Document, FindOptions};
use crate::error::ApiError;
use crate::filter::Condition;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

const BOOTCAMP_SUMMARY: Include =
    Include::BelongsTo { collection: Collection::Bootcamps, local_key: "bootcamp", fields: &["name", "description"] };

/// GET /api/v1/courses - List courses with filtering, select, sort and pagination
pub async fn list(State(state): State<AppState>, Query(raw): Query<BTreeMap<String, String>>) -> ApiResult<Vec<Document>> {
    let query = state.translator(COURSE_FIELDS).translate(&raw)?;
    let page = paginate::execute(state.store.as_ref(), Collection::Courses, &query, Some(BOOTCAMP_SUMMARY)).await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/v1/bootcamps/:id/courses - All courses of one bootcamp
pub async fn list_for_bootcamp(State(state): State<AppState>, Path(bootcamp_id): Path<String>) -> ApiResult<Vec<Document>> {
    load_bootcamp(&state, &bootcamp_id).await?;
    let filter = [Condition::eq("bootcamp", bootcamp_id.as_str())];
    let courses = state.store.find(Collection::Courses, FindOptions::filter(&filter)).await?;
    let count = courses.len();
    Ok(ApiResponse::success(courses).with_count(count))
}

/// GET /api/v1/courses/:id - Get a single course with its bootcamp summary
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let mut course = load(&state, &id).await?;
    include_related(state.store.as_ref(), &mut course, BOOTCAMP_SUMMARY).await?;
    Ok(ApiResponse::success(course))
}

/// POST /api/v1/bootcamps/:id/courses - Add a course to a bootcamp (bootcamp owner or admin)
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(bootcamp_id): Path<String>,
    ApiJson(input): ApiJson<CourseInput>,
) -> ApiResult<Document> {
    user.authorize(&[Role::Publisher, Role::Admin])?;
    let bootcamp = load_bootcamp(&state, &bootcamp_id).await?;
    ensure_owner(&user, &bootcamp, &format!("add a course to bootcamp {}", bootcamp_id))?;

    input.validate_create()?;
    let mut doc = input.into_document()?;
    doc.insert("bootcamp".into(), Value::String(bootcamp_id.clone()));
    doc.insert("user".into(), Value::String(user.id().to_string()));

    let course = state.store.insert(Collection::Courses, doc).await?;
    refresh_average_cost(state.store.as_ref(), &bootcamp_id).await?;
    Ok(ApiResponse::created(course))
}

/// PUT /api/v1/courses/:id - Update a course (owner or admin)
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<CourseInput>,
) -> ApiResult<Document> {
    user.authorize(&[Role::Publisher, Role::Admin])?;
    let existing = load(&state, &id).await?;
    ensure_owner(&user, &existing, &format!("update course {}", id))?;

    input.validate_update()?;
    let course = state
        .store
        .update(Collection::Courses, &id, input.into_document()?)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Course", &id))?;
    if let Some(bootcamp_id) = course.get("bootcamp").and_then(Value::as_str) {
        refresh_average_cost(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(course))
}

/// DELETE /api/v1/courses/:id - Delete a course (owner or admin)
pub async fn delete(State(state): State<AppState>, user: CurrentUser, Path(id): Path<String>) -> ApiResult<Value> {
    user.authorize(&[Role::Publisher, Role::Admin])?;
    let existing = load(&state, &id).await?;
    ensure_owner(&user, &existing, &format!("delete course {}", id))?;

    state.store.delete(Collection::Courses, &id).await?;
    if let Some(bootcamp_id) = existing.get("bootcamp").and_then(Value::as_str) {
        refresh_average_cost(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(json!({})))
}

async fn load(state: &AppState, id: &str) -> Result<Document, ApiError> {
    state
        .store
        .find_by_id(Collection::Courses, id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Course", id))
}

async fn load_bootcamp(state: &AppState, id: &str) -> Result<Document, ApiError> {
    state
        .store
        .find_by_id(Collection::Bootcamps, id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Bootcamp", id))
}
