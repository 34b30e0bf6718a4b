use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{ensure_owner, ApiJson};
use crate::database::models::bootcamp::DEFAULT_PHOTO;
use crate::database::models::{BootcampInput, Role, BOOTCAMP_FIELDS};
use crate::database::paginate::{self, Include};
use crate::database::store::{Collection, Document, FindOptions};
use crate::error::ApiError;
use crate::filter::geo::{DistanceUnit, GeoRadius};
use crate::filter::{Comparison, Condition};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::photos::{PhotoError, PhotoUpload};
use crate::state::AppState;

const COURSES: Include = Include::HasMany { collection: Collection::Courses, foreign_key: "bootcamp", as_field: "courses" };

/// GET /api/v1/bootcamps - List bootcamps with filtering, select, sort and pagination
pub async fn list(State(state): State<AppState>, Query(raw): Query<BTreeMap<String, String>>) -> ApiResult<Vec<Document>> {
    let query = state.translator(BOOTCAMP_FIELDS).translate(&raw)?;
    if state.config.filter.debug_logging {
        tracing::debug!("bootcamp query: {:?}", query);
    }
    let page = paginate::execute(state.store.as_ref(), Collection::Bootcamps, &query, Some(COURSES)).await?;
    Ok(ApiResponse::page(page))
}

/// GET /api/v1/bootcamps/:id - Get a single bootcamp
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let bootcamp = load(&state, &id).await?;
    Ok(ApiResponse::success(bootcamp))
}

/// POST /api/v1/bootcamps - Create a bootcamp owned by the caller
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<BootcampInput>,
) -> ApiResult<Document> {
    user.authorize(&[Role::Publisher, Role::Admin])?;

    // Publishers get one bootcamp; admins are unlimited
    if !user.is_admin() {
        let mine = [Condition::eq("user", user.id())];
        if state.store.find_one(Collection::Bootcamps, &mine).await?.is_some() {
            return Err(ApiError::bad_request(format!(
                "The user with ID {} has already published a bootcamp",
                user.id()
            )));
        }
    }

    input.validate_create()?;
    let address = input.address.clone().unwrap_or_default();
    let mut doc = input.into_document()?;
    doc.insert("user".into(), Value::String(user.id().to_string()));
    doc.insert("photo".into(), Value::String(DEFAULT_PHOTO.to_string()));

    match state.geocoder.geocode(&address).await? {
        Some(location) => {
            doc.insert("location".into(), location.to_point());
        }
        None => warn!("address '{}' did not geocode; bootcamp saved without location", address),
    }

    let bootcamp = state.store.insert(Collection::Bootcamps, doc).await?;
    info!("User {} created bootcamp {}", user.id(), bootcamp["id"]);
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /api/v1/bootcamps/:id - Update a bootcamp (owner or admin)
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<BootcampInput>,
) -> ApiResult<Document> {
    user.authorize(&[Role::Publisher, Role::Admin])?;
    let existing = load(&state, &id).await?;
    ensure_owner(&user, &existing, "update this bootcamp")?;

    input.validate_update()?;
    let changes = input.into_document()?;
    let bootcamp = state
        .store
        .update(Collection::Bootcamps, &id, changes)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Bootcamp", &id))?;
    Ok(ApiResponse::success(bootcamp))
}

/// DELETE /api/v1/bootcamps/:id - Delete a bootcamp and its courses
pub async fn delete(State(state): State<AppState>, user: CurrentUser, Path(id): Path<String>) -> ApiResult<Value> {
    user.authorize(&[Role::Publisher, Role::Admin])?;
    let existing = load(&state, &id).await?;
    ensure_owner(&user, &existing, "delete this bootcamp")?;

    let removed = state.store.delete_many(Collection::Courses, &[Condition::eq("bootcamp", id.as_str())]).await?;
    state.store.delete(Collection::Bootcamps, &id).await?;
    info!("Deleted bootcamp {} and {} course(s)", id, removed);
    Ok(ApiResponse::success(json!({})))
}

#[derive(Debug, Deserialize)]
pub struct RadiusQuery {
    /// `km` for kilometres; miles otherwise
    pub unit: Option<String>,
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - Bootcamps within a distance of a zipcode
pub async fn within_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
    Query(query): Query<RadiusQuery>,
) -> ApiResult<Vec<Document>> {
    let distance: f64 = distance
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid distance '{}'", distance)))?;
    let unit = match query.unit.as_deref() {
        Some("km") => DistanceUnit::Kilometers,
        _ => DistanceUnit::Miles,
    };

    let Some(location) = state.geocoder.geocode(&zipcode).await? else {
        return Err(ApiError::not_found(format!("No location found for zipcode {}", zipcode)));
    };

    let radius = GeoRadius::new(location.latitude, location.longitude, distance, unit);
    let filter = [Condition { field: "location.coordinates".into(), comparison: Comparison::Within(radius) }];
    let bootcamps = state.store.find(Collection::Bootcamps, FindOptions::filter(&filter)).await?;
    let count = bootcamps.len();
    Ok(ApiResponse::success(bootcamps).with_count(count))
}

/// PUT /api/v1/bootcamps/:id/photo - Upload a bootcamp photo (multipart field `file`)
pub async fn upload_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<String> {
    user.authorize(&[Role::Publisher, Role::Admin])?;
    let existing = load(&state, &id).await?;
    ensure_owner(&user, &existing, "update this bootcamp")?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&state, e))? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(&state, e))?;
        upload = Some(PhotoUpload { file_name, content_type, bytes: bytes.to_vec() });
        break;
    }
    let upload = upload.ok_or(PhotoError::Missing)?;

    let file_name = state.photos.save(&id, &upload).await?;
    let mut changes = Document::new();
    changes.insert("photo".into(), Value::String(file_name.clone()));
    state.store.update(Collection::Bootcamps, &id, changes).await?;
    Ok(ApiResponse::success(file_name))
}

fn multipart_error(state: &AppState, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PhotoError::TooLarge(state.photos.max_size()).into()
    } else {
        ApiError::bad_request(err.body_text())
    }
}

async fn load(state: &AppState, id: &str) -> Result<Document, ApiError> {
    state
        .store
        .find_by_id(Collection::Bootcamps, id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Bootcamp", id))
}
