pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod users;

use axum::extract::FromRequest;
use serde_json::Value;

use crate::database::store::Document;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// JSON body extractor whose rejections use the API error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Owners and admins may modify a record; anyone else gets 401
pub(crate) fn ensure_owner(user: &CurrentUser, record: &Document, action: &str) -> Result<(), ApiError> {
    let owner = record.get("user").and_then(Value::as_str);
    if user.is_admin() || owner == Some(user.id()) {
        Ok(())
    } else {
        Err(ApiError::unauthorized(format!("User {} is not authorized to {}", user.id(), action)))
    }
}
