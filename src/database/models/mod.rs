pub mod bootcamp;
pub mod course;
pub mod user;

pub use bootcamp::{BootcampInput, BOOTCAMP_FIELDS};
pub use course::{CourseInput, COURSE_FIELDS};
pub use user::{Role, User, UserDetails, UserInput, UserUpdate, USER_FIELDS};

use serde::Serialize;
use serde_json::Value;

use super::store::{Document, StoreError};

pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::QueryError("input is not an object".to_string())),
        Err(e) => Err(StoreError::QueryError(e.to_string())),
    }
}

pub(crate) fn push_length(errors: &mut Vec<String>, value: &Option<String>, max: usize, message: &str) {
    if matches!(value, Some(v) if v.chars().count() > max) {
        errors.push(message.to_string());
    }
}

/// Loose shape check: one `@`, non-empty local part, dotted domain
pub(crate) fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
        && !value.contains(char::is_whitespace)
}
