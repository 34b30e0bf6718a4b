use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::{is_email, to_document};
use crate::database::store::{Document, StoreError};

/// Fields exposed to filtering; credentials and reset state are not
pub const USER_FIELDS: &[&str] = &["id", "name", "email", "role", "created_at"];

/// Keys never rendered in responses
const PRIVATE_FIELDS: &[&str] = &["password", "reset_password_token", "reset_password_expire"];

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "publisher" => Some(Role::Publisher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account as loaded from the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl User {
    pub fn from_document(doc: Document) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(doc))
            .map_err(|e| StoreError::QueryError(format!("malformed user document: {}", e)))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Remove credential and reset fields from a raw user document
pub fn redact(mut doc: Document) -> Document {
    for field in PRIVATE_FIELDS {
        doc.remove(*field);
    }
    doc
}

/// Registration and admin-create payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl UserInput {
    /// `allow_admin` is false for self-registration
    pub fn validate(&self, allow_admin: bool) -> Result<Role, StoreError> {
        let mut errors = Vec::new();
        if self.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            errors.push("Please add a name".to_string());
        }
        match self.email.as_deref() {
            None | Some("") => errors.push("Please add an email".to_string()),
            Some(email) if !is_email(email) => errors.push("Please add a valid email".to_string()),
            _ => {}
        }
        check_password(self.password.as_deref(), &mut errors);

        let role = match self.role.as_deref() {
            None => Some(Role::User),
            Some(value) => Role::parse(value).filter(|r| allow_admin || *r != Role::Admin),
        };
        if role.is_none() {
            errors.push(format!("'{}' is not a valid role", self.role.as_deref().unwrap_or_default()));
        }

        match role {
            Some(role) if errors.is_empty() => Ok(role),
            _ => Err(StoreError::Validation(errors)),
        }
    }

    /// Stored form of a validated input; the plaintext password is dropped
    pub fn into_document(self, role: Role, password_hash: String) -> Document {
        let mut doc = Document::new();
        doc.insert("name".into(), Value::String(self.name.unwrap_or_default().trim().to_string()));
        doc.insert("email".into(), Value::String(self.email.unwrap_or_default().trim().to_string()));
        doc.insert("role".into(), Value::String(role.to_string()));
        doc.insert("password".into(), Value::String(password_hash));
        doc
    }
}

/// Fields a user may change about themselves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserDetails {
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut errors = Vec::new();
        if matches!(self.name.as_deref(), Some(n) if n.trim().is_empty()) {
            errors.push("Please add a name".to_string());
        }
        if matches!(self.email.as_deref(), Some(e) if !is_email(e)) {
            errors.push("Please add a valid email".to_string());
        }
        if errors.is_empty() { Ok(()) } else { Err(StoreError::Validation(errors)) }
    }

    pub fn into_document(self) -> Result<Document, StoreError> {
        to_document(&self)
    }
}

/// Admin update payload: details plus role
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserUpdate {
    #[serde(flatten)]
    pub details: UserDetails,
    pub role: Option<String>,
}

impl UserUpdate {
    pub fn into_document(self) -> Result<Document, StoreError> {
        self.details.validate()?;
        let role = match self.role.as_deref() {
            None => None,
            Some(value) => Some(
                Role::parse(value)
                    .ok_or_else(|| StoreError::Validation(vec![format!("'{}' is not a valid role", value)]))?,
            ),
        };
        let mut doc = self.details.into_document()?;
        if let Some(role) = role {
            doc.insert("role".into(), Value::String(role.to_string()));
        }
        Ok(doc)
    }
}

pub fn check_password(password: Option<&str>, errors: &mut Vec<String>) {
    match password {
        None | Some("") => errors.push("Please add a password".to_string()),
        Some(p) if p.chars().count() < MIN_PASSWORD_LENGTH => {
            errors.push(format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH))
        }
        _ => {}
    }
}
