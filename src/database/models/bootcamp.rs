use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{is_email, push_length, to_document};
use crate::database::store::{Document, StoreError};

/// Fields clients may filter, select and sort bootcamps by
pub const BOOTCAMP_FIELDS: &[&str] = &[
    "id",
    "name",
    "slug",
    "description",
    "website",
    "phone",
    "email",
    "address",
    "location",
    "location.city",
    "location.state",
    "location.zipcode",
    "location.country",
    "careers",
    "average_rating",
    "average_cost",
    "photo",
    "housing",
    "job_assistance",
    "job_guarantee",
    "accept_gi",
    "user",
    "created_at",
];

pub const CAREERS: &[&str] = &[
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Client-writable bootcamp fields. Owner, location, photo, slug and the
/// computed averages are set server-side only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootcampInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub careers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_assistance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_guarantee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_gi: Option<bool>,
}

impl BootcampInput {
    pub fn validate_create(&self) -> Result<(), StoreError> {
        let mut errors = Vec::new();
        if blank(&self.name) {
            errors.push("Please add a name".to_string());
        }
        if blank(&self.description) {
            errors.push("Please add a description".to_string());
        }
        if blank(&self.address) {
            errors.push("Please add an address".to_string());
        }
        self.check_fields(&mut errors);
        into_result(errors)
    }

    pub fn validate_update(&self) -> Result<(), StoreError> {
        let mut errors = Vec::new();
        if self.name.is_some() && blank(&self.name) {
            errors.push("Please add a name".to_string());
        }
        self.check_fields(&mut errors);
        into_result(errors)
    }

    fn check_fields(&self, errors: &mut Vec<String>) {
        push_length(errors, &self.name, 50, "Name can not be more than 50 characters");
        push_length(errors, &self.description, 500, "Description can not be more than 500 characters");
        push_length(errors, &self.phone, 20, "Phone number can not be longer than 20 characters");

        if let Some(website) = &self.website {
            let valid = url::Url::parse(website)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                errors.push("Please use a valid URL with HTTP or HTTPS".to_string());
            }
        }
        if let Some(email) = &self.email {
            if !is_email(email) {
                errors.push("Please add a valid email".to_string());
            }
        }
        if let Some(careers) = &self.careers {
            if let Some(bad) = careers.iter().find(|c| !CAREERS.contains(&c.as_str())) {
                errors.push(format!("'{}' is not a valid career", bad));
            }
        }
    }

    /// Document fields for this input, plus `slug` when the name is set
    pub fn into_document(self) -> Result<Document, StoreError> {
        let slug = self.name.as_deref().map(slugify);
        let mut doc = to_document(&self)?;
        if let Some(slug) = slug {
            doc.insert("slug".into(), Value::String(slug));
        }
        Ok(doc)
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn into_result(errors: Vec<String>) -> Result<(), StoreError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(errors))
    }
}

/// Lowercase, ASCII alphanumerics joined by single dashes
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(v: Value) -> BootcampInput {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("  ModernTech -- Bootcamp! "), "moderntech-bootcamp");
        assert_eq!(slugify("UI/UX 2.0"), "ui-ux-2-0");
    }

    #[test]
    fn test_create_requires_core_fields() {
        let err = input(json!({})).validate_create().unwrap_err();
        match err {
            StoreError::Validation(messages) => assert_eq!(
                messages,
                vec!["Please add a name", "Please add a description", "Please add an address"]
            ),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_field_rules() {
        let bad = input(json!({
            "name": "x".repeat(51),
            "description": "d",
            "address": "a",
            "website": "ftp://example.com",
            "email": "nope",
            "careers": ["Web Development", "Juggling"]
        }));
        let StoreError::Validation(messages) = bad.validate_create().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(messages.len(), 4);
        assert!(messages.contains(&"Name can not be more than 50 characters".to_string()));
        assert!(messages.contains(&"'Juggling' is not a valid career".to_string()));
    }

    #[test]
    fn test_update_allows_partial_input() {
        assert!(input(json!({"housing": true})).validate_update().is_ok());
        assert!(input(json!({"name": " "})).validate_update().is_err());
    }

    #[test]
    fn test_server_side_fields_are_not_writable() {
        let doc = input(json!({"name": "Camp One", "user": "someone", "photo": "x.png", "average_cost": 1}))
            .into_document()
            .unwrap();
        assert_eq!(doc["slug"], "camp-one");
        assert!(!doc.contains_key("user"));
        assert!(!doc.contains_key("photo"));
        assert!(!doc.contains_key("average_cost"));
    }
}
