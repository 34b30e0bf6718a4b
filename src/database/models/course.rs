use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{push_length, to_document};
use crate::database::store::{Collection, Document, DocumentStore, FindOptions, StoreError};
use crate::filter::Condition;

pub const COURSE_FIELDS: &[&str] = &[
    "id",
    "title",
    "description",
    "weeks",
    "tuition",
    "minimum_skill",
    "scholarship_available",
    "bootcamp",
    "user",
    "created_at",
];

pub const SKILLS: &[&str] = &["beginner", "intermediate", "advanced"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weeks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuition: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_skill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholarship_available: Option<bool>,
}

impl CourseInput {
    pub fn validate_create(&self) -> Result<(), StoreError> {
        let mut errors = Vec::new();
        if self.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            errors.push("Please add a course title".to_string());
        }
        if self.description.as_deref().map_or(true, |d| d.trim().is_empty()) {
            errors.push("Please add a description".to_string());
        }
        if self.weeks.is_none() {
            errors.push("Please add number of weeks".to_string());
        }
        if self.tuition.is_none() {
            errors.push("Please add a tuition cost".to_string());
        }
        if self.minimum_skill.is_none() {
            errors.push("Please add a minimum skill".to_string());
        }
        self.check_fields(&mut errors);
        if errors.is_empty() { Ok(()) } else { Err(StoreError::Validation(errors)) }
    }

    pub fn validate_update(&self) -> Result<(), StoreError> {
        let mut errors = Vec::new();
        self.check_fields(&mut errors);
        if errors.is_empty() { Ok(()) } else { Err(StoreError::Validation(errors)) }
    }

    fn check_fields(&self, errors: &mut Vec<String>) {
        push_length(errors, &self.title, 100, "Title can not be more than 100 characters");
        if let Some(skill) = &self.minimum_skill {
            if !SKILLS.contains(&skill.as_str()) {
                errors.push("Minimum skill must be one of beginner, intermediate, advanced".to_string());
            }
        }
        if matches!(self.tuition, Some(t) if t < 0.0) {
            errors.push("Tuition can not be negative".to_string());
        }
    }

    pub fn into_document(self) -> Result<Document, StoreError> {
        to_document(&self)
    }
}

/// Recompute a bootcamp's `average_cost` from its courses' tuition, rounded
/// up to the next multiple of ten. Cleared when no course has tuition.
pub async fn refresh_average_cost(store: &dyn DocumentStore, bootcamp_id: &str) -> Result<(), StoreError> {
    let filter = [Condition::eq("bootcamp", bootcamp_id)];
    let courses = store.find(Collection::Courses, FindOptions::filter(&filter)).await?;
    let tuition: Vec<f64> = courses.iter().filter_map(|c| c.get("tuition").and_then(Value::as_f64)).collect();

    let average = if tuition.is_empty() {
        Value::Null
    } else {
        let mean = tuition.iter().sum::<f64>() / tuition.len() as f64;
        json!(((mean / 10.0).ceil() * 10.0) as i64)
    };
    debug!("bootcamp {} average_cost -> {}", bootcamp_id, average);

    let mut changes = Document::new();
    changes.insert("average_cost".into(), average);
    store.update(Collection::Bootcamps, bootcamp_id, changes).await?;
    Ok(())
}
