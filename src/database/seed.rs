use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

use super::models::bootcamp::{slugify, DEFAULT_PHOTO};
use super::models::course::refresh_average_cost;
use super::store::{Collection, Document, DocumentStore};
use crate::auth::password::hash_password;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub bootcamps: usize,
    pub courses: usize,
    pub users: usize,
}

fn read_documents(dir: &Path, file: &str) -> Result<Vec<Document>> {
    let path = dir.join(file);
    let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?;
    let Value::Array(items) = value else {
        bail!("{} must contain a JSON array", path.display());
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(doc) => Ok(doc),
            _ => bail!("{} entry {} is not an object", path.display(), i),
        })
        .collect()
}

/// Load `users.json`, `bootcamps.json` and `courses.json` from `dir`.
/// Plaintext user passwords are hashed; bootcamp slugs, photos and average
/// costs are filled in the same way the API would.
pub async fn import(store: &dyn DocumentStore, dir: &Path) -> Result<SeedReport> {
    let users = read_documents(dir, "users.json")?;
    let bootcamps = read_documents(dir, "bootcamps.json")?;
    let courses = read_documents(dir, "courses.json")?;
    let mut report = SeedReport::default();

    for mut user in users {
        if let Some(Value::String(password)) = user.get("password") {
            let hashed = hash_password(password)?;
            user.insert("password".into(), Value::String(hashed));
        }
        store.insert(Collection::Users, user).await?;
        report.users += 1;
    }

    let mut bootcamp_ids = Vec::new();
    for mut bootcamp in bootcamps {
        if let Some(name) = bootcamp.get("name").and_then(Value::as_str) {
            let slug = slugify(name);
            bootcamp.entry("slug").or_insert(Value::String(slug));
        }
        bootcamp.entry("photo").or_insert(Value::String(DEFAULT_PHOTO.to_string()));
        let saved = store.insert(Collection::Bootcamps, bootcamp).await?;
        if let Some(id) = saved.get("id").and_then(Value::as_str) {
            bootcamp_ids.push(id.to_string());
        }
        report.bootcamps += 1;
    }

    for course in courses {
        store.insert(Collection::Courses, course).await?;
        report.courses += 1;
    }
    for id in &bootcamp_ids {
        refresh_average_cost(store, id).await?;
    }

    info!(
        "Data imported: {} users, {} bootcamps, {} courses",
        report.users, report.bootcamps, report.courses
    );
    Ok(report)
}

/// Remove every document from all collections
pub async fn destroy(store: &dyn DocumentStore) -> Result<u64> {
    let mut removed = 0;
    for collection in Collection::ALL {
        removed += store.delete_many(collection, &[]).await?;
    }
    info!("Data destroyed: {} documents", removed);
    Ok(removed)
}
