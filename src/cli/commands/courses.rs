//! Courses command implementation.

use crate::config::Settings;
use crate::store::{DocumentStore, SqliteStore};
use anyhow::Result;

/// Run the courses command: list course collections as one JSON object.
pub async fn run_courses(db: Option<String>, mut settings: Settings) -> Result<()> {
    if let Some(db) = db {
        settings.store.db_path = db;
    }

    let store = SqliteStore::new(&settings.db_path())?;
    let courses = store.list_courses().await?;

    println!("{}", serde_json::to_string(&serde_json::json!({ "courses": courses }))?);
    Ok(())
}
