use crate::domain::models::{AppSettings, Task};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{KeyValueStore, DAILY_QUOTE_KEY, SETTINGS_KEY, TASKS_KEY};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub file_name: String,
    pub contents: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub tasks_imported: Option<usize>,
    pub settings_imported: bool,
}

/// Both blobs plus an export timestamp, pretty-printed.
pub fn export_backup(store: &dyn KeyValueStore, now: DateTime<Utc>) -> Result<BackupFile, InfraError> {
    let tasks = read_blob(store, TASKS_KEY, serde_json::json!([]))?;
    let settings = read_blob(store, SETTINGS_KEY, serde_json::json!({}))?;
    let payload = serde_json::json!({
        "tasks": tasks,
        "settings": settings,
        "exportDate": now.to_rfc3339_opts(SecondsFormat::Millis, true),
    });

    Ok(BackupFile {
        file_name: format!("study-planner-backup-{}.json", now.format("%Y-%m-%d")),
        contents: serde_json::to_string_pretty(&payload)?,
    })
}

/// Validates every present section before writing any of them. The running
/// state is not touched; callers reload to pick the data up.
pub fn import_backup(store: &dyn KeyValueStore, raw: &str) -> Result<ImportSummary, InfraError> {
    let parsed: serde_json::Value = serde_json::from_str(raw)
        .map_err(|error| InfraError::InvalidInput(format!("backup is not valid JSON: {error}")))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| InfraError::InvalidInput("backup must be a JSON object".to_string()))?;

    let tasks = match object.get("tasks") {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => Some(validate_tasks(value)?),
    };
    let settings = match object.get("settings") {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => Some(validate_settings(value)?),
    };

    let mut summary = ImportSummary::default();
    if let Some(tasks) = tasks {
        store.set(TASKS_KEY, &serde_json::to_string(&tasks)?)?;
        summary.tasks_imported = Some(tasks.len());
    }
    if let Some(settings) = settings {
        store.set(SETTINGS_KEY, &serde_json::to_string(&settings)?)?;
        summary.settings_imported = true;
    }
    Ok(summary)
}

pub fn clear_all_data(store: &dyn KeyValueStore) -> Result<(), InfraError> {
    for key in [TASKS_KEY, SETTINGS_KEY, DAILY_QUOTE_KEY] {
        store.remove(key)?;
    }
    Ok(())
}

fn read_blob(
    store: &dyn KeyValueStore,
    key: &str,
    fallback: serde_json::Value,
) -> Result<serde_json::Value, InfraError> {
    match store.get(key)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(fallback),
    }
}

fn validate_tasks(value: &serde_json::Value) -> Result<Vec<Task>, InfraError> {
    let items = value
        .as_array()
        .ok_or_else(|| InfraError::InvalidInput("backup.tasks must be an array".to_string()))?;

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let task = Task::deserialize(item)
            .map_err(|error| InfraError::InvalidInput(format!("backup.tasks[{index}]: {error}")))?;
        task.validate()
            .map_err(|error| InfraError::InvalidInput(format!("backup.tasks[{index}]: {error}")))?;
        if !seen.insert(task.id) {
            return Err(InfraError::InvalidInput(format!(
                "backup.tasks[{index}]: duplicate id {}",
                task.id
            )));
        }
        tasks.push(task);
    }
    Ok(tasks)
}

fn validate_settings(value: &serde_json::Value) -> Result<AppSettings, InfraError> {
    if !value.is_object() {
        return Err(InfraError::InvalidInput(
            "backup.settings must be an object".to_string(),
        ));
    }
    let settings = AppSettings::deserialize(value)
        .map_err(|error| InfraError::InvalidInput(format!("backup.settings: {error}")))?;
    settings
        .validate()
        .map_err(|error| InfraError::InvalidInput(format!("backup.settings: {error}")))?;
    Ok(settings)
}
