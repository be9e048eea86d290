use crate::domain::models::{Task, TaskDraft, TaskPatch, DEFAULT_CATEGORY};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{KeyValueStore, TASKS_KEY};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Ordered task collection mirrored to the key-value store after every mutation.
pub struct TaskStore {
    store: Arc<dyn KeyValueStore>,
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Reads the persisted collection. A missing or unreadable blob starts empty.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, InfraError> {
        let tasks = read_tasks(store.as_ref())?;
        Ok(Self { store, tasks })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, task_id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn reload(&mut self) -> Result<(), InfraError> {
        self.tasks = read_tasks(self.store.as_ref())?;
        Ok(())
    }

    pub fn add(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<Task, InfraError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(InfraError::InvalidInput("title must not be empty".to_string()));
        }

        let task = Task {
            id: self.next_id(now)?,
            title: title.to_string(),
            description: normalize_text(draft.description.as_deref()),
            priority: draft.priority,
            category: normalize_text(draft.category.as_deref())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            due_date: draft.due_date,
            estimated_time: draft.estimated_time,
            completed: false,
            created_at: now,
        };

        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.commit(next)?;
        Ok(task)
    }

    pub fn toggle_complete(&mut self, task_id: i64) -> Result<Task, InfraError> {
        self.update_in_place(task_id, |task| task.completed = !task.completed)
    }

    pub fn edit(&mut self, task_id: i64, patch: TaskPatch) -> Result<Task, InfraError> {
        if let Some(title) = patch.title.as_deref() {
            if title.trim().is_empty() {
                return Err(InfraError::InvalidInput("title must not be empty".to_string()));
            }
        }

        self.update_in_place(task_id, |task| {
            if let Some(title) = patch.title {
                task.title = title.trim().to_string();
            }
            if let Some(description) = patch.description {
                task.description = normalize_text(description.as_deref());
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(category) = patch.category {
                task.category = normalize_text(Some(&category))
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            }
            if let Some(due_date) = patch.due_date {
                task.due_date = due_date;
            }
            if let Some(estimated_time) = patch.estimated_time {
                task.estimated_time = estimated_time;
            }
        })
    }

    pub fn delete(&mut self, task_id: i64) -> Result<bool, InfraError> {
        if self.get(task_id).is_none() {
            return Ok(false);
        }
        let next = self
            .tasks
            .iter()
            .filter(|task| task.id != task_id)
            .cloned()
            .collect();
        self.commit(next)?;
        Ok(true)
    }

    // Creation time in milliseconds, bumped past the newest id on collision.
    fn next_id(&self, now: DateTime<Utc>) -> Result<i64, InfraError> {
        let candidate = now.timestamp_millis().max(1);
        let newest = self.tasks.iter().map(|task| task.id).max().unwrap_or(0);
        if candidate > newest {
            return Ok(candidate);
        }
        newest
            .checked_add(1)
            .ok_or_else(|| InfraError::InvalidInput(format!("no task id left after {newest}")))
    }

    fn update_in_place<F>(&mut self, task_id: i64, apply: F) -> Result<Task, InfraError>
    where
        F: FnOnce(&mut Task),
    {
        let mut next = self.tasks.clone();
        let task = next
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| InfraError::NotFound(format!("task not found: {task_id}")))?;
        apply(task);
        let updated = task.clone();
        self.commit(next)?;
        Ok(updated)
    }

    // Memory only changes once the store accepted the new collection.
    fn commit(&mut self, next: Vec<Task>) -> Result<(), InfraError> {
        let payload = serde_json::to_string(&next)?;
        self.store.set(TASKS_KEY, &payload)?;
        self.tasks = next;
        Ok(())
    }
}

fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn read_tasks(store: &dyn KeyValueStore) -> Result<Vec<Task>, InfraError> {
    let Some(raw) = store.get(TASKS_KEY)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<Task>>(&raw) {
        Ok(tasks) => Ok(tasks),
        Err(error) => {
            tracing::warn!(key = TASKS_KEY, error = %error, "discarding unreadable task collection");
            Ok(Vec::new())
        }
    }
}
