// File: src/store.rs
// In-memory task collection with validated mutations.
use crate::bundle::Bundle;
use crate::config::Settings;
use crate::context::AppContext;
use crate::model::query::{self, SearchOutcome};
use crate::model::sort::{self, SortOrder};
use crate::model::validator::{self, TaskValidation};
use crate::model::{Task, TaskDraft};
use crate::storage::LocalStorage;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

pub const DEFAULT_TAGS: [&str; 5] = ["Academic", "Personal", "Work", "Social", "Health"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(TaskValidation),
    #[error("No task with id {0}")]
    NotFound(String),
    #[error("Tag \"{0}\" already exists")]
    DuplicateTag(String),
    #[error(transparent)]
    InvalidTag(#[from] validator::FieldError),
}

impl From<TaskValidation> for StoreError {
    fn from(v: TaskValidation) -> Self {
        StoreError::Validation(v)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
    tags: Vec<String>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let tasks = LocalStorage::load_tasks(ctx)?;
        let mut store = Self {
            tasks,
            ..Self::default()
        };
        if let Some(tags) = LocalStorage::load_tags(ctx)? {
            store.tags = tags;
        }
        Ok(store)
    }

    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        LocalStorage::save_tasks(ctx, &self.tasks)?;
        LocalStorage::save_tags(ctx, &self.tags)?;
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn checked_fields(
        draft: &TaskDraft,
    ) -> Result<(String, chrono::NaiveDate, f64, String), TaskValidation> {
        let validation = validator::validate_task(draft);
        if !validation.is_valid() {
            return Err(validation);
        }
        // A draft that passed the validator always parses.
        draft.parsed_fields().ok_or(validation)
    }

    /// Validates the draft and appends a new task.
    pub fn add(&mut self, draft: &TaskDraft, now: DateTime<Utc>) -> Result<Task, TaskValidation> {
        let (title, due, duration, tag) = Self::checked_fields(draft)?;
        let task = Task::new(title, due, duration, tag, now);
        log::debug!("Added task {} ({})", task.id, task.title);
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Replaces the editable fields of an existing task, keeping its id,
    /// creation time and position.
    pub fn update(
        &mut self,
        id: &str,
        draft: &TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<Task, StoreError> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let (title, due, duration, tag) = Self::checked_fields(draft)?;

        let task = &mut self.tasks[idx];
        task.title = title;
        task.due_date = due;
        task.duration = duration;
        task.tag = tag;
        task.updated_at = now;
        log::debug!("Updated task {}", id);
        Ok(task.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<Task, StoreError> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(self.tasks.remove(idx))
    }

    pub fn search(&self, query: &str, case_sensitive: bool) -> SearchOutcome {
        query::perform_search(&self.tasks, query, case_sensitive)
    }

    /// A sorted copy; the stored order is untouched.
    pub fn sorted(&self, order: SortOrder) -> Vec<Task> {
        let mut out = self.tasks.clone();
        sort::sort_tasks(&mut out, order);
        out
    }

    // --- Tag registry ---

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn add_tag(&mut self, raw: &str) -> Result<(), StoreError> {
        validator::validate_tag(raw)?;
        if self.tags.iter().any(|t| t == raw) {
            return Err(StoreError::DuplicateTag(raw.to_string()));
        }
        self.tags.push(raw.to_string());
        Ok(())
    }

    /// Returns whether the tag was present. Tasks keep their tag.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    // --- Import / export ---

    pub fn to_bundle(&self, settings: &Settings) -> Bundle {
        Bundle {
            tasks: self.tasks.clone(),
            tags: self.tags.clone(),
            settings: settings.clone(),
        }
    }

    /// Replaces the collection with the bundle's tasks, keeping only those
    /// that pass the field validator. A repeated id keeps its first task.
    /// Tags are merged.
    pub fn import(&mut self, bundle: Bundle) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let mut accepted: Vec<Task> = Vec::with_capacity(bundle.tasks.len());
        let mut seen_ids = HashSet::new();

        for task in bundle.tasks {
            let validation = validator::validate_task(&TaskDraft::from_task(&task));
            if !validation.is_valid() {
                log::warn!("Skipping imported task {}: {}", task.id, validation);
                summary.skipped += 1;
            } else if !seen_ids.insert(task.id.clone()) {
                log::warn!("Skipping imported task {}: duplicate id", task.id);
                summary.skipped += 1;
            } else {
                accepted.push(task);
                summary.imported += 1;
            }
        }
        self.tasks = accepted;

        for tag in bundle.tags {
            if validator::validate_tag(&tag).is_ok() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        summary
    }
}
