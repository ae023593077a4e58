// JSON export and import of the whole planner state.
//
// A bundle is `{ "tasks": [...], "tags": [...], "settings": {...} }`.
// Import runs a structural shape check on the untyped document first, so a
// hand-edited or foreign file is rejected with a precise message instead of a
// serde error pointing at a byte offset.
use crate::config::Settings;
use crate::model::Task;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const REQUIRED_TASK_STRINGS: [&str; 4] = ["id", "title", "dueDate", "tag"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub tasks: Vec<Task>,
    pub tags: Vec<String>,
    pub settings: Settings,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("Import file is not valid JSON: {0}")]
    Syntax(String),
    #[error("Import data must be a JSON object")]
    NotAnObject,
    #[error("Import data must contain a \"{0}\" array")]
    MissingArray(&'static str),
    #[error("Import data must contain a \"settings\" object")]
    MissingSettings,
    #[error("Task #{index} must be an object")]
    TaskNotAnObject { index: usize },
    #[error("Task #{index} is missing \"{field}\"")]
    TaskMissingField { index: usize, field: &'static str },
    #[error("Import data has an invalid shape: {0}")]
    Shape(String),
}

pub fn export_bundle(bundle: &Bundle) -> serde_json::Result<String> {
    serde_json::to_string_pretty(bundle)
}

fn require_array<'a>(
    root: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a Vec<Value>, ImportError> {
    root.get(key)
        .and_then(Value::as_array)
        .ok_or(ImportError::MissingArray(key))
}

fn check_task(index: usize, value: &Value) -> Result<(), ImportError> {
    let obj = value
        .as_object()
        .ok_or(ImportError::TaskNotAnObject { index })?;

    for field in REQUIRED_TASK_STRINGS {
        let present = obj
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !present {
            return Err(ImportError::TaskMissingField { index, field });
        }
    }
    if !obj.contains_key("duration") {
        return Err(ImportError::TaskMissingField {
            index,
            field: "duration",
        });
    }
    Ok(())
}

/// Shape-checks and decodes an import payload.
///
/// Field-level rules are not applied here; the store re-validates every
/// imported task before accepting it.
pub fn import_bundle(json: &str) -> Result<Bundle, ImportError> {
    let value: Value = serde_json::from_str(json).map_err(|e| ImportError::Syntax(e.to_string()))?;
    let root = value.as_object().ok_or(ImportError::NotAnObject)?;

    let tasks = require_array(root, "tasks")?;
    require_array(root, "tags")?;
    if !root.get("settings").is_some_and(Value::is_object) {
        return Err(ImportError::MissingSettings);
    }
    for (index, task) in tasks.iter().enumerate() {
        check_task(index, task)?;
    }

    let mut bundle: Bundle =
        serde_json::from_value(value).map_err(|e| ImportError::Shape(e.to_string()))?;
    bundle.settings = bundle.settings.sanitized();
    log::info!(
        "Decoded import bundle with {} tasks and {} tags",
        bundle.tasks.len(),
        bundle.tags.len()
    );
    Ok(bundle)
}
