// File: ./src/model/item.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A validated, persisted task.
///
/// Instances are only produced by the store after the raw fields passed the
/// validator (see [`crate::model::validator::validate_task`]), or loaded back
/// from disk where they were written under the same rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default = "default_id")]
    pub id: String,
    pub title: String,
    pub due_date: NaiveDate,
    /// Minutes, at most two fractional digits.
    pub duration: f64,
    pub tag: String,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        due_date: NaiveDate,
        duration: f64,
        tag: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: default_id(),
            title: title.into(),
            due_date,
            duration,
            tag: tag.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The due date as it is matched by search: `YYYY-MM-DD`.
    pub fn due_date_string(&self) -> String {
        self.due_date.format(DATE_FORMAT).to_string()
    }

    /// Fields the free-pattern search looks at, in display order.
    pub fn searchable_fields(&self) -> [String; 3] {
        [self.title.clone(), self.tag.clone(), self.due_date_string()]
    }
}

/// Raw field strings as typed by the user, before validation.
///
/// `None` and `Some("")` are both reported as `Required`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: Option<String>,
    pub due_date: Option<String>,
    pub duration: Option<String>,
    pub tag: Option<String>,
}

impl TaskDraft {
    pub fn new(title: &str, due_date: &str, duration: &str, tag: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            due_date: Some(due_date.to_string()),
            duration: Some(duration.to_string()),
            tag: Some(tag.to_string()),
        }
    }

    /// Converts an existing task back into editable strings.
    ///
    /// The duration keeps every stored digit (shortest round-trip form), so
    /// re-validating the draft checks the value actually stored.
    pub fn from_task(task: &Task) -> Self {
        Self::new(
            &task.title,
            &task.due_date_string(),
            &task.duration.to_string(),
            &task.tag,
        )
    }

    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn due_date_str(&self) -> &str {
        self.due_date.as_deref().unwrap_or("")
    }

    pub fn duration_str(&self) -> &str {
        self.duration.as_deref().unwrap_or("")
    }

    pub fn tag_str(&self) -> &str {
        self.tag.as_deref().unwrap_or("")
    }

    /// Typed field values. Only meaningful once `validate_task` accepted the
    /// draft; returns `None` if any field still fails to parse.
    pub fn parsed_fields(&self) -> Option<(String, NaiveDate, f64, String)> {
        let title = self.title_str().trim().to_string();
        let due = NaiveDate::parse_from_str(self.due_date_str().trim(), DATE_FORMAT).ok()?;
        let duration = self.duration_str().trim().parse::<f64>().ok()?;
        let tag = self.tag_str().trim().to_string();
        Some((title, due, duration, tag))
    }
}

/// Renders a duration without a trailing `.0`: `90` or `1.5`.
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.2}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
