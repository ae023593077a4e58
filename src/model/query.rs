// Search query interpretation and task filtering.
//
// A query string is classified into exactly one `QueryCommand`:
//
//   @tag:Academic      -> Tag("Academic")       (whole string, case-insensitive prefix)
//   @date:2025-09-29   -> Date("2025-09-29")    (whole string)
//   anything else      -> Pattern(raw)          (compiled as a regex)
//
// Command detection always runs first. A string that only resembles a command
// (trailing characters, extra spaces) falls through to the regex path.

use crate::model::item::{DATE_FORMAT, Task};
use crate::model::pattern::{self, Compiled, CompiledPattern, PatternFlags};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static TAG_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^@tag:(\w+)$").unwrap());
static DATE_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@date:([0-9]{4}-[0-9]{2}-[0-9]{2})$").unwrap());

/// Suggested pattern: titles without any digit.
pub const NO_DIGITS_PATTERN: &str = "^[^0-9]*$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCommand {
    Tag(String),
    Date(String),
    Pattern(String),
}

impl QueryCommand {
    pub fn value(&self) -> &str {
        match self {
            QueryCommand::Tag(v) | QueryCommand::Date(v) | QueryCommand::Pattern(v) => v,
        }
    }

    pub fn is_structured(&self) -> bool {
        !matches!(self, QueryCommand::Pattern(_))
    }
}

/// `None` means "no filtering". Blank input (only whitespace) counts as none.
pub fn parse_query(raw: &str) -> Option<QueryCommand> {
    if raw.trim().is_empty() {
        return None;
    }

    if let Some(caps) = TAG_COMMAND.captures(raw) {
        return Some(QueryCommand::Tag(caps[1].to_string()));
    }
    if let Some(caps) = DATE_COMMAND.captures(raw) {
        return Some(QueryCommand::Date(caps[1].to_string()));
    }
    Some(QueryCommand::Pattern(raw.to_string()))
}

/// Filters by a structured command. `Pattern` is not a structured command and
/// leaves the collection untouched.
pub fn apply_command(tasks: &[Task], command: &QueryCommand) -> Vec<Task> {
    match command {
        QueryCommand::Tag(tag) => tasks.iter().filter(|t| &t.tag == tag).cloned().collect(),
        QueryCommand::Date(date) => tasks
            .iter()
            .filter(|t| &t.due_date_string() == date)
            .cloned()
            .collect(),
        QueryCommand::Pattern(_) => tasks.to_vec(),
    }
}

/// Result of one search run.
///
/// `pattern` is set when a free pattern compiled, so the caller can highlight
/// fields with it. `error` carries the compiler message when it did not.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub tasks: Vec<Task>,
    pub pattern: Option<CompiledPattern>,
    pub error: Option<String>,
}

pub fn task_matches(task: &Task, pattern: &CompiledPattern) -> bool {
    task.searchable_fields()
        .iter()
        .any(|field| pattern.is_match(field))
}

pub fn perform_search(tasks: &[Task], query: &str, case_sensitive: bool) -> SearchOutcome {
    let Some(command) = parse_query(query) else {
        return SearchOutcome {
            tasks: tasks.to_vec(),
            ..SearchOutcome::default()
        };
    };

    if command.is_structured() {
        let filtered = apply_command(tasks, &command);
        log::debug!(
            "Search {:?} kept {} of {} tasks",
            command,
            filtered.len(),
            tasks.len()
        );
        return SearchOutcome {
            tasks: filtered,
            ..SearchOutcome::default()
        };
    }

    match pattern::compile(command.value(), PatternFlags::for_search(case_sensitive)) {
        Compiled::Ready(pattern) => {
            let filtered: Vec<Task> = tasks
                .iter()
                .filter(|t| task_matches(t, &pattern))
                .cloned()
                .collect();
            SearchOutcome {
                tasks: filtered,
                pattern: Some(pattern),
                error: None,
            }
        }
        Compiled::Invalid(msg) => SearchOutcome {
            tasks: Vec::new(),
            pattern: None,
            error: Some(msg),
        },
        // Unreachable for non-blank input, kept total.
        Compiled::Empty => SearchOutcome {
            tasks: tasks.to_vec(),
            ..SearchOutcome::default()
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub label: String,
    pub query: String,
}

/// Autocomplete entries: one `@tag:` per distinct tag (first appearance
/// order), then the static helpers.
pub fn get_suggestions(tasks: &[Task], today: NaiveDate) -> Vec<Suggestion> {
    let mut seen: Vec<&str> = Vec::new();
    for task in tasks {
        if !seen.contains(&task.tag.as_str()) {
            seen.push(&task.tag);
        }
    }

    // Tags with a space or hyphen do not fit `@tag:\w+`, so their suggestion
    // runs as a pattern search over all fields instead of an exact tag filter.
    let mut suggestions: Vec<Suggestion> = seen
        .into_iter()
        .map(|tag| Suggestion {
            label: format!("Tasks tagged {}", tag),
            query: format!("@tag:{}", tag),
        })
        .collect();

    suggestions.push(Suggestion {
        label: "Titles without digits".to_string(),
        query: NO_DIGITS_PATTERN.to_string(),
    });
    suggestions.push(Suggestion {
        label: "Due today".to_string(),
        query: today.format(DATE_FORMAT).to_string(),
    });
    suggestions
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub total: usize,
    pub results: usize,
    pub percentage: u32,
}

pub fn get_search_stats<A, B>(all: &[A], results: &[B]) -> SearchStats {
    let total = all.len();
    let found = results.len();
    let percentage = if total == 0 {
        0
    } else {
        ((found as f64 / total as f64) * 100.0).round() as u32
    };
    SearchStats {
        total,
        results: found,
        percentage,
    }
}
