// Field-level admission rules for task input.
//
// Every rule is a pure function over the raw string the user typed. Checks run
// in a fixed order per field and stop at the first failure, so a field reports
// exactly one problem at a time:
//
//   Required -> Empty -> TooLong -> Malformed -> (field specific)
//
// Shape checks run against the raw string, not the trimmed one: an accepted
// value never carries surrounding whitespace.

use crate::model::item::{DATE_FORMAT, TaskDraft};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub const TITLE_MAX_CHARS: usize = 100;
pub const TAG_MAX_CHARS: usize = 50;
pub const DURATION_MAX: f64 = 10_000.0;

/// Starts and ends on a non-space character, anything in between.
static TITLE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S(?:.*\S)?$").unwrap());
static REPEATED_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());
/// Unsigned, no leading zero except a bare 0, at most two decimals.
static DURATION_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:0|[1-9][0-9]*)(?:\.[0-9]{1,2})?$").unwrap());
/// Day range is month-agnostic on purpose; calendar validity is checked separately.
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])$").unwrap()
});
static TAG_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+(?:[ -][A-Za-z]+)*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Duration,
    DueDate,
    Tag,
}

impl Field {
    /// Key used in aggregated error maps and in the persisted JSON.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Duration => "duration",
            Field::DueDate => "dueDate",
            Field::Tag => "tag",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Title => write!(f, "Title"),
            Field::Duration => write!(f, "Duration"),
            Field::DueDate => write!(f, "Due date"),
            Field::Tag => write!(f, "Tag"),
        }
    }
}

fn malformed_hint(field: &Field) -> &'static str {
    match field {
        Field::Title => "Title cannot start or end with spaces, contain repeated spaces, or contain tabs or other control characters",
        Field::Duration => "Duration must be a number with at most 2 decimal places",
        Field::DueDate => "Due date must use the YYYY-MM-DD format",
        Field::Tag => "Tag can only contain letters, single spaces, or hyphens",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} is required")]
    Required(Field),
    #[error("{0} cannot be blank")]
    Empty(Field),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: Field, max: usize },
    #[error("{}", malformed_hint(.0))]
    Malformed(Field),
    #[error("{0} must be between 0 and 10000")]
    OutOfRange(Field),
    #[error("{field} repeats the word \"{word}\"")]
    DuplicateWord { field: Field, word: String },
    #[error("{0} is not a real calendar date")]
    NotACalendarDate(Field),
}

impl FieldError {
    pub fn field(&self) -> Field {
        match self {
            FieldError::Required(f)
            | FieldError::Empty(f)
            | FieldError::Malformed(f)
            | FieldError::OutOfRange(f)
            | FieldError::NotACalendarDate(f) => *f,
            FieldError::TooLong { field, .. } | FieldError::DuplicateWord { field, .. } => *field,
        }
    }
}

pub type FieldResult = Result<(), FieldError>;

/// Shared prefix of every field rule. Returns the trimmed value.
fn require(field: Field, raw: &str) -> Result<&str, FieldError> {
    if raw.is_empty() {
        return Err(FieldError::Required(field));
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Empty(field));
    }
    Ok(trimmed)
}

fn check_length(field: Field, trimmed: &str, max: usize) -> FieldResult {
    if trimmed.chars().count() > max {
        return Err(FieldError::TooLong { field, max });
    }
    Ok(())
}

/// Finds two identical words (case-insensitive) separated only by whitespace.
fn find_adjacent_duplicate(text: &str) -> Option<&str> {
    let words: Vec<_> = WORD.find_iter(text).collect();
    words.windows(2).find_map(|pair| {
        let gap = &text[pair[0].end()..pair[1].start()];
        let only_space = !gap.is_empty() && gap.chars().all(char::is_whitespace);
        if only_space && pair[0].as_str().to_lowercase() == pair[1].as_str().to_lowercase() {
            Some(pair[0].as_str())
        } else {
            None
        }
    })
}

pub fn validate_title(raw: &str) -> FieldResult {
    let trimmed = require(Field::Title, raw)?;
    check_length(Field::Title, trimmed, TITLE_MAX_CHARS)?;

    if !TITLE_SHAPE.is_match(raw)
        || REPEATED_SPACE.is_match(raw)
        || raw.chars().any(char::is_control)
    {
        return Err(FieldError::Malformed(Field::Title));
    }

    if let Some(word) = find_adjacent_duplicate(raw) {
        return Err(FieldError::DuplicateWord {
            field: Field::Title,
            word: word.to_string(),
        });
    }
    Ok(())
}

pub fn validate_duration(raw: &str) -> FieldResult {
    require(Field::Duration, raw)?;

    if !DURATION_SHAPE.is_match(raw) {
        return Err(FieldError::Malformed(Field::Duration));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| FieldError::Malformed(Field::Duration))?;
    // The shape already excludes negatives.
    if !(0.0..=DURATION_MAX).contains(&value) {
        return Err(FieldError::OutOfRange(Field::Duration));
    }
    Ok(())
}

/// First date layer only: the `YYYY-MM-DD` shape with month 01-12 and day 01-31.
///
/// `2025-02-30` passes here; [`validate_date`] rejects it in the second layer.
pub fn date_pattern_matches(raw: &str) -> bool {
    DATE_SHAPE.is_match(raw)
}

/// Second date layer only: does the string construct a real calendar date?
pub fn is_calendar_date(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).is_ok()
}

pub fn validate_date(raw: &str) -> FieldResult {
    require(Field::DueDate, raw)?;

    if !date_pattern_matches(raw) {
        return Err(FieldError::Malformed(Field::DueDate));
    }
    if !is_calendar_date(raw) {
        return Err(FieldError::NotACalendarDate(Field::DueDate));
    }
    Ok(())
}

pub fn validate_tag(raw: &str) -> FieldResult {
    let trimmed = require(Field::Tag, raw)?;
    check_length(Field::Tag, trimmed, TAG_MAX_CHARS)?;

    if !TAG_SHAPE.is_match(raw) {
        return Err(FieldError::Malformed(Field::Tag));
    }
    Ok(())
}

/// Aggregated outcome for a whole draft. Only failing fields are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskValidation {
    pub errors: BTreeMap<Field, FieldError>,
}

impl TaskValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_for(&self, field: Field) -> Option<&FieldError> {
        self.errors.get(&field)
    }

    /// Messages keyed by the field's JSON key, ready for display.
    pub fn messages(&self) -> BTreeMap<&'static str, String> {
        self.errors
            .iter()
            .map(|(field, err)| (field.key(), err.to_string()))
            .collect()
    }
}

impl fmt::Display for TaskValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.errors.values().map(|e| e.to_string()).collect();
        write!(f, "{}", joined.join("; "))
    }
}

impl std::error::Error for TaskValidation {}

pub fn validate_task(draft: &TaskDraft) -> TaskValidation {
    let checks = [
        (Field::Title, validate_title(draft.title_str())),
        (Field::Duration, validate_duration(draft.duration_str())),
        (Field::DueDate, validate_date(draft.due_date_str())),
        (Field::Tag, validate_tag(draft.tag_str())),
    ];

    let errors = checks
        .into_iter()
        .filter_map(|(field, result)| result.err().map(|e| (field, e)))
        .collect();

    TaskValidation { errors }
}
