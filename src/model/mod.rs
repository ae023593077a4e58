// File: ./src/model/mod.rs
pub mod item;
pub mod pattern;
pub mod query;
pub mod sort;
pub mod validator;

pub use item::{Task, TaskDraft};
pub use pattern::{Compiled, CompiledPattern, MatchSpan, PatternFlags};
pub use query::{QueryCommand, SearchOutcome, SearchStats, Suggestion};
pub use sort::{SortDirection, SortKey, SortOrder};
pub use validator::{Field, FieldError, TaskValidation};
