// Task list ordering.
use crate::model::item::Task;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
pub enum SortKey {
    #[default]
    DueDate,
    Title,
    Duration,
    Tag,
    CreatedAt,
}

impl SortKey {
    fn slug(&self) -> &'static str {
        match self {
            SortKey::DueDate => "date",
            SortKey::Title => "title",
            SortKey::Duration => "duration",
            SortKey::Tag => "tag",
            SortKey::CreatedAt => "created",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ord = match self.key {
            SortKey::DueDate => a.due_date.cmp(&b.due_date),
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Duration => a.duration.total_cmp(&b.duration),
            SortKey::Tag => a.tag.to_lowercase().cmp(&b.tag.to_lowercase()),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    /// All accepted spellings, for help output.
    pub fn variants() -> Vec<String> {
        SortKey::iter()
            .flat_map(|k| [format!("{}-asc", k.slug()), format!("{}-desc", k.slug())])
            .collect()
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{}-{}", self.key.slug(), dir)
    }
}

impl FromStr for SortOrder {
    type Err = String;

    /// `date`, `date-asc`, `title-desc`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (key_str, dir_str) = lower.split_once('-').unwrap_or((lower.as_str(), "asc"));

        let key = SortKey::iter()
            .find(|k| k.slug() == key_str)
            .ok_or_else(|| format!("Unknown sort key '{}'", key_str))?;
        let direction = match dir_str {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            other => return Err(format!("Unknown sort direction '{}'", other)),
        };
        Ok(Self { key, direction })
    }
}

/// Stable: ties keep their input order.
pub fn sort_tasks(tasks: &mut [Task], order: SortOrder) {
    tasks.sort_by(|a, b| order.compare(a, b));
}
