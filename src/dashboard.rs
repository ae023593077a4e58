// Aggregate figures shown on the dashboard: counts, workload and the weekly cap.
use crate::config::{DurationUnit, Settings};
use crate::model::Task;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

pub const TREND_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CapStatus {
    Under { remaining: f64 },
    Reached,
    Exceeded { over: f64 },
}

impl CapStatus {
    pub fn from_usage(used: f64, cap: f64) -> Self {
        if used < cap {
            CapStatus::Under {
                remaining: cap - used,
            }
        } else if used == cap {
            CapStatus::Reached
        } else {
            CapStatus::Exceeded { over: used - cap }
        }
    }

    pub fn describe(&self, unit: DurationUnit) -> String {
        match self {
            CapStatus::Under { remaining } => format!("{} left this week", unit.format(*remaining)),
            CapStatus::Reached => "Weekly cap reached".to_string(),
            CapStatus::Exceeded { over } => {
                format!("Weekly cap exceeded by {}", unit.format(*over))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_tasks: usize,
    pub total_minutes: f64,
    pub top_tag: Option<String>,
    /// Tasks due on each of the last seven days, oldest first, ending today.
    pub trend: Vec<(NaiveDate, usize)>,
    /// Minutes due within today's ISO week.
    pub week_minutes: f64,
    pub cap: CapStatus,
}

fn most_frequent_tag(tasks: &[Task]) -> Option<String> {
    // Vec keeps first-seen order so ties resolve deterministically.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for task in tasks {
        match counts.iter_mut().find(|(tag, _)| *tag == task.tag) {
            Some((_, n)) => *n += 1,
            None => counts.push((task.tag.as_str(), 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (tag, n) in counts {
        if best.is_none_or(|(_, m)| n > m) {
            best = Some((tag, n));
        }
    }
    best.map(|(tag, _)| tag.to_string())
}

fn same_iso_week(a: NaiveDate, b: NaiveDate) -> bool {
    a.iso_week() == b.iso_week()
}

impl Dashboard {
    pub fn compute(tasks: &[Task], settings: &Settings, today: NaiveDate) -> Self {
        let total_minutes = tasks.iter().map(|t| t.duration).sum();

        let trend = (0..TREND_DAYS)
            .rev()
            .map(|back| {
                let day = today - Duration::days(back);
                let count = tasks.iter().filter(|t| t.due_date == day).count();
                (day, count)
            })
            .collect();

        let week_minutes: f64 = tasks
            .iter()
            .filter(|t| same_iso_week(t.due_date, today))
            .map(|t| t.duration)
            .sum();

        Self {
            total_tasks: tasks.len(),
            total_minutes,
            top_tag: most_frequent_tag(tasks),
            trend,
            week_minutes,
            cap: CapStatus::from_usage(week_minutes, settings.weekly_cap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(day: u32, duration: f64, tag: &str) -> Task {
        Task::new(
            "Task",
            NaiveDate::from_ymd_opt(2025, 9, day).unwrap(),
            duration,
            tag,
            Utc::now(),
        )
    }

    // 2025-09-29 is a Monday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 30).unwrap()
    }

    #[test]
    fn test_empty_collection() {
        let dash = Dashboard::compute(&[], &Settings::default(), today());
        assert_eq!(dash.total_tasks, 0);
        assert_eq!(dash.top_tag, None);
        assert_eq!(dash.trend.len(), 7);
        assert!(dash.trend.iter().all(|(_, n)| *n == 0));
        assert_eq!(dash.cap, CapStatus::Under { remaining: 600.0 });
    }

    #[test]
    fn test_totals_and_top_tag() {
        let tasks = vec![
            task(24, 30.0, "Health"),
            task(29, 60.0, "Academic"),
            task(30, 90.0, "Academic"),
            task(28, 15.0, "Health"),
            task(28, 15.0, "Personal"),
        ];
        let dash = Dashboard::compute(&tasks, &Settings::default(), today());
        assert_eq!(dash.total_tasks, 5);
        assert_eq!(dash.total_minutes, 210.0);
        // Health and Academic tie at two; Health was seen first.
        assert_eq!(dash.top_tag.as_deref(), Some("Health"));

        assert_eq!(dash.trend.first().unwrap().0, NaiveDate::from_ymd_opt(2025, 9, 24).unwrap());
        assert_eq!(dash.trend.last().unwrap(), &(today(), 1));
        assert_eq!(dash.trend[4].1, 2); // the 28th

        // Only the 29th and 30th fall in the week of Monday the 29th.
        assert_eq!(dash.week_minutes, 150.0);
    }

    #[test]
    fn test_cap_states() {
        let settings = Settings {
            weekly_cap: 120.0,
            ..Settings::default()
        };
        let reached = Dashboard::compute(&[task(29, 120.0, "Work")], &settings, today());
        assert_eq!(reached.cap, CapStatus::Reached);

        let over = Dashboard::compute(
            &[task(29, 100.0, "Work"), task(30, 50.0, "Work")],
            &settings,
            today(),
        );
        assert_eq!(over.cap, CapStatus::Exceeded { over: 30.0 });
        assert_eq!(
            over.cap.describe(DurationUnit::Hours),
            "Weekly cap exceeded by 0.5 h"
        );
        assert_eq!(
            CapStatus::Under { remaining: 45.0 }.describe(DurationUnit::Minutes),
            "45 min left this week"
        );
    }
}
