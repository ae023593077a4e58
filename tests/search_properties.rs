// Tests for the validation and query engine's documented properties.
use campus_planner::model::item::DATE_FORMAT;
use campus_planner::model::pattern::{self, Compiled, PatternFlags};
use campus_planner::model::query::{self, QueryCommand};
use campus_planner::model::validator::{self, FieldError};
use campus_planner::model::Task;
use chrono::{NaiveDate, Utc};

fn task(title: &str, date: &str, tag: &str) -> Task {
    Task::new(
        title,
        NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
        30.0,
        tag,
        Utc::now(),
    )
}

#[test]
fn test_accepted_titles_have_clean_whitespace() {
    let candidates = [
        "Finish lab report",
        " Finish lab report",
        "Finish lab report ",
        "Finish  lab report",
        "Finish\tlab",
        "Finish\t\tlab",
        "Read read notes",
        "Read, read notes",
        "x",
        "Exam 2 prep",
    ];
    for s in candidates {
        if validator::validate_title(s).is_ok() {
            assert_eq!(s.trim(), s, "{s:?} kept surrounding whitespace");
            let chars: Vec<char> = s.chars().collect();
            assert!(
                !chars
                    .windows(2)
                    .any(|w| w[0].is_whitespace() && w[1].is_whitespace()),
                "{s:?} has consecutive whitespace"
            );
            let words: Vec<String> = s.split_whitespace().map(|w| w.to_lowercase()).collect();
            assert!(
                !words.windows(2).any(|w| w[0] == w[1]),
                "{s:?} repeats a word"
            );
        }
    }
}

#[test]
fn test_accepted_durations_are_in_range() {
    let candidates = [
        "0", "0.5", "00", "1.25", "1.255", "9999.99", "10000", "10001", "-0", "3.", "42",
    ];
    for s in candidates {
        if validator::validate_duration(s).is_ok() {
            let value: f64 = s.parse().unwrap();
            assert!((0.0..=10000.0).contains(&value), "{s} out of range");
            if let Some((_, frac)) = s.split_once('.') {
                assert!(frac.len() <= 2, "{s} has too many decimals");
            }
        }
    }
    assert_eq!(
        validator::validate_duration("10001"),
        Err(FieldError::OutOfRange(validator::Field::Duration))
    );
}

#[test]
fn test_date_layers_documented() {
    assert!(validator::validate_date("2025-09-29").is_ok());
    assert!(validator::validate_date("2025-13-01").is_err());
    assert!(!validator::date_pattern_matches("2025-13-01"));

    // Passes the pattern layer, fails the calendar layer.
    assert!(validator::date_pattern_matches("2025-02-30"));
    assert!(!validator::is_calendar_date("2025-02-30"));
    assert!(validator::validate_date("2025-02-30").is_err());
}

#[test]
fn test_compile_empty_vs_invalid() {
    let bad = pattern::compile("[", PatternFlags::default());
    assert!(bad.pattern().is_none());
    assert!(!bad.error().is_empty());

    let none = pattern::compile("", PatternFlags::default());
    assert!(matches!(none, Compiled::Empty));
    assert!(none.error().is_empty());
}

#[test]
fn test_parse_query_anchor() {
    assert_eq!(
        query::parse_query("@tag:Academic"),
        Some(QueryCommand::Tag("Academic".to_string()))
    );
    assert_eq!(
        query::parse_query("@tag:Academic "),
        Some(QueryCommand::Pattern("@tag:Academic ".to_string()))
    );
}

#[test]
fn test_search_finish_or_exam_preserves_order() {
    let tasks = vec![
        task("Prepare EXAM sheet", "2025-10-03", "Academic"),
        task("Gym", "2025-10-01", "Health"),
        task("Finish essay", "2025-09-29", "Academic"),
        task("Groceries", "2025-10-02", "Exams"),
        task("finished reading", "2025-09-28", "Personal"),
    ];
    let outcome = query::perform_search(&tasks, "finish|exam", false);
    let titles: Vec<&str> = outcome.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Prepare EXAM sheet",
            "Finish essay",
            "Groceries",
            "finished reading"
        ]
    );
}

#[test]
fn test_search_highlight_pipeline() {
    let tasks = vec![task("<b>Finish</b> & submit", "2025-09-29", "Academic")];
    let outcome = query::perform_search(&tasks, "finish", false);
    let p = outcome.pattern.as_ref();
    assert_eq!(
        pattern::highlight(&outcome.tasks[0].title, p),
        "&lt;b&gt;<mark>Finish</mark>&lt;/b&gt; &amp; submit"
    );
    let spans = pattern::find_matches(&outcome.tasks[0].title, p);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].index, 3);
    assert_eq!(spans[0].length, 6);
}

#[test]
fn test_search_stats_examples() {
    let stats = query::get_search_stats(&[1, 2, 3, 4], &[1, 2]);
    assert_eq!((stats.total, stats.results, stats.percentage), (4, 2, 50));
    let none: Vec<u8> = vec![];
    let stats = query::get_search_stats(&none, &none);
    assert_eq!((stats.total, stats.results, stats.percentage), (0, 0, 0));
}

#[test]
fn test_repeated_compilation_is_equivalent() {
    let text = "Finish exam, then finish report";
    let first = pattern::compile("finish", PatternFlags::default());
    let second = pattern::compile("finish", PatternFlags::default());
    assert_eq!(
        pattern::find_matches(text, first.pattern()),
        pattern::find_matches(text, second.pattern())
    );
    assert_eq!(pattern::find_matches(text, first.pattern()).len(), 2);
}
