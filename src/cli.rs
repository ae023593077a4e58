// File: ./src/cli.rs
//! Command-line front end: argument parsing, command execution and help.
use crate::bundle;
use crate::config::{DurationUnit, Settings};
use crate::context::AppContext;
use crate::dashboard::Dashboard;
use crate::model::item::{DATE_FORMAT, format_decimal};
use crate::model::pattern::{self, CompiledPattern};
use crate::model::query::{self, get_search_stats};
use crate::model::{SortOrder, Task, TaskDraft};
use crate::store::TaskStore;
use anyhow::{Context, Result};
use chrono::{Local, Utc};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use strum::IntoEnumIterator;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List { sort: SortOrder },
    Add { draft: TaskDraft },
    Edit { id: String, draft: TaskDraft },
    Delete { id: String },
    Search { query: String, case_sensitive: Option<bool> },
    Suggest,
    Stats,
    Tags,
    AddTag { tag: String },
    Export,
    Import { path: PathBuf },
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub root: Option<PathBuf>,
    pub command: Command,
}

fn draft_from(args: &[String]) -> Result<TaskDraft, String> {
    match args {
        [title, date, duration, tag] => Ok(TaskDraft::new(title, date, duration, tag)),
        _ => Err("expected <title> <date> <duration> <tag>".to_string()),
    }
}

/// Parses everything after the binary name.
pub fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut root = None;
    let mut rest: Vec<String> = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-r" | "--root" => {
                let path = iter.next().ok_or("--root needs a path")?;
                root = Some(PathBuf::from(path));
            }
            _ => rest.push(arg.clone()),
        }
    }

    let Some((name, params)) = rest.split_first() else {
        return Ok(Invocation {
            root,
            command: Command::List {
                sort: SortOrder::default(),
            },
        });
    };

    let command = match name.as_str() {
        "help" | "-h" | "--help" => Command::Help,
        "list" | "ls" => match params {
            [] => Command::List {
                sort: SortOrder::default(),
            },
            [flag, order] if flag == "--sort" => Command::List {
                sort: order.parse()?,
            },
            _ => return Err("usage: list [--sort <order>]".to_string()),
        },
        "add" => Command::Add {
            draft: draft_from(params)?,
        },
        "edit" => match params.split_first() {
            Some((id, fields)) => Command::Edit {
                id: id.clone(),
                draft: draft_from(fields)?,
            },
            None => return Err("usage: edit <id> <title> <date> <duration> <tag>".to_string()),
        },
        "delete" | "rm" => match params {
            [id] => Command::Delete { id: id.clone() },
            _ => return Err("usage: delete <id>".to_string()),
        },
        "search" => match params {
            [q] => Command::Search {
                query: q.clone(),
                case_sensitive: None,
            },
            [q, flag] if flag == "--case-sensitive" => Command::Search {
                query: q.clone(),
                case_sensitive: Some(true),
            },
            _ => return Err("usage: search <query> [--case-sensitive]".to_string()),
        },
        "suggest" => Command::Suggest,
        "stats" => Command::Stats,
        "tags" => Command::Tags,
        "add-tag" => match params {
            [tag] => Command::AddTag { tag: tag.clone() },
            _ => return Err("usage: add-tag <tag>".to_string()),
        },
        "export" => Command::Export,
        "import" => match params {
            [path] => Command::Import {
                path: PathBuf::from(path),
            },
            _ => return Err("usage: import <file.json>".to_string()),
        },
        other => return Err(format!("unknown command '{}'", other)),
    };

    Ok(Invocation { root, command })
}

/// Wraps matches in `[` `]` for terminal output.
pub fn mark_matches(text: &str, pattern: Option<&CompiledPattern>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in pattern::find_matches(text, pattern) {
        if span.length == 0 {
            continue;
        }
        out.push_str(&text[cursor..span.index]);
        out.push('[');
        out.push_str(&span.text);
        out.push(']');
        cursor = span.index + span.length;
    }
    out.push_str(&text[cursor..]);
    out
}

fn write_row(
    out: &mut dyn Write,
    task: &Task,
    unit: DurationUnit,
    pattern: Option<&CompiledPattern>,
) -> Result<()> {
    writeln!(
        out,
        "{}  {}  {:<10}  {:>10}  {}",
        task.id.chars().take(8).collect::<String>(),
        mark_matches(&task.due_date_string(), pattern),
        mark_matches(&task.tag, pattern),
        unit.format(task.duration),
        mark_matches(&task.title, pattern),
    )?;
    Ok(())
}

/// Finds a task by full id or unique id prefix.
fn resolve_id(store: &TaskStore, prefix: &str) -> Result<String> {
    let hits: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| t.id.starts_with(prefix))
        .collect();
    match hits.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => anyhow::bail!("No task matches id '{}'", prefix),
        _ => anyhow::bail!("Id prefix '{}' is ambiguous", prefix),
    }
}

pub fn execute(command: Command, ctx: &dyn AppContext, out: &mut dyn Write) -> Result<()> {
    // Help must work even when the data files are unreadable.
    if matches!(command, Command::Help) {
        return print_help(out, "planner");
    }

    let settings = Settings::load(ctx)?;
    let mut store = TaskStore::load(ctx)?;
    let unit = settings.unit;

    match command {
        Command::Help => print_help(out, "planner")?,
        Command::List { sort } => {
            for task in store.sorted(sort) {
                write_row(out, &task, unit, None)?;
            }
        }
        Command::Add { draft } => match store.add(&draft, Utc::now()) {
            Ok(task) => {
                store.save(ctx)?;
                writeln!(out, "Added {}", task.id)?;
            }
            Err(validation) => {
                for (field, message) in validation.messages() {
                    writeln!(out, "{}: {}", field, message)?;
                }
                anyhow::bail!("Task was not added");
            }
        },
        Command::Edit { id, draft } => {
            let id = resolve_id(&store, &id)?;
            let task = store.update(&id, &draft, Utc::now())?;
            store.save(ctx)?;
            writeln!(out, "Updated {}", task.id)?;
        }
        Command::Delete { id } => {
            let id = resolve_id(&store, &id)?;
            let task = store.delete(&id)?;
            store.save(ctx)?;
            writeln!(out, "Deleted {} ({})", task.id, task.title)?;
        }
        Command::Search {
            query,
            case_sensitive,
        } => {
            let case_sensitive = case_sensitive.unwrap_or(settings.case_sensitive_search);
            let outcome = store.search(&query, case_sensitive);
            if let Some(error) = &outcome.error {
                writeln!(out, "{}", error)?;
            }
            for task in &outcome.tasks {
                write_row(out, task, unit, outcome.pattern.as_ref())?;
            }
            let stats = get_search_stats(store.tasks(), &outcome.tasks);
            writeln!(
                out,
                "{} of {} tasks ({}%)",
                stats.results, stats.total, stats.percentage
            )?;
        }
        Command::Suggest => {
            let today = Local::now().date_naive();
            for s in query::get_suggestions(store.tasks(), today) {
                writeln!(out, "{:<24} {}", s.query, s.label)?;
            }
        }
        Command::Stats => {
            let today = Local::now().date_naive();
            let dash = Dashboard::compute(store.tasks(), &settings, today);
            writeln!(out, "Tasks:      {}", dash.total_tasks)?;
            writeln!(out, "Total time: {}", unit.format(dash.total_minutes))?;
            writeln!(
                out,
                "Top tag:    {}",
                dash.top_tag.as_deref().unwrap_or("-")
            )?;
            writeln!(
                out,
                "This week:  {} / {}",
                unit.format(dash.week_minutes),
                unit.format(settings.weekly_cap)
            )?;
            writeln!(out, "            {}", dash.cap.describe(unit))?;
            for (day, count) in &dash.trend {
                writeln!(out, "{}  {}", day.format(DATE_FORMAT), "#".repeat(*count))?;
            }
        }
        Command::Tags => {
            for tag in store.tags() {
                writeln!(out, "{}", tag)?;
            }
        }
        Command::AddTag { tag } => {
            store.add_tag(&tag)?;
            store.save(ctx)?;
            writeln!(out, "Added tag {}", tag)?;
        }
        Command::Export => {
            let json = bundle::export_bundle(&store.to_bundle(&settings))?;
            writeln!(out, "{}", json)?;
        }
        Command::Import { path } => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read import file {:?}", path))?;
            let imported = bundle::import_bundle(&json)?;
            let new_settings = imported.settings.clone();
            let summary = store.import(imported);
            store.save(ctx)?;
            new_settings.save(ctx)?;
            writeln!(
                out,
                "Imported {} tasks ({} skipped)",
                summary.imported, summary.skipped
            )?;
        }
    }
    Ok(())
}

pub fn print_help(out: &mut dyn Write, binary_name: &str) -> Result<()> {
    writeln!(
        out,
        "Campus Planner v{} - tasks, deadlines and workload for students",
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;
    writeln!(out, "USAGE:")?;
    writeln!(out, "    {} [--root <path>] <command>", binary_name)?;
    writeln!(out)?;
    writeln!(out, "COMMANDS:")?;
    writeln!(out, "    list [--sort <order>]                      List tasks")?;
    writeln!(out, "    add <title> <date> <duration> <tag>        Add a task")?;
    writeln!(out, "    edit <id> <title> <date> <duration> <tag>  Edit a task")?;
    writeln!(out, "    delete <id>                                Delete a task")?;
    writeln!(out, "    search <query> [--case-sensitive]          Search tasks")?;
    writeln!(out, "    suggest                                    Show search suggestions")?;
    writeln!(out, "    stats                                      Show dashboard")?;
    writeln!(out, "    tags | add-tag <tag>                       Manage tags")?;
    writeln!(out, "    export                                     Print JSON bundle")?;
    writeln!(out, "    import <file.json>                         Replace tasks from bundle")?;
    writeln!(out)?;
    writeln!(out, "SEARCH SYNTAX:")?;
    writeln!(out, "    @tag:Academic      Exact tag")?;
    writeln!(out, "    @date:2025-09-29   Exact due date")?;
    writeln!(out, "    anything else      Regular expression over title, tag and date")?;
    writeln!(out)?;
    writeln!(out, "SORT ORDERS: {}", SortOrder::variants().join(", "))?;
    let units: Vec<String> = DurationUnit::iter().map(|u| u.to_string()).collect();
    writeln!(out, "DURATION UNITS (config.toml): {}", units.join(", "))?;
    writeln!(
        out,
        "Durations are entered in minutes, e.g. {}.",
        format_decimal(22.5)
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;
    use crate::model::SortKey;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run(ctx: &TestContext, list: &[&str]) -> Result<String> {
        let inv = parse_args(&args(list)).map_err(anyhow::Error::msg)?;
        let mut out = Vec::new();
        execute(inv.command, ctx, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_parse_args() {
        let inv = parse_args(&args(&["--root", "/tmp/x", "list", "--sort", "title-desc"])).unwrap();
        assert_eq!(inv.root, Some(PathBuf::from("/tmp/x")));
        match inv.command {
            Command::List { sort } => assert_eq!(sort.key, SortKey::Title),
            other => panic!("unexpected {:?}", other),
        }

        assert!(parse_args(&args(&["add", "only", "two"])).is_err());
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(matches!(
            parse_args(&[]).unwrap().command,
            Command::List { .. }
        ));
    }

    #[test]
    fn test_mark_matches() {
        let compiled = pattern::compile("exam", pattern::PatternFlags::default());
        assert_eq!(
            mark_matches("Exam prep: exams", compiled.pattern()),
            "[Exam] prep: [exam]s"
        );
        assert_eq!(mark_matches("plain", None), "plain");
    }

    #[test]
    fn test_add_search_delete_flow() {
        let ctx = TestContext::new();
        let out = run(&ctx, &["add", "Finish lab report", "2025-09-29", "90", "Academic"]).unwrap();
        assert!(out.starts_with("Added "));
        run(&ctx, &["add", "Gym session", "2025-09-30", "45", "Health"]).unwrap();

        let found = run(&ctx, &["search", "finish|gym"]).unwrap();
        assert!(found.contains("[Finish] lab report"));
        assert!(found.contains("2 of 2 tasks (100%)"));

        let bad = run(&ctx, &["search", "(oops"]).unwrap();
        assert!(bad.contains("Invalid regular expression"));
        assert!(bad.contains("0 of 2 tasks (0%)"));

        let store = TaskStore::load(&ctx).unwrap();
        let id = store.tasks()[1].id.clone();
        run(&ctx, &["delete", &id[..8]]).unwrap();
        assert_eq!(TaskStore::load(&ctx).unwrap().tasks().len(), 1);
    }

    #[test]
    fn test_add_reports_field_errors() {
        let ctx = TestContext::new();
        let err = run(&ctx, &["add", "the the", "2025-02-30", "1.234", "Academic"]);
        assert!(err.is_err());
        assert!(TaskStore::load(&ctx).unwrap().tasks().is_empty());
    }

    #[test]
    fn test_export_import_between_roots() {
        let a = TestContext::new();
        run(&a, &["add", "Read chapter", "2025-10-01", "30", "Academic"]).unwrap();
        let json = run(&a, &["export"]).unwrap();

        let b = TestContext::new();
        let file = b.root.join("bundle.json");
        fs::write(&file, json).unwrap();
        let out = run(&b, &["import", file.to_str().unwrap()]).unwrap();
        assert!(out.contains("Imported 1 tasks (0 skipped)"));
        assert_eq!(TaskStore::load(&b).unwrap().tasks().len(), 1);
    }

    #[test]
    fn test_help_ignores_corrupt_data() {
        let ctx = TestContext::new();
        fs::write(ctx.get_tasks_path().unwrap(), "{ not json").unwrap();
        fs::write(ctx.get_config_file_path().unwrap(), "unit = [").unwrap();

        let out = run(&ctx, &["help"]).unwrap();
        assert!(out.contains("USAGE:"));
        assert!(run(&ctx, &["list"]).is_err());
    }

    #[test]
    fn test_help_mentions_search_syntax() {
        let mut out = Vec::new();
        print_help(&mut out, "planner").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("@tag:Academic"));
        assert!(text.contains("date-asc"));
    }
}
