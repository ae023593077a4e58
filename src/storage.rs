// Manages local file storage for tasks and the tag registry.
//
// VERSION BUMP REQUIRED:
// Changes to the Task struct serialization require incrementing
// TASKS_STORAGE_VERSION below.
use crate::context::AppContext;
use crate::model::Task;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

// Version history:
// - v0: bare JSON array of tasks
// - v1: { version, tasks } wrapper
const TASKS_STORAGE_VERSION: u32 = 1;

/// Wrapper struct for versioned task storage
#[derive(Serialize, Deserialize)]
struct TaskFile {
    #[serde(default)]
    version: u32,
    tasks: Vec<Task>,
}

/// Tracks whether the last load of each file succeeded.
/// A failed load blocks saves to that file so unreadable data is never
/// overwritten with an empty list.
static LOAD_STATE_MAP: OnceLock<Mutex<HashMap<PathBuf, LoadState>>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Uninitialized,
    Success,
    Failed,
}

impl LoadState {
    fn get(path: &Path) -> LoadState {
        let map = LOAD_STATE_MAP.get_or_init(|| Mutex::new(HashMap::new()));
        map.lock()
            .map(|m| *m.get(path).unwrap_or(&LoadState::Uninitialized))
            .unwrap_or(LoadState::Uninitialized)
    }

    fn set(path: &Path, state: LoadState) {
        let map = LOAD_STATE_MAP.get_or_init(|| Mutex::new(HashMap::new()));
        if let Ok(mut m) = map.lock() {
            m.insert(path.to_path_buf(), state);
        }
    }
}

pub struct LocalStorage;

impl LocalStorage {
    /// Helper to get a sidecar lock file path
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive advisory lock on a sidecar file.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {:?}", lock_path))?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    fn parse_tasks(json: &str) -> Result<(Vec<Task>, bool)> {
        if let Ok(data) = serde_json::from_str::<TaskFile>(json) {
            if data.version > TASKS_STORAGE_VERSION {
                anyhow::bail!(
                    "Task storage version {} is newer than supported version {}",
                    data.version,
                    TASKS_STORAGE_VERSION
                );
            }
            let needs_upgrade = data.version < TASKS_STORAGE_VERSION;
            return Ok((data.tasks, needs_upgrade));
        }

        // No wrapper: v0 bare array
        let tasks = serde_json::from_str::<Vec<Task>>(json)
            .map_err(|e| anyhow::anyhow!("Failed to parse task storage: {}", e))?;
        log::info!("Upgrading task storage from v0 to v{}", TASKS_STORAGE_VERSION);
        Ok((tasks, true))
    }

    fn write_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
        let data = TaskFile {
            version: TASKS_STORAGE_VERSION,
            tasks: tasks.to_vec(),
        };
        let json = serde_json::to_string_pretty(&data)?;
        Self::atomic_write(path, json)
    }

    fn load_from_path(path: &Path) -> Result<Vec<Task>> {
        if !path.exists() {
            LoadState::set(path, LoadState::Success);
            return Ok(vec![]);
        }
        let result = Self::with_lock(path, || {
            let json = fs::read_to_string(path)?;
            let (tasks, needs_upgrade) = Self::parse_tasks(&json)?;
            if needs_upgrade {
                Self::write_tasks(path, &tasks)?;
            }
            Ok(tasks)
        });

        match &result {
            Ok(tasks) => {
                log::info!("Loaded {} tasks from {}", tasks.len(), path.display());
                LoadState::set(path, LoadState::Success);
            }
            Err(e) => {
                log::error!("Failed to load {}: {:#}", path.display(), e);
                LoadState::set(path, LoadState::Failed);
            }
        }
        result
    }

    /// Load the task collection.
    ///
    /// Never swallow errors from this function: a failed load blocks the
    /// next `save_tasks` to protect the unreadable file.
    pub fn load_tasks(ctx: &dyn AppContext) -> Result<Vec<Task>> {
        Self::load_from_path(&ctx.get_tasks_path()?)
    }

    pub fn save_tasks(ctx: &dyn AppContext, tasks: &[Task]) -> Result<()> {
        let path = ctx.get_tasks_path()?;
        if !Self::can_save_path(&path) {
            log::warn!("Refusing to save {}: previous load failed", path.display());
            return Err(anyhow::anyhow!(
                "Cannot save {}: previous load failed. This prevents overwriting data that couldn't be read.",
                path.display()
            ));
        }
        Self::with_lock(&path, || Self::write_tasks(&path, tasks))
    }

    /// Save bypassing the failed-load check. Only for deliberate recovery.
    pub fn force_save_tasks(ctx: &dyn AppContext, tasks: &[Task]) -> Result<()> {
        let path = ctx.get_tasks_path()?;
        Self::with_lock(&path, || Self::write_tasks(&path, tasks))?;
        LoadState::set(&path, LoadState::Success);
        Ok(())
    }

    pub fn can_save(ctx: &dyn AppContext) -> bool {
        ctx.get_tasks_path()
            .map(|p| Self::can_save_path(&p))
            .unwrap_or(false)
    }

    fn can_save_path(path: &Path) -> bool {
        match LoadState::get(path) {
            LoadState::Uninitialized => true,
            LoadState::Success => true,
            LoadState::Failed => false,
        }
    }

    /// Load the tag registry. `None` when nothing was ever saved.
    pub fn load_tags(ctx: &dyn AppContext) -> Result<Option<Vec<String>>> {
        let path = ctx.get_tags_path()?;
        if !path.exists() {
            return Ok(None);
        }
        let content = Self::with_lock(&path, || Ok(fs::read_to_string(&path)?))?;
        let tags = serde_json::from_str::<Vec<String>>(&content)
            .with_context(|| format!("Failed to parse tag registry {:?}", path))?;
        Ok(Some(tags))
    }

    pub fn save_tags(ctx: &dyn AppContext, tags: &[String]) -> Result<()> {
        let path = ctx.get_tags_path()?;
        Self::with_lock(&path, || {
            let json = serde_json::to_string_pretty(tags)?;
            Self::atomic_write(&path, json)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;
    use chrono::{NaiveDate, Utc};
    use std::sync::Arc;
    use std::thread;

    fn task(title: &str) -> Task {
        Task::new(
            title,
            NaiveDate::from_ymd_opt(2025, 9, 29).unwrap(),
            45.0,
            "Academic",
            Utc::now(),
        )
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let ctx = TestContext::new();
        assert!(LocalStorage::load_tasks(&ctx).unwrap().is_empty());
        assert!(LocalStorage::can_save(&ctx));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let ctx = TestContext::new();
        let tasks = vec![task("Read chapter"), task("Write essay")];
        LocalStorage::save_tasks(&ctx, &tasks).unwrap();

        let loaded = LocalStorage::load_tasks(&ctx).unwrap();
        assert_eq!(loaded, tasks);

        let raw = fs::read_to_string(ctx.get_tasks_path().unwrap()).unwrap();
        assert!(raw.contains("\"version\": 1"));
    }

    #[test]
    fn test_bare_array_is_upgraded() {
        let ctx = TestContext::new();
        let path = ctx.get_tasks_path().unwrap();
        let tasks = vec![task("Legacy")];
        fs::write(&path, serde_json::to_string(&tasks).unwrap()).unwrap();

        let loaded = LocalStorage::load_tasks(&ctx).unwrap();
        assert_eq!(loaded.len(), 1);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"version\""));
    }

    #[test]
    fn test_newer_version_is_refused() {
        let ctx = TestContext::new();
        let path = ctx.get_tasks_path().unwrap();
        fs::write(&path, r#"{"version": 99, "tasks": []}"#).unwrap();
        assert!(LocalStorage::load_tasks(&ctx).is_err());
    }

    #[test]
    fn test_save_blocked_after_failed_load() {
        let ctx = TestContext::new();
        let path = ctx.get_tasks_path().unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(LocalStorage::load_tasks(&ctx).is_err());
        assert!(!LocalStorage::can_save(&ctx));
        assert!(LocalStorage::save_tasks(&ctx, &[]).is_err());
        // The corrupt file is untouched.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");

        LocalStorage::force_save_tasks(&ctx, &[task("Recovered")]).unwrap();
        assert!(LocalStorage::can_save(&ctx));
        assert_eq!(LocalStorage::load_tasks(&ctx).unwrap().len(), 1);
    }

    #[test]
    fn test_tags_round_trip() {
        let ctx = TestContext::new();
        assert!(LocalStorage::load_tags(&ctx).unwrap().is_none());
        let tags = vec!["Academic".to_string(), "Study Group".to_string()];
        LocalStorage::save_tags(&ctx, &tags).unwrap();
        assert_eq!(LocalStorage::load_tags(&ctx).unwrap(), Some(tags));
    }

    #[test]
    fn test_locking_concurrency() {
        let ctx = TestContext::new();
        let path = Arc::new(ctx.get_data_dir().unwrap().join("counter.json"));
        LocalStorage::atomic_write(&*path, "0").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    LocalStorage::with_lock(&path, || {
                        let n: u32 = fs::read_to_string(&*path)?.trim().parse()?;
                        LocalStorage::atomic_write(&*path, (n + 1).to_string())?;
                        Ok(())
                    })
                    .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(fs::read_to_string(&*path).unwrap(), "8");
    }
}
