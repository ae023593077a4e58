// File: ./src/config.rs
// Handles settings loading, saving, and defaults.
use crate::context::AppContext;
use crate::model::item::format_decimal;
use crate::storage::LocalStorage;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use strum::EnumIter;

pub const DEFAULT_WEEKLY_CAP_MINUTES: f64 = 600.0;

fn default_weekly_cap() -> f64 {
    DEFAULT_WEEKLY_CAP_MINUTES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[default]
    Minutes,
    Hours,
}

impl DurationUnit {
    /// Converts a stored duration (always minutes) into this unit.
    pub fn from_minutes(&self, minutes: f64) -> f64 {
        match self {
            DurationUnit::Minutes => minutes,
            DurationUnit::Hours => minutes / 60.0,
        }
    }

    pub fn format(&self, minutes: f64) -> String {
        let value = (self.from_minutes(minutes) * 100.0).round() / 100.0;
        match self {
            DurationUnit::Minutes => format!("{} min", format_decimal(value)),
            DurationUnit::Hours => format!("{} h", format_decimal(value)),
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationUnit::Minutes => write!(f, "minutes"),
            DurationUnit::Hours => write!(f, "hours"),
        }
    }
}

/// User settings. Stored as TOML in the config directory and embedded as
/// JSON in export bundles.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub unit: DurationUnit,
    /// Minutes per ISO week.
    #[serde(default = "default_weekly_cap", alias = "weekly_cap")]
    pub weekly_cap: f64,
    #[serde(default, alias = "case_sensitive_search")]
    pub case_sensitive_search: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            unit: DurationUnit::default(),
            weekly_cap: DEFAULT_WEEKLY_CAP_MINUTES,
            case_sensitive_search: false,
        }
    }
}

impl Settings {
    /// Replaces values that parse but make no sense with their defaults.
    pub fn sanitized(mut self) -> Self {
        if !self.weekly_cap.is_finite() || self.weekly_cap <= 0.0 {
            log::warn!(
                "Ignoring non-positive weekly cap {}, using {}",
                self.weekly_cap,
                DEFAULT_WEEKLY_CAP_MINUTES
            );
            self.weekly_cap = DEFAULT_WEEKLY_CAP_MINUTES;
        }
        self
    }

    /// Load settings using an explicit context. A missing file yields defaults.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(settings.sanitized())
    }

    /// Save settings using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        LocalStorage::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            LocalStorage::atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }
}
