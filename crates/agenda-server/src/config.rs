use agenda_core::perspective::{
    OccurrenceKeying, PlannerOptions, DEFAULT_MAX_BUCKETS, DEFAULT_MAX_ITERATIONS,
    DEFAULT_MAX_OCCURRENCES,
};
use agenda_core::timezone::validate_timezone;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "agenda.toml";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub planner: PlannerConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "agenda.db".to_string(),
        }
    }
}

/// Planner computation settings
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Timezone used by the CLI when `--timezone` is omitted (IANA format)
    pub default_timezone: String,
    /// Cap on generated occurrences per recurring task and request
    pub max_occurrences_per_task: usize,
    /// Cap on rule steps walked per recurring task and request, counting
    /// steps before the window
    pub max_iterations_per_task: usize,
    /// Largest number of buckets one request may produce
    pub max_buckets: usize,
    /// Keep every occurrence of a recurring task inside one bucket instead
    /// of only the last one
    pub preserve_all_occurrences: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_timezone: detect_system_timezone(),
            max_occurrences_per_task: DEFAULT_MAX_OCCURRENCES,
            max_iterations_per_task: DEFAULT_MAX_ITERATIONS,
            max_buckets: DEFAULT_MAX_BUCKETS,
            preserve_all_occurrences: false,
        }
    }
}

impl PlannerConfig {
    pub fn options(&self) -> PlannerOptions {
        PlannerOptions {
            max_occurrences_per_task: self.max_occurrences_per_task,
            max_iterations_per_task: self.max_iterations_per_task,
            max_buckets: self.max_buckets,
            keying: if self.preserve_all_occurrences {
                OccurrenceKeying::PerOccurrence
            } else {
                OccurrenceKeying::TaskId
            },
        }
    }
}

impl Config {
    /// Loads `agenda.toml` from the working directory merged with
    /// `AGENDA_`-prefixed environment variables.
    pub fn new() -> Result<Self, figment::Error> {
        Self::from_file(DEFAULT_CONFIG_FILE)
    }

    /// Same as [`Config::new`] with an explicit file. A missing file is not
    /// an error; defaults and the environment still apply.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("AGENDA_").split("__"))
    }
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    "UTC".to_string()
}
