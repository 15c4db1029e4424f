//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `whoshome.toml` in the working directory, then
//! `/etc/whoshome.toml`; an explicit `--config` path or `WHOSHOME_CONFIG`
//! must exist. Every field has a sensible default so the file is optional.
//! Raw section tables are validated once, at load time, into
//! [`Section`] values with compiled filter criteria — nothing is looked up
//! ad hoc during a cycle.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use whoshome_app::Section;
use whoshome_domain::error::ValidationError;
use whoshome_domain::filter::FilterCriteria;
use whoshome_domain::machines::KnownMachines;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Process-wide settings.
    pub main: MainConfig,
    /// Known-machine alias table (`name = "mac"`). Leaving the whole table
    /// out drops machine-name filtering entirely; an empty table keeps it
    /// strictly restrictive.
    pub machines: Option<BTreeMap<String, String>>,
    /// Monitored sections, evaluated in declaration order.
    #[serde(rename = "section")]
    pub sections: Vec<SectionConfig>,
}

/// Process-wide settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MainConfig {
    /// Log filter directive (`RUST_LOG` syntax).
    pub log_filter: String,
    /// Snapshot file for per-section debounce state.
    pub state_file: PathBuf,
    /// Seconds between cycles in `watch` mode.
    pub loop_every_sec: u64,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            log_filter: "whoshomed=info,whoshome=info".to_string(),
            state_file: PathBuf::from("whoshome-state.json"),
            loop_every_sec: 120,
        }
    }
}

/// One raw `[[section]]` table, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    /// Section name, the persistence key. Required.
    pub name: String,
    /// Whether the section is evaluated at all.
    pub enabled: bool,
    /// Identical in-window results required before acting.
    pub threshold: usize,
    /// Regex a raw neighbor line must match to count.
    pub filter_on_regex: Option<String>,
    /// Regex that excludes a raw neighbor line outright.
    pub filter_out_regex: Option<String>,
    /// Alias names restricting matches to specific machines.
    pub filter_on_machines: Vec<String>,
    /// Alias names excluded from matching.
    pub filter_out_machines: Vec<String>,
    /// Literal substrings that exclude a raw neighbor line.
    pub exclude: Vec<String>,
    /// Reverse-resolve addresses for diagnostic labels.
    pub nslookup: bool,
    /// Restrict the neighbor listing to one device.
    pub device: Option<String>,
    /// Cron window gating when the section is evaluated.
    pub cron: Option<String>,
    /// Command to run when a neighbor appears.
    pub command_neighbor: Option<String>,
    /// Command to run when the last neighbor leaves.
    pub command_no_neighbor: Option<String>,
    /// Roll back and retry when the command writes to stderr.
    pub error_on_stderr: bool,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            threshold: 3,
            filter_on_regex: None,
            filter_out_regex: None,
            filter_on_machines: Vec::new(),
            filter_out_machines: Vec::new(),
            exclude: Vec::new(),
            nslookup: false,
            device: None,
            cron: None,
            command_neighbor: None,
            command_no_neighbor: None,
            error_on_stderr: true,
        }
    }
}

impl Config {
    /// Load configuration, then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error when an explicitly named file cannot be read, or any
    /// found file is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_required_file(path)?,
            None => match std::env::var_os("WHOSHOME_CONFIG") {
                Some(path) => Self::from_required_file(Path::new(&path))?,
                None => Self::from_first_existing(&[
                    Path::new("whoshome.toml"),
                    Path::new("/etc/whoshome.toml"),
                ])?,
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn from_required_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    fn from_first_existing(candidates: &[&Path]) -> Result<Self, ConfigError> {
        for path in candidates {
            match std::fs::read_to_string(path) {
                Ok(content) => return toml::from_str(&content).map_err(ConfigError::Parse),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(ConfigError::Io(err)),
            }
        }
        Ok(Self::default())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(path) = std::env::var_os("WHOSHOME_STATE_FILE") {
            self.main.state_file = PathBuf::from(path);
        }
        if let Ok(filter) = std::env::var("WHOSHOME_LOG") {
            self.main.log_filter = filter;
        }
        if let Ok(filter) = std::env::var("RUST_LOG") {
            self.main.log_filter = filter;
        }
    }

    /// The alias table, if one was configured. `None` and an empty table are
    /// deliberately distinct — see the filter pipeline.
    #[must_use]
    pub fn known_machines(&self) -> Option<KnownMachines> {
        self.machines.as_ref().map(|mapping| {
            KnownMachines::new(
                mapping
                    .iter()
                    .map(|(name, mac)| (name.clone(), mac.clone())),
            )
        })
    }

    /// Validate all raw section tables into runtime sections.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate or empty names, zero thresholds,
    /// invalid regexes, or invalid cron expressions.
    pub fn sections(&self) -> Result<Vec<Section>, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut sections = Vec::with_capacity(self.sections.len());
        for raw in &self.sections {
            if !seen.insert(raw.name.clone()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate section name {:?}",
                    raw.name
                )));
            }
            if let Some(expression) = &raw.cron {
                whoshome_adapter_cron::validate(expression)?;
            }
            sections.push(raw.build()?);
        }
        Ok(sections)
    }
}

impl SectionConfig {
    fn build(&self) -> Result<Section, ValidationError> {
        let mut criteria = FilterCriteria::builder()
            .filter_on_machines(self.filter_on_machines.iter().cloned())
            .filter_out_machines(self.filter_out_machines.iter().cloned())
            .exclude(self.exclude.iter().cloned());
        if let Some(pattern) = &self.filter_on_regex {
            criteria = criteria.filter_on_regex(pattern);
        }
        if let Some(pattern) = &self.filter_out_regex {
            criteria = criteria.filter_out_regex(pattern);
        }

        let mut section = Section::builder(&self.name)
            .enabled(self.enabled)
            .threshold(self.threshold)
            .criteria(criteria.build()?)
            .nslookup(self.nslookup)
            .error_on_stderr(self.error_on_stderr);
        if let Some(device) = &self.device {
            section = section.device(device);
        }
        if let Some(expression) = &self.cron {
            section = section.cron(expression);
        }
        if let Some(command) = &self.command_neighbor {
            section = section.command_neighbor(command);
        }
        if let Some(command) = &self.command_no_neighbor {
            section = section.command_no_neighbor(command);
        }
        section.build()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File IO failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// A section value was rejected by the domain.
    #[error("invalid configuration")]
    Section(#[from] ValidationError),
}
