//! Collector configuration management
//!
//! Handles loading configuration from environment variables, TOML files and
//! command-line overrides.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::budget::MemoryBudget;
use crate::codec::CompressionParameters;
use crate::planner::{HeapAllocator, MemoryBudgetPlanner, MIN_RESIDENT_FRAMES};
use crate::store::StorageMode;

/// Configuration error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Tolerance is zero, negative or not finite.
    #[error("Invalid tolerance: {0}. Must be positive and finite")]
    InvalidTolerance(f32),

    /// Codec parallelism is zero.
    #[error("Invalid parallelism: {0}. Must be at least 1")]
    InvalidParallelism(usize),

    /// Resident frame cap below the minimum viable capacity.
    #[error("Invalid max_resident_frames: {0}. Must be at least 2")]
    InvalidResidentFrames(usize),

    /// Unknown log level.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// A value that cannot be parsed for its key.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Configuration key or environment variable
        key: String,
        /// Offending value
        value: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("Configuration file error: {0}")]
    File(String),

    /// The codec worker pool could not be started.
    #[error("Cannot start codec thread pool: {0}")]
    ThreadPool(String),
}

/// Log levels supported by the collector and CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Per-frame codec work
    Trace,
    /// Chunk flush and reload
    Debug,
    /// Planner outcome and pass transitions
    #[default]
    Info,
    /// Capacity degradation
    Warn,
    /// Errors only
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LogLevel::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Environment variable names read by [`CollectorConfig::apply_env`].
pub mod env_keys {
    /// Parent directory of run workspaces
    pub const WORKSPACE_ROOT: &str = "RTM_WORKSPACE_ROOT";
    /// Enable the lossy codec
    pub const COMPRESSION: &str = "RTM_COMPRESSION";
    /// Codec tolerance
    pub const TOLERANCE: &str = "RTM_TOLERANCE";
    /// Codec worker threads
    pub const PARALLELISM: &str = "RTM_PARALLELISM";
    /// Relative tolerance mode
    pub const RELATIVE: &str = "RTM_RELATIVE";
    /// Resident frame cap
    pub const MAX_RESIDENT_FRAMES: &str = "RTM_MAX_RESIDENT_FRAMES";
    /// Resident memory budget in megabytes
    pub const MEMORY_BUDGET_MB: &str = "RTM_MEMORY_BUDGET_MB";
    /// Keep the run workspace after drop
    pub const KEEP_WORKSPACE: &str = "RTM_KEEP_WORKSPACE";
    /// Log level
    pub const LOG_LEVEL: &str = "RTM_LOG_LEVEL";
}

/// Checkpoint collector configuration.
///
/// # Examples
///
/// ```rust
/// use rtm_checkpoint::config::CollectorConfig;
///
/// let config = CollectorConfig::builder()
///     .compression(true)
///     .tolerance(1e-3)
///     .parallelism(2)
///     .max_resident_frames(8)
///     .build()
///     .expect("valid configuration");
///
/// assert!(config.compression);
/// assert_eq!(config.max_resident_frames, Some(8));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Directory under which each collector creates its run workspace
    pub workspace_root: PathBuf,
    /// Store spilled chunks through the lossy codec
    pub compression: bool,
    /// Codec error bound (absolute, or fraction of peak amplitude)
    pub tolerance: f32,
    /// Codec worker threads
    pub parallelism: usize,
    /// Scale the tolerance by each frame's peak amplitude
    pub relative: bool,
    /// Cap on the first resident allocation request
    pub max_resident_frames: Option<usize>,
    /// Byte budget for the resident buffer, in megabytes
    pub memory_budget_mb: Option<usize>,
    /// Leave the run workspace on disk when the collector is dropped
    pub keep_workspace: bool,
    /// Log level
    pub log_level: LogLevel,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("rtm-checkpoints"),
            compression: false,
            tolerance: 1e-4,
            parallelism: num_cpus::get().max(1),
            relative: false,
            max_resident_frames: None,
            memory_budget_mb: None,
            keep_workspace: false,
            log_level: LogLevel::Info,
        }
    }
}

impl CollectorConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CollectorConfig = toml::from_str(content)
            .map_err(|e| ConfigError::File(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields whose variable `lookup` returns.
    ///
    /// `lookup` is usually `std::env::var`; tests pass a map instead.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(env_keys::WORKSPACE_ROOT) {
            self.workspace_root = PathBuf::from(root);
        }
        if let Some(v) = lookup(env_keys::COMPRESSION) {
            self.compression = parse_bool(env_keys::COMPRESSION, &v)?;
        }
        if let Some(v) = lookup(env_keys::TOLERANCE) {
            self.tolerance = parse_value(env_keys::TOLERANCE, &v)?;
        }
        if let Some(v) = lookup(env_keys::PARALLELISM) {
            self.parallelism = parse_value(env_keys::PARALLELISM, &v)?;
        }
        if let Some(v) = lookup(env_keys::RELATIVE) {
            self.relative = parse_bool(env_keys::RELATIVE, &v)?;
        }
        if let Some(v) = lookup(env_keys::MAX_RESIDENT_FRAMES) {
            self.max_resident_frames = Some(parse_value(env_keys::MAX_RESIDENT_FRAMES, &v)?);
        }
        if let Some(v) = lookup(env_keys::MEMORY_BUDGET_MB) {
            self.memory_budget_mb = Some(parse_value(env_keys::MEMORY_BUDGET_MB, &v)?);
        }
        if let Some(v) = lookup(env_keys::KEEP_WORKSPACE) {
            self.keep_workspace = parse_bool(env_keys::KEEP_WORKSPACE, &v)?;
        }
        if let Some(v) = lookup(env_keys::LOG_LEVEL) {
            self.log_level = LogLevel::from_str(&v)?;
        }
        Ok(())
    }

    /// Merge with command-line overrides (overrides take precedence)
    pub fn merge_with_cli(&mut self, cli: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(root) = &cli.workspace_root {
            self.workspace_root = root.clone();
        }
        if let Some(compression) = cli.compression {
            self.compression = compression;
        }
        if let Some(tolerance) = cli.tolerance {
            self.tolerance = tolerance;
        }
        if let Some(parallelism) = cli.parallelism {
            self.parallelism = parallelism;
        }
        if let Some(relative) = cli.relative {
            self.relative = relative;
        }
        if let Some(frames) = cli.max_resident_frames {
            self.max_resident_frames = Some(frames);
        }
        if let Some(mb) = cli.memory_budget_mb {
            self.memory_budget_mb = Some(mb);
        }
        if let Some(keep) = cli.keep_workspace {
            self.keep_workspace = keep;
        }
        if let Some(level) = &cli.log_level {
            self.log_level = LogLevel::from_str(level)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::InvalidParallelism(self.parallelism));
        }
        if let Some(frames) = self.max_resident_frames {
            if frames < MIN_RESIDENT_FRAMES {
                return Err(ConfigError::InvalidResidentFrames(frames));
            }
        }
        Ok(())
    }

    /// Chunk encoding selected by this configuration.
    pub fn storage_mode(&self) -> Result<StorageMode, ConfigError> {
        if self.compression {
            let params = CompressionParameters::new(self.tolerance, self.parallelism, self.relative)?;
            Ok(StorageMode::Compressed(params))
        } else {
            Ok(StorageMode::Raw)
        }
    }

    /// Resident memory budget, if one is configured.
    pub fn memory_budget(&self) -> Option<MemoryBudget> {
        self.memory_budget_mb.map(MemoryBudget::from_mb)
    }

    /// Planner honouring the resident frame cap.
    pub fn planner(&self) -> MemoryBudgetPlanner {
        match self.max_resident_frames {
            Some(frames) => MemoryBudgetPlanner::new().with_max_resident_frames(frames),
            None => MemoryBudgetPlanner::new(),
        }
    }

    /// Heap allocator honouring the memory budget.
    pub fn allocator(&self) -> HeapAllocator {
        match self.memory_budget() {
            Some(budget) => HeapAllocator::with_budget(budget),
            None => HeapAllocator::new(),
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Command-line overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Workspace root override
    pub workspace_root: Option<PathBuf>,
    /// Compression override
    pub compression: Option<bool>,
    /// Tolerance override
    pub tolerance: Option<f32>,
    /// Parallelism override
    pub parallelism: Option<usize>,
    /// Relative mode override
    pub relative: Option<bool>,
    /// Resident frame cap override
    pub max_resident_frames: Option<usize>,
    /// Memory budget override
    pub memory_budget_mb: Option<usize>,
    /// Keep-workspace override
    pub keep_workspace: Option<bool>,
    /// Log level override
    pub log_level: Option<String>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &ConfigOverrides) -> Result<CollectorConfig, ConfigError> {
    build_config_with(cli, |key| std::env::var(key).ok())
}

/// [`build_config`] with an explicit environment lookup.
pub fn build_config_with<F>(cli: &ConfigOverrides, lookup: F) -> Result<CollectorConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config_file {
        Some(path) => CollectorConfig::from_file(path)?,
        None => CollectorConfig::default(),
    };

    config.apply_env(lookup)?;
    config.merge_with_cli(cli)?;

    config.validate()?;
    Ok(config)
}

/// Builder for [`CollectorConfig`].
#[derive(Clone, Debug, Default)]
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// Sets the workspace root directory.
    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = root.into();
        self
    }

    /// Enables or disables the lossy codec.
    pub fn compression(mut self, enabled: bool) -> Self {
        self.config.compression = enabled;
        self
    }

    /// Sets the codec tolerance.
    pub fn tolerance(mut self, tolerance: f32) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Sets the codec worker count.
    pub fn parallelism(mut self, threads: usize) -> Self {
        self.config.parallelism = threads;
        self
    }

    /// Selects relative tolerance.
    pub fn relative(mut self, relative: bool) -> Self {
        self.config.relative = relative;
        self
    }

    /// Caps the resident buffer at `frames`.
    pub fn max_resident_frames(mut self, frames: usize) -> Self {
        self.config.max_resident_frames = Some(frames);
        self
    }

    /// Limits the resident buffer to `mb` megabytes.
    pub fn memory_budget_mb(mut self, mb: usize) -> Self {
        self.config.memory_budget_mb = Some(mb);
        self
    }

    /// Keeps the run workspace after drop.
    pub fn keep_workspace(mut self, keep: bool) -> Self {
        self.config.keep_workspace = keep;
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build(self) -> Result<CollectorConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
