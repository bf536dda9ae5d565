//! Configuration system for the GCN recompiler

use crate::error::RecompilerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub translator: TranslatorConfig,
    pub debug: DebugConfig,
}

/// Translator behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// What a read of a register with no write in the current block resolves to
    pub undefined_reads: UndefinedReadPolicy,
    /// Materialize the shader's user data words as constants in the prologue
    pub inline_user_data: bool,
}

/// Resolution of registers that were not written earlier in the block
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum UndefinedReadPolicy {
    /// Emit an explicit live-in read, stitched to predecessors by the IR layer
    #[default]
    LiveIn,
    /// Use the architectural default: zero, or all lanes for masks
    Zero,
    /// Fail translation
    Error,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
    pub dump_ir: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            undefined_reads: UndefinedReadPolicy::default(),
            inline_user_data: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            dump_ir: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self, RecompilerError> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: &Path) -> Result<Self, RecompilerError> {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| RecompilerError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save_to(&self, path: &Path) -> Result<(), RecompilerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| RecompilerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcn-recompiler")
            .join("config.toml")
    }
}
