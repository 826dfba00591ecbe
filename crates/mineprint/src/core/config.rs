//! # Application Configuration
//!
//! Everything needed to bring an application up, in one serialisable tree:
//!
//! - **Application**: name, author and version
//! - **Window**: size, placement and swap synchronisation
//! - **Renderer**: clear colour, context attributes and GL debug filtering
//! - **Logging**: level and log file placement
//!
//! Missing fields fall back to their defaults, so a config file only needs to
//! mention what it changes.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::foundation::logging::LogConfig;
use crate::render::renderer::RendererSpecification;
use crate::render::window::WindowSpecification;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "mineprint.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_FILE`]
pub const CONFIG_ENV_VAR: &str = "MINEPRINT_CONFIG";

/// Semantic version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SemVer {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
}

impl SemVer {
    /// Create a version
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Pack into one integer: 10 bits major, 10 bits minor, 12 bits patch
    pub const fn packed(self) -> u32 {
        (self.major << 22) | (self.minor << 12) | self.patch
    }
}

impl Default for SemVer {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Application identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSpecification {
    /// Display name, also used for the data directory
    pub name: String,
    /// Author or organisation, also used for the data directory
    pub author: String,
    /// Application version
    pub version: SemVer,
}

impl Default for ApplicationSpecification {
    fn default() -> Self {
        Self {
            name: "Application".to_string(),
            author: "Super Cool Game Corp".to_string(),
            version: SemVer::default(),
        }
    }
}

impl ApplicationSpecification {
    /// Check that the identity can name a data directory
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }
        if self.author.is_empty() {
            return Err("Application author cannot be empty".to_string());
        }
        if self.version.packed() == 0 {
            return Err("Application version must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// # Application Configuration
///
/// Top-level configuration combining all subsystem configurations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application identity
    pub application: ApplicationSpecification,
    /// Main window
    pub window: WindowSpecification,
    /// Renderer
    pub renderer: RendererSpecification,
    /// Logging
    pub logging: LogConfig,
}

impl ApplicationConfig {
    /// Defaults for an application called `name`; the window is titled after it
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            application: ApplicationSpecification {
                name: name.clone(),
                ..ApplicationSpecification::default()
            },
            window: WindowSpecification {
                title: name,
                ..WindowSpecification::default()
            },
            ..Self::default()
        }
    }

    /// Path the configuration is read from: `$MINEPRINT_CONFIG` or `mineprint.toml`
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
    }

    /// Load from [`ApplicationConfig::default_path`], or defaults if there is no file
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_or_default(Self::default_path())
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        if self.window.title.is_empty() {
            return Err("Window title cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Config for ApplicationConfig {}
