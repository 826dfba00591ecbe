//! # Core Module
//!
//! Application identity and the unified configuration tree.

pub mod config;

pub use config::{
    ApplicationConfig,
    ApplicationSpecification,
    Config,
    ConfigError,
    SemVer,
    CONFIG_ENV_VAR,
    DEFAULT_CONFIG_FILE,
};
