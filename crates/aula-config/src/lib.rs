//! Configuration for the Aula convolution reverb.
//!
//! A single TOML file describes the engine, the synthesis pipeline, the
//! impulse source and an optional edited decay curve. Missing sections and
//! keys take the library defaults; [`ReverbConfig::load`] validates ranges
//! before returning.
//!
//! # Example
//!
//! ```rust,no_run
//! use aula_config::{ReverbConfig, default_config_path};
//!
//! let config = ReverbConfig::load(default_config_path()).unwrap();
//! let engine = config.engine_config();
//! let synthesis = config.synthesis_config();
//! ```

mod config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Range checks for configuration values.
pub mod validation;

pub use config::{
    DecaySection, EngineSection, ImpulseSection, ReverbConfig, ShapingMode, SynthesisSection,
};
pub use error::ConfigError;
pub use paths::{default_config_path, ensure_user_config_dir, user_config_dir};
pub use validation::{ValidationError, ValidationResult, validate_config};
