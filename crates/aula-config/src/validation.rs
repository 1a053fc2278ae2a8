//! Range checks for configuration values.

use aula_core::MIN_BLOCK_SIZE;
use aula_core::controls::MAX_INPUT_SENSITIVITY;
use thiserror::Error;

use crate::config::ReverbConfig;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Parameter value out of range.
    #[error("'{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the parameter.
        param: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// A size that must be a power of two is not.
    #[error("'{param}' must be a power of two, got {value}")]
    NotPowerOfTwo {
        /// Name of the parameter.
        param: String,
        /// The offending size.
        value: usize,
    },

    /// Decay edit arrays have the wrong length.
    #[error("decay edit needs {expected} values per curve, got top = {top}, bottom = {bottom}")]
    DecayLength {
        /// Bins implied by the analysis block.
        expected: usize,
        /// Length of `top`.
        top: usize,
        /// Length of `bottom`.
        bottom: usize,
    },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn check_range(param: &str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            param: param.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_power_of_two(param: &str, value: usize, min: usize) -> ValidationResult<()> {
    if value < min || !value.is_power_of_two() {
        return Err(ValidationError::NotPowerOfTwo {
            param: param.to_string(),
            value,
        });
    }
    Ok(())
}

/// Check every section of `config`.
pub fn validate_config(config: &ReverbConfig) -> ValidationResult<()> {
    let engine = &config.engine;
    check_power_of_two("engine.block_size", engine.block_size, MIN_BLOCK_SIZE)?;
    check_range("engine.channels", engine.channels as f64, 1.0, 2.0)?;
    check_range(
        "engine.sample_rate",
        f64::from(engine.sample_rate),
        1.0,
        f64::from(u32::MAX),
    )?;
    check_range("engine.mix", f64::from(engine.mix), 0.0, 100.0)?;
    check_range(
        "engine.input_sensitivity",
        f64::from(engine.input_sensitivity),
        0.0,
        f64::from(MAX_INPUT_SENSITIVITY),
    )?;
    if !(engine.overload_threshold.is_finite() && engine.overload_threshold > 0.0) {
        return Err(ValidationError::OutOfRange {
            param: "engine.overload_threshold".to_string(),
            value: f64::from(engine.overload_threshold),
            min: f64::from(f32::EPSILON),
            max: f64::from(f32::MAX),
        });
    }

    let synthesis = &config.synthesis;
    check_power_of_two("synthesis.analysis_block", synthesis.analysis_block, 2)?;
    check_range(
        "synthesis.envelope_block",
        synthesis.envelope_block as f64,
        1.0,
        f64::from(u32::MAX),
    )?;
    check_range(
        "synthesis.target_frames",
        synthesis.target_frames as f64,
        1.0,
        f64::from(u32::MAX),
    )?;

    if let Some(decay) = &config.decay {
        let expected = synthesis.analysis_block + 1;
        if decay.top.len() != expected || decay.bottom.len() != expected {
            return Err(ValidationError::DecayLength {
                expected,
                top: decay.top.len(),
                bottom: decay.bottom.len(),
            });
        }
        for (i, &value) in decay.top.iter().enumerate() {
            check_range(&format!("decay.top[{i}]"), f64::from(value), 0.0, 1.0)?;
        }
        for (i, &value) in decay.bottom.iter().enumerate() {
            check_range(&format!("decay.bottom[{i}]"), f64::from(value), 0.0, 1.0)?;
        }
    }

    Ok(())
}
