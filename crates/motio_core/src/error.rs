//! Core error types

use thiserror::Error;

/// Errors raised by the core runtime
#[derive(Error, Debug)]
pub enum MotionError {
    /// Interpolation input and output ranges differ in length
    #[error("Interpolation ranges differ in length: {input} inputs, {output} outputs")]
    InterpolationLength { input: usize, output: usize },

    /// An operation that needs at least one element received none
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Configuration could not be parsed
    #[error("Invalid motion configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, MotionError>;
