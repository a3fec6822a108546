//! Core error types for chronos-core.
//!
//! Errors are grouped by the layer that raises them. The planner itself never
//! surfaces backend failures to its caller (they become notifications), so
//! [`ApiError`] mostly travels between the backend and the planner.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to the planning backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request never completed (DNS, connect, timeout, ...)
    #[error("Network error calling {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Backend answered with a non-success status
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// Response body was not the expected JSON shape
    #[error("Invalid response from {endpoint}: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },

    /// Base URL could not be combined with an endpoint path
    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not locate or create the config directory
    #[error("Config directory unavailable: {0}")]
    DataDir(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Errors returned by planner operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlannerError {
    /// Brain dump was empty after trimming
    #[error("Nothing to plan: the brain dump is empty")]
    EmptyInput,

    /// A submission is already running
    #[error("A planning request is already in progress")]
    SubmissionInFlight,

    /// Step pacing range is inverted
    #[error("Invalid step pacing: min {min_ms}ms is greater than max {max_ms}ms")]
    InvalidPacing { min_ms: u64, max_ms: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_names_endpoint() {
        let err = ApiError::Status {
            endpoint: "/api/parse",
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "/api/parse returned HTTP 500: boom");
    }
}
