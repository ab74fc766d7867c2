// Ethernet Bundle - Error Types
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Shared error types for the Ethernet bundle.

use thiserror::Error;

use super::validation::ValidationErrors;

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bundle operations.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================
    // Request Errors
    // ========================================
    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),

    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("No such device: {0}")]
    NotFound(u32),

    #[error("Device \"{0}\" does not exist.")]
    UnknownDevice(String),

    // ========================================
    // Startup Errors
    // ========================================
    #[error("No interfaces to be configured.")]
    NoInterfaces,

    // ========================================
    // Storage Errors
    // ========================================
    #[error("Failed to read configuration: {0}")]
    ConfigReadFailed(String),

    #[error("Failed to write configuration: {0}")]
    ConfigWriteFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParseFailed(String),

    // ========================================
    // System Errors
    // ========================================
    #[error("Command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new command failed error.
    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// HTTP-like status code reported on the bus for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidAddress(_) => 400,
            Self::NotFound(_) | Self::UnknownDevice(_) => 404,
            _ => 500,
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

// Convert from toml parse errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParseFailed(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigParseFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NotFound(3).status_code(), 404);
        assert_eq!(Error::InvalidAddress("1.2.3".into()).status_code(), 400);
        assert_eq!(Error::UnknownDevice("eth9".into()).status_code(), 404);
        assert_eq!(Error::command_failed("ip", "boom").status_code(), 500);
    }

    #[test]
    fn test_validation_errors_convert() {
        let err = Error::from(ValidationErrors::single("enable", "expected a boolean"));
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "Invalid input: enable: expected a boolean");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::UnknownDevice("eth4".into()).to_string(),
            "Device \"eth4\" does not exist."
        );
        assert_eq!(Error::NoInterfaces.to_string(), "No interfaces to be configured.");
    }
}
