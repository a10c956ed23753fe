// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for irqlat.
//!
//! This module defines explicit enum error types as per coding guidelines.
//! No `Box<dyn Error>`, no `anyhow::Result` - all errors are strongly typed.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{PinIndex, RegisterAddress};

/// Top-level error type for the latency monitor.
/// All errors are explicit variants - no catch-all or generic handling.
#[derive(Debug, Error)]
pub enum IrqLatError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Register Access Errors - Fatal Mid-Run
    // =========================================================================
    #[error("Register access error: {0}")]
    Register(#[from] RegisterError),

    // =========================================================================
    // Notification Errors - Fatal Before The First Series
    // =========================================================================
    #[error("Notification channel error: {0}")]
    Notify(#[from] NotifyError),

    // =========================================================================
    // Interrupt Endpoint Errors
    // =========================================================================
    #[error("Interrupt endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    // =========================================================================
    // Measurement Errors
    // =========================================================================
    #[error("Sampler error: {0}")]
    Sampler(#[from] SamplerError),

    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("Resource unavailable: {resource} - {reason}")]
    ResourceUnavailable { resource: String, reason: String },

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Report encoding error: {message}")]
    Encode { message: String },
}

/// Hard validation errors cause immediate process termination.
/// Used when configuration is invalid and no measurement can safely start.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid register address: {value} - {reason}")]
    InvalidRegisterAddress { value: String, reason: String },

    #[error("Invalid pin index: {pin} (must be below {limit})")]
    InvalidPin { pin: u32, limit: u32 },
}

/// Register Access Layer errors.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("Resource unavailable: {resource} - {reason}")]
    ResourceUnavailable { resource: String, reason: String },

    #[error("Failed to map register window for {address}: {reason}")]
    MappingFailed {
        address: RegisterAddress,
        reason: String,
    },

    #[error("Failed to write {address} bit {pin}: {reason}")]
    WriteFailed {
        address: RegisterAddress,
        pin: PinIndex,
        reason: String,
    },
}

/// Errors raised while wiring up asynchronous notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Resource unavailable: {resource} - {reason}")]
    ResourceUnavailable { resource: String, reason: String },

    #[error("Asynchronous notification setup failed at {step}: {reason}")]
    ConfigurationFailed { step: &'static str, reason: String },

    #[error("Cannot install handler for {signal}: {reason}")]
    HandlerInstall { signal: &'static str, reason: String },
}

/// Interrupt endpoint lifecycle errors.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Platform probe did not yield an IRQ line: {reason}")]
    ProbeFailed { reason: String },

    #[error("Registration failed at stage {stage}: {reason}")]
    RegistrationFailed { stage: &'static str, reason: String },

    #[error("Cannot move interrupt endpoint from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

/// Errors raised by the sampling loop.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("Trial {trial}: no interrupt notification within {waited_ms}ms")]
    WaitTimedOut { trial: usize, waited_ms: u64 },

    #[error("Trial {trial}: {source}")]
    Register {
        trial: usize,
        #[source]
        source: RegisterError,
    },
}

/// Statistics errors.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Cannot summarize an empty series")]
    EmptySeries,
}

/// Result type alias using IrqLatError.
pub type IrqLatResult<T> = Result<T, IrqLatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_validation_error_display() {
        let err = HardValidationError::InvalidFieldValue {
            field: "samples",
            value: "0".to_string(),
            reason: "At least one sample is required".to_string(),
        };
        assert!(err.to_string().contains("samples"));
        assert!(err.to_string().contains("At least one"));
    }

    #[test]
    fn test_error_chain() {
        let register_err = RegisterError::ResourceUnavailable {
            resource: "/dev/mem".to_string(),
            reason: "Permission denied".to_string(),
        };
        let err: IrqLatError = register_err.into();
        assert!(matches!(err, IrqLatError::Register(_)));
        assert!(err.to_string().contains("/dev/mem"));
    }

    #[test]
    fn test_sampler_error_names_trial() {
        let err = SamplerError::WaitTimedOut {
            trial: 7,
            waited_ms: 50,
        };
        assert!(err.to_string().contains("Trial 7"));
    }
}
