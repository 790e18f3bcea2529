//! FinAssist Common - Shared configuration, errors, and logging for the gateway.
//!
//! This crate provides:
//! - Configuration types and loading (file, `.env`, environment overrides)
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup and request trace context

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    Config, IgnoredOverride, LlmConfig, NetworkConfig, ObservabilityConfig, SecretsConfig,
    SessionConfig,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};
