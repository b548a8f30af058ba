//! Error types for the audit engine.
//!
//! This module provides structured error handling with:
//! - `AppError`: Domain-specific errors for engine operations
//! - `Result<T>`: Type alias for Results using AppError

use thiserror::Error;

/// Domain-specific errors for engine operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or malformed URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Brand configuration not found
    #[error("Configuration not found: {0}")]
    ConfigNotFound(String),

    /// Configuration exists but has no website URL to crawl
    #[error("Configuration {0} has no website URL")]
    MissingWebsiteUrl(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// External service error (search console, scanners, tip generation)
    #[error("Service error ({service}): {message}")]
    ServiceError { service: &'static str, message: String },

    /// Generic error with context
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Create a service error
    pub fn service(service: &'static str, msg: impl Into<String>) -> Self {
        Self::ServiceError { service, message: msg.into() }
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
