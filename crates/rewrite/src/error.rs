//! Error types for the rewrite engine

use std::time::Duration;
use thiserror::Error;

/// Failure of a whole rewrite. Individual block rejections are not errors.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("Completion service failed: {0}")]
    Service(#[from] ServiceError),

    #[error("Completion service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid rewrite request: {0}")]
    InvalidRequest(String),
}

/// Error reported by a completion service implementation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service not configured: {0}")]
    NotConfigured(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Response(String),
}

pub type Result<T> = std::result::Result<T, RewriteError>;
