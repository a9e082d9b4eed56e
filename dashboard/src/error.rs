//! # Error Types
//!
//! Failures are classified at two boundaries:
//! - [`ApiError`]: what the remote data source reports for a single request
//! - [`DashboardError`]: what the aggregation store reports to its callers
//!
//! Neither is fatal. The store stays usable after any failed operation.

use shared::Category;
use thiserror::Error;

use crate::session::SessionError;

/// Classified failure of one remote request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// No response reached the client (connection refused, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status or refused a write
    #[error("Server error {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// The server answered 2xx but the body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// Build an `HttpStatus` error, falling back to a generic message keyed
    /// by status code when the server did not supply one
    pub fn http_status(status: u16, server_message: Option<String>) -> Self {
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| generic_status_message(status).to_string());
        ApiError::HttpStatus { status, message }
    }

    /// True when the server rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::HttpStatus { status: 401 | 403, .. })
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Could not reach the server. Check your connection and try again.".to_string(),
            ApiError::HttpStatus { message, .. } => message.clone(),
            ApiError::MalformedResponse(_) => "The server sent an unexpected response.".to_string(),
        }
    }
}

fn generic_status_message(status: u16) -> &'static str {
    match status {
        400 => "The request was invalid.",
        401 => "Your session has expired. Please log in again.",
        403 => "You are not allowed to perform this action.",
        404 => "The requested data was not found.",
        409 => "The data changed on the server. Refresh and try again.",
        413 => "The uploaded file is too large.",
        422 => "The server could not process the submitted data.",
        429 => "Too many requests. Please wait and try again.",
        200..=299 => "The server did not confirm the change.",
        500..=599 => "The server encountered an error.",
        _ => "The request failed.",
    }
}

/// Failure reported by the aggregation store
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Transaction {0} is not loaded")]
    UnknownTransaction(i64),

    #[error("Budget for {category} cannot be negative")]
    NegativeBudget { category: Category },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl DashboardError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
