use std::fmt;

use reqwest::{Response, StatusCode};
use thiserror::Error;

/// The remote service a request was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    YouTube,
    GoogleOAuth,
    Spotify,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::YouTube => write!(f, "YouTube"),
            Service::GoogleOAuth => write!(f, "Google OAuth"),
            Service::Spotify => write!(f, "Spotify"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("{service} request failed with status {status}: {body}")]
    ProviderRequest {
        service: Service,
        status: u16,
        body: String,
    },

    #[error("Malformed {service} response: {detail}")]
    MalformedResponse { service: Service, detail: String },

    #[error("Metadata extraction failed for {url}: {reason}")]
    Metadata { url: String, reason: String },

    #[error("Adding tracks to playlist failed: response gave status code {status}")]
    BulkInsert { status: u16 },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Drains a non-success response into a `ProviderRequest` error, keeping the raw body.
    pub(crate) async fn from_response(service: Service, response: Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        AppError::ProviderRequest {
            service,
            status,
            body,
        }
    }

    pub(crate) fn malformed(service: Service, detail: impl fmt::Display) -> Self {
        AppError::MalformedResponse {
            service,
            detail: detail.to_string(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::ProviderRequest { status, .. } | AppError::BulkInsert { status } => {
                Some(*status)
            }
            AppError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Errors that end the run even when the call site is configured to skip failures.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Auth(_) | AppError::Config(_))
            || self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
