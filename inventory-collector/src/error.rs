//! Typed errors for provider calls, envelope construction and settings.

use aws_sdk_rds::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Failure of a single remote call against the cloud provider.
///
/// Service errors carry the provider's error code; everything that went wrong
/// before a well-formed service response arrived (dispatch, timeout,
/// unparseable response, request construction) is a client error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("client error: {0}")]
    Client(String),
}

impl ProviderError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::Client(message.into())
    }

    /// Classify an SDK error by its metadata code.
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug + Send + Sync + 'static,
    {
        match err {
            SdkError::ServiceError(ref ctx) => {
                let inner = ctx.err();
                Self::Service {
                    code: inner.code().unwrap_or("Unknown").to_string(),
                    message: inner
                        .message()
                        .map(str::to_string)
                        .unwrap_or_else(|| DisplayErrorContext(inner).to_string()),
                }
            }
            other => Self::Client(DisplayErrorContext(&other).to_string()),
        }
    }

    /// "service" or "client"
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Service { .. } => "service",
            Self::Client(_) => "client",
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            Self::Client(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Service { message, .. } => message,
            Self::Client(message) => message,
        }
    }
}

/// Envelope construction errors
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// identity is empty
    #[error("{resource_type} identity cannot be empty (name: '{display_name}')")]
    EmptyIdentity {
        resource_type: &'static str,
        display_name: String,
    },

    /// raw resource could not be turned into a configuration document
    #[error("failed to snapshot configuration of '{identity}': {source}")]
    Configuration {
        identity: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one region is required")]
    EmptyRegions,

    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("{key} must be a positive integer, got: {value}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("OUT_MODE=http requires COLLECTOR_ENDPOINT")]
    MissingEndpoint,

    #[error("Failed to parse fixture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read fixture file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
