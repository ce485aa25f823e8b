//! Error types for the external service clients
//!
//! Every failure of an outbound call is converted into a [`GuideError`] at the
//! client boundary. Nothing here is fatal: the presentation layer turns each
//! error into an inline message for a single widget.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// External services the guide talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Completion,
    Search,
    Weather,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Completion => "AI guide",
            Service::Search => "Blog search",
            Service::Weather => "Weather service",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`GuideError`], useful for matching in callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unconfigured,
    NotFound,
    RateLimited,
    ConnectionFailed,
    Timeout,
    Unknown,
}

/// Failure of a single external call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuideError {
    /// No credential was configured for the service
    #[error("{service} is not configured (missing {setting})")]
    Unconfigured {
        service: Service,
        setting: &'static str,
    },

    /// The backend rejected the requested resource (model id, endpoint)
    #[error("{service} could not find {resource}")]
    NotFound {
        service: Service,
        resource: String,
        suggestion: Option<String>,
    },

    /// The backend is throttling requests
    #[error("{service} is rate limiting requests")]
    RateLimited { service: Service },

    /// Network-level failure or an unreadable response
    #[error("{service} connection failed: {message}")]
    ConnectionFailed { service: Service, message: String },

    /// The request did not complete within its time budget
    #[error("{service} timed out")]
    Timeout { service: Service },

    /// Anything else, with the raw diagnostic text
    #[error("{service} error: {message}")]
    Unknown { service: Service, message: String },
}

impl GuideError {
    pub fn unconfigured(service: Service, setting: &'static str) -> Self {
        Self::Unconfigured { service, setting }
    }

    pub fn connection<S: Into<String>>(service: Service, message: S) -> Self {
        Self::ConnectionFailed {
            service,
            message: message.into(),
        }
    }

    pub fn unknown<S: Into<String>>(service: Service, message: S) -> Self {
        Self::Unknown {
            service,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status returned by a backend.
    ///
    /// `resource` names what was requested so a 404 can say what went missing.
    pub fn from_status(
        service: Service,
        status: StatusCode,
        resource: &str,
        body: &str,
    ) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound {
                service,
                resource: resource.to_string(),
                suggestion: None,
            },
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { service },
            _ => Self::Unknown {
                service,
                message: format!("{status}: {}", body.trim()),
            },
        }
    }

    /// Classify a transport error raised by reqwest
    pub fn from_transport(service: Service, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { service }
        } else if err.is_connect() || err.is_request() || err.is_decode() || err.is_body() {
            Self::connection(service, err.to_string())
        } else {
            Self::unknown(service, err.to_string())
        }
    }

    /// Attach a remediation hint to a `NotFound` error; other variants pass through
    #[must_use]
    pub fn with_suggestion<S: Into<String>>(self, hint: S) -> Self {
        match self {
            Self::NotFound {
                service, resource, ..
            } => Self::NotFound {
                service,
                resource,
                suggestion: Some(hint.into()),
            },
            other => other,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            GuideError::Unconfigured { .. } => ErrorKind::Unconfigured,
            GuideError::NotFound { .. } => ErrorKind::NotFound,
            GuideError::RateLimited { .. } => ErrorKind::RateLimited,
            GuideError::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            GuideError::Timeout { .. } => ErrorKind::Timeout,
            GuideError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    #[must_use]
    pub fn service(&self) -> Service {
        match self {
            GuideError::Unconfigured { service, .. }
            | GuideError::NotFound { service, .. }
            | GuideError::RateLimited { service }
            | GuideError::ConnectionFailed { service, .. }
            | GuideError::Timeout { service }
            | GuideError::Unknown { service, .. } => *service,
        }
    }

    /// Get a user-facing message explaining what to do next
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            GuideError::Unconfigured { service, setting } => format!(
                "{service} is not set up yet. Add `{setting}` to the server configuration and restart."
            ),
            GuideError::NotFound {
                resource,
                suggestion,
                ..
            } => match suggestion {
                Some(hint) => format!("Could not find {resource}. Try switching to {hint}."),
                None => format!("Could not find {resource}."),
            },
            GuideError::RateLimited { service } => format!(
                "{service} is busy right now. Please wait about a minute and try again."
            ),
            GuideError::ConnectionFailed { service, .. } => format!(
                "Unable to reach the {}. Please check the connection and try again.",
                service.to_string().to_lowercase()
            ),
            GuideError::Timeout { service } => {
                format!("{service} took too long to answer. Please try again.")
            }
            GuideError::Unknown { message, .. } => {
                format!("Something went wrong: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::NOT_FOUND, ErrorKind::NotFound)]
    #[case(StatusCode::TOO_MANY_REQUESTS, ErrorKind::RateLimited)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Unknown)]
    #[case(StatusCode::FORBIDDEN, ErrorKind::Unknown)]
    fn test_status_classification(#[case] status: StatusCode, #[case] expected: ErrorKind) {
        let err = GuideError::from_status(Service::Completion, status, "model x", "body");
        assert_eq!(err.kind(), expected);
        assert_eq!(err.service(), Service::Completion);
    }

    #[test]
    fn test_unknown_keeps_raw_body() {
        let err = GuideError::from_status(
            Service::Search,
            StatusCode::BAD_GATEWAY,
            "blog search",
            " upstream exploded \n",
        );
        assert!(err.user_message().contains("upstream exploded"));
        assert!(err.user_message().contains("502"));
    }

    #[test]
    fn test_not_found_suggestion() {
        let err = GuideError::from_status(
            Service::Completion,
            StatusCode::NOT_FOUND,
            "model 'gemini-2.5-flash'",
            "",
        )
        .with_suggestion("'gemini-1.5-flash'");
        let message = err.user_message();
        assert!(message.contains("gemini-2.5-flash"));
        assert!(message.contains("gemini-1.5-flash"));
    }

    #[test]
    fn test_suggestion_ignored_for_other_kinds() {
        let err = GuideError::RateLimited {
            service: Service::Completion,
        }
        .with_suggestion("ignored");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.user_message().contains("minute"));
    }

    #[test]
    fn test_unconfigured_names_setting() {
        let err = GuideError::unconfigured(Service::Completion, "completion.api_key");
        assert!(err.user_message().contains("completion.api_key"));
        assert!(err.to_string().contains("AI guide"));
    }
}
