//! Error types for the provisioner

use std::time::Duration;

use thiserror::Error;

/// Main error type for provisioner operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Client or kubeconfig configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Invalid request parameters or participant definition
    #[error("validation error: {0}")]
    Validation(String),

    /// Manifest templating or parsing error
    #[error("template error: {0}")]
    Template(String),

    /// Data seeding error against a participant API
    #[error("seed error: {0}")]
    Seed(String),

    /// Backing API call exceeded its deadline
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Message fragments that indicate the Kubernetes API server is unreachable
/// rather than the request being wrong. Matched case-insensitively against
/// the rendered error chain.
const UNAVAILABLE_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "no such host",
    "dns error",
    "failed to lookup address",
    "timeout",
    "timed out",
    "deadline has elapsed",
    "unable to connect",
    "error trying to connect",
    "handshake",
    "network is unreachable",
    "unexpected eof",
    "unexpected end of file",
];

impl Error {
    /// Create a config error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a template error with the given message
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    /// Create a seed error with the given message
    pub fn seed(msg: impl Into<String>) -> Self {
        Self::Seed(msg.into())
    }

    /// Whether this error indicates the Kubernetes API is unavailable.
    ///
    /// Distinguishes transient connectivity failures (connection refused,
    /// DNS failure, timeouts, TLS handshake, truncated streams) from
    /// programming or request errors, so callers can apply retry/backoff or
    /// map to a 503 instead of a 500.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Kube(err) => {
                let msg = render_chain(err).to_lowercase();
                UNAVAILABLE_PATTERNS.iter().any(|p| msg.contains(p))
            }
            _ => false,
        }
    }
}

/// Render an error and its source chain into one string so signature
/// matching sees wrapped hyper/IO causes, not just the outermost message.
fn render_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

/// Whether a Kubernetes API error is a 404 for the requested resource
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(message: &str, code: u16) -> Error {
        Error::Kube(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: String::new(),
            code,
        }))
    }

    #[test]
    fn timeout_is_unavailable() {
        assert!(Error::Timeout(Duration::from_secs(30)).is_unavailable());
    }

    #[test]
    fn connectivity_signatures_are_unavailable() {
        for msg in [
            "dial tcp 10.96.0.1:443: connection refused",
            "read: connection reset by peer",
            "lookup kubernetes.default.svc: no such host",
            "request timed out",
            "context deadline has elapsed",
            "TLS handshake failure",
            "connect: network is unreachable",
            "unexpected EOF during chunked read",
        ] {
            assert!(
                api_error(msg, 500).is_unavailable(),
                "expected unavailable for {:?}",
                msg
            );
        }
    }

    #[test]
    fn request_errors_are_not_unavailable() {
        assert!(!api_error("deployments.apps \"controlplane\" not found", 404).is_unavailable());
        assert!(!api_error("admission webhook denied the request", 400).is_unavailable());
        assert!(!Error::validation("page must be >= 1").is_unavailable());
        assert!(!Error::template("missing apiVersion").is_unavailable());
    }

    #[test]
    fn not_found_detection() {
        let Error::Kube(err) = api_error("not found", 404) else {
            panic!("expected kube error");
        };
        assert!(is_not_found(&err));

        let Error::Kube(err) = api_error("boom", 500) else {
            panic!("expected kube error");
        };
        assert!(!is_not_found(&err));
    }
}
