//! Resolver error types.

use thiserror::Error;

/// Errors returned to the routing caller. None of these are retried
/// automatically.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The target namespace is reserved for system components.
    #[error("namespace not allowed: {0}")]
    NamespaceNotAllowed(String),

    /// The function is unknown or the endpoint lookup failed upstream.
    #[error("error looking up \"{function}.{namespace}\": {reason}")]
    Lookup {
        function: String,
        namespace: String,
        reason: String,
    },

    /// The function resolved but exposes no usable addresses.
    #[error("no addresses available for \"{function}.{namespace}\"")]
    NoAddresses { function: String, namespace: String },
}
