use thiserror::Error;

/// Result type alias for formation operations
pub type Result<T> = std::result::Result<T, FormationError>;

/// Errors that can occur while forming a cluster
#[derive(Error, Debug)]
pub enum FormationError {
    /// HTTP request failed before a status was received
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// The admin API answered with a status the caller cannot proceed on
    #[error("{operation}: expected HTTP {expected}, got {actual}")]
    UnexpectedStatus {
        /// What was being attempted
        operation: String,
        /// Acceptable status code(s)
        expected: String,
        /// Status actually returned
        actual: u16,
    },

    /// A bounded poll never observed the expected status
    #[error("{operation}: no HTTP {expected} after {attempts} attempts (last: {last:?})")]
    RetriesExhausted {
        /// What was being polled
        operation: String,
        /// Status that was awaited
        expected: u16,
        /// Attempts made
        attempts: u32,
        /// Last status seen, if any response arrived at all
        last: Option<u16>,
    },

    /// A triggered restart was never confirmed
    #[error("restart of {host} not observed after {attempts} polls")]
    RestartNotObserved {
        /// Host that was expected to restart
        host: String,
        /// Polls made
        attempts: u32,
    },

    /// No mounted certificate carries this node's name
    #[error("no mounted certificate has CN matching {fqdn}")]
    NoMatchingCertificate {
        /// FQDN that was searched for
        fqdn: String,
    },

    /// Certificate or key material is unusable
    #[error("certificate error: {0}")]
    Certificate(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration is invalid or incomplete
    #[error("configuration error: {0}")]
    Config(String),

    /// A required credential was not supplied
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),

    /// Filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl FormationError {
    /// Build an I/O error tagged with the path involved
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an unexpected-status error
    pub fn unexpected(operation: impl Into<String>, expected: impl Into<String>, actual: u16) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            expected: expected.into(),
            actual,
        }
    }

    /// Returns true if the error came from the network rather than the server
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Timeout(_) | Self::Connection(_)
        )
    }

    /// Returns the HTTP status code involved, if any
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            Self::RetriesExhausted { last, .. } => *last,
            _ => None,
        }
    }
}
