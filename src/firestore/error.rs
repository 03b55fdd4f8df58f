use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FirestoreErrorCode {
    InvalidArgument,
    MissingProjectId,
    Internal,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    Unauthenticated,
    Unavailable,
    DeadlineExceeded,
    ResourceExhausted,
    Cancelled,
    UnknownFieldType,
}

impl FirestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirestoreErrorCode::InvalidArgument => "firestore/invalid-argument",
            FirestoreErrorCode::MissingProjectId => "firestore/missing-project-id",
            FirestoreErrorCode::Internal => "firestore/internal",
            FirestoreErrorCode::NotFound => "firestore/not-found",
            FirestoreErrorCode::AlreadyExists => "firestore/already-exists",
            FirestoreErrorCode::PermissionDenied => "firestore/permission-denied",
            FirestoreErrorCode::Unauthenticated => "firestore/unauthenticated",
            FirestoreErrorCode::Unavailable => "firestore/unavailable",
            FirestoreErrorCode::DeadlineExceeded => "firestore/deadline-exceeded",
            FirestoreErrorCode::ResourceExhausted => "firestore/resource-exhausted",
            FirestoreErrorCode::Cancelled => "firestore/cancelled",
            FirestoreErrorCode::UnknownFieldType => "firestore/unknown-field-type",
        }
    }

    /// The `google.rpc.Code` carried in per-write statuses.
    pub fn rpc_code(&self) -> i32 {
        match self {
            FirestoreErrorCode::Cancelled => 1,
            FirestoreErrorCode::InvalidArgument | FirestoreErrorCode::MissingProjectId => 3,
            FirestoreErrorCode::DeadlineExceeded => 4,
            FirestoreErrorCode::NotFound => 5,
            FirestoreErrorCode::AlreadyExists => 6,
            FirestoreErrorCode::PermissionDenied => 7,
            FirestoreErrorCode::ResourceExhausted => 8,
            FirestoreErrorCode::Internal | FirestoreErrorCode::UnknownFieldType => 13,
            FirestoreErrorCode::Unavailable => 14,
            FirestoreErrorCode::Unauthenticated => 16,
        }
    }
}

/// Whole-word message fragments that identify network-layer failures.
static TRANSIENT_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(econnreset|connection reset|etimedout|timed out|timeouts?|socket hang up|broken pipe|epipe|connection closed before message completed|tls|ssl)\b",
    )
    .expect("transient message pattern compiles")
});

#[derive(Clone, Debug)]
pub struct FirestoreError {
    pub code: FirestoreErrorCode,
    message: String,
}

impl FirestoreError {
    pub fn new(code: FirestoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` when the failure happened at the network layer and is
    /// likely to succeed if the same request is issued again.
    ///
    /// Classification looks at the error kind and at the message text, since
    /// transport errors reach us wrapped in `Internal` with the underlying
    /// I/O description.
    pub fn is_transient(&self) -> bool {
        if matches!(
            self.code,
            FirestoreErrorCode::Unavailable | FirestoreErrorCode::DeadlineExceeded
        ) {
            return true;
        }
        if self.code != FirestoreErrorCode::Internal {
            return false;
        }
        TRANSIENT_MESSAGE.is_match(&self.message)
    }

    /// Returns `true` for failures that make every further request of the
    /// current operation pointless (credentials, permissions, exhausted quota).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.code,
            FirestoreErrorCode::Unauthenticated
                | FirestoreErrorCode::PermissionDenied
                | FirestoreErrorCode::ResourceExhausted
                | FirestoreErrorCode::MissingProjectId
        )
    }
}

impl Display for FirestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for FirestoreError {}

pub type FirestoreResult<T> = Result<T, FirestoreError>;

pub fn invalid_argument(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidArgument, message)
}

pub fn missing_project_id() -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::MissingProjectId,
        "A project id is required to reach Firestore",
    )
}

pub fn internal_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Internal, message)
}

pub fn not_found(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::NotFound, message)
}

pub fn already_exists(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::AlreadyExists, message)
}

pub fn permission_denied(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::PermissionDenied, message)
}

pub fn unauthenticated(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Unauthenticated, message)
}

pub fn unavailable(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Unavailable, message)
}

pub fn deadline_exceeded(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::DeadlineExceeded, message)
}

pub fn resource_exhausted(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::ResourceExhausted, message)
}

pub fn cancelled(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Cancelled, message)
}

pub fn unknown_field_type(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::UnknownFieldType, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_and_deadline_are_transient() {
        assert!(unavailable("backend down").is_transient());
        assert!(deadline_exceeded("slow").is_transient());
    }

    #[test]
    fn transport_messages_are_transient() {
        assert!(internal_error("read ECONNRESET").is_transient());
        assert!(internal_error("error trying to connect: TLS handshake eof").is_transient());
        assert!(internal_error("socket hang up").is_transient());
        assert!(!internal_error("unexpected payload").is_transient());
        assert!(internal_error("request Timeout after 60s").is_transient());
        assert!(internal_error("SSL routines: wrong version number").is_transient());
    }

    #[test]
    fn markers_inside_other_words_do_not_count() {
        assert!(!internal_error("invalid field 'settlsSsl' in mapValue").is_transient());
        assert!(!internal_error("document too large: 'subtlsettings' exceeds limit").is_transient());
        assert!(!internal_error("unknown field 'sslKey'").is_transient());
    }

    #[test]
    fn non_network_codes_are_never_transient() {
        assert!(!invalid_argument("request timed out").is_transient());
        assert!(!permission_denied("denied").is_transient());
    }

    #[test]
    fn auth_and_quota_are_fatal() {
        assert!(unauthenticated("expired").is_fatal());
        assert!(permission_denied("nope").is_fatal());
        assert!(resource_exhausted("quota").is_fatal());
        assert!(!not_found("gone").is_fatal());
    }
}
