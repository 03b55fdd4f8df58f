use reqwest::StatusCode;
use serde::Deserialize;

use crate::firestore::error::{
    already_exists, cancelled, deadline_exceeded, internal_error, invalid_argument, not_found, permission_denied,
    resource_exhausted, unauthenticated, unavailable, FirestoreError,
};

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Maps a non-success HTTP response to a [`FirestoreError`].
///
/// The `status` string of a Google error body wins over the HTTP status when
/// both are present.
pub fn map_http_error(status: StatusCode, body: &str) -> FirestoreError {
    let payload = extract_error_payload(body);
    let message = payload
        .as_ref()
        .and_then(|payload| payload.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("HTTP error")
                .to_string()
        });

    if let Some(status_string) = payload.as_ref().and_then(|payload| payload.status.as_deref()) {
        if let Some(error) = map_status_string(status_string, &message) {
            return error;
        }
    }

    match status {
        StatusCode::BAD_REQUEST => invalid_argument(message),
        StatusCode::UNAUTHORIZED => unauthenticated(message),
        StatusCode::FORBIDDEN => permission_denied(message),
        StatusCode::NOT_FOUND => not_found(message),
        StatusCode::CONFLICT => already_exists(message),
        StatusCode::TOO_MANY_REQUESTS => resource_exhausted(message),
        StatusCode::SERVICE_UNAVAILABLE => unavailable(message),
        StatusCode::BAD_GATEWAY => unavailable(message),
        StatusCode::GATEWAY_TIMEOUT => deadline_exceeded(message),
        StatusCode::REQUEST_TIMEOUT => deadline_exceeded(message),
        StatusCode::PRECONDITION_FAILED => invalid_argument(message),
        StatusCode::PAYLOAD_TOO_LARGE => invalid_argument(message),
        status if status.is_client_error() => invalid_argument(message),
        _ => internal_error(message),
    }
}

fn map_status_string(status: &str, message: &str) -> Option<FirestoreError> {
    let message = message.to_string();
    let error = match status {
        "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "OUT_OF_RANGE" => invalid_argument(message),
        "UNAUTHENTICATED" => unauthenticated(message),
        "PERMISSION_DENIED" => permission_denied(message),
        "NOT_FOUND" => not_found(message),
        "ALREADY_EXISTS" | "ABORTED" => already_exists(message),
        "RESOURCE_EXHAUSTED" => resource_exhausted(message),
        "CANCELLED" => cancelled(message),
        "DATA_LOSS" | "UNKNOWN" | "INTERNAL" | "UNIMPLEMENTED" => internal_error(message),
        "UNAVAILABLE" => unavailable(message),
        "DEADLINE_EXCEEDED" => deadline_exceeded(message),
        _ => return None,
    };
    Some(error)
}

/// Maps a numeric `google.rpc.Code`, as found in per-write statuses of a
/// `batchWrite` response. Returns `None` for `OK` (0).
pub fn map_rpc_code(code: i32, message: &str) -> Option<FirestoreError> {
    let message = message.to_string();
    let error = match code {
        0 => return None,
        1 => cancelled(message),
        3 | 9 | 11 => invalid_argument(message),
        4 => deadline_exceeded(message),
        5 => not_found(message),
        6 | 10 => already_exists(message),
        7 => permission_denied(message),
        8 => resource_exhausted(message),
        14 => unavailable(message),
        16 => unauthenticated(message),
        _ => internal_error(message),
    };
    Some(error)
}

fn extract_error_payload(body: &str) -> Option<GoogleError> {
    serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::error::FirestoreErrorCode;

    #[test]
    fn status_string_takes_precedence() {
        let body = r#"{"error":{"code":400,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = map_http_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, FirestoreErrorCode::ResourceExhausted);
        assert_eq!(err.message(), "quota");
    }

    #[test]
    fn falls_back_to_http_status() {
        let err = map_http_error(StatusCode::CONFLICT, "not json");
        assert_eq!(err.code, FirestoreErrorCode::AlreadyExists);
        assert_eq!(err.message(), "Conflict");

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(err.is_transient());
    }

    #[test]
    fn maps_numeric_rpc_codes() {
        assert!(map_rpc_code(0, "").is_none());
        assert_eq!(
            map_rpc_code(7, "denied").map(|err| err.code),
            Some(FirestoreErrorCode::PermissionDenied)
        );
        assert_eq!(
            map_rpc_code(14, "down").map(|err| err.code),
            Some(FirestoreErrorCode::Unavailable)
        );
    }
}
