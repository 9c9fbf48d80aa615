//! Small shared helpers.

use pitlane_types::{AppError, ErrorKind};

/// Map a reqwest failure into the taxonomy.
///
/// Typed mapping first (timeout/connect); anything else goes through the
/// substring classifier as a last resort.
pub(crate) fn map_http_err(context: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::new(ErrorKind::Timeout, format!("{context}: request timed out"))
    } else if err.is_connect() {
        AppError::new(ErrorKind::NetworkError, format!("{context}: {err}"))
    } else {
        AppError::from_unclassified(format!("{context}: {err}"))
    }
}

/// Random 8-char alphanumeric id tagging one request's logs and errors.
pub(crate) fn generate_trace_id() -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

/// Random 32-char alphanumeric session or state token.
pub(crate) fn generate_token() -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
