//! Shared primitives used across FrameGuard crates.

use core::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Result alias used across the workspace.
pub type EmbedResult<T> = Result<T, EmbedError>;

/// Error type for precondition and storage failures.
///
/// Load failures of the embedded document itself are never modeled as
/// errors; those are state transitions owned by the frame loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedError {
    pub code: &'static str,
    pub message: String,
}

impl EmbedError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for EmbedError {}

/// Current wall-clock time in unix milliseconds.
///
/// Loader and host methods take explicit `now_ms` values; production
/// callers feed them from here so tests can supply fixed stamps.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::EmbedError;
    use super::unix_millis;

    #[test]
    fn error_display_includes_code_and_message() {
        let error = EmbedError::new("frame.source_missing", "embed source is empty");
        assert_eq!(
            error.to_string(),
            "frame.source_missing: embed source is empty"
        );
    }

    #[test]
    fn unix_millis_is_monotonic_enough_for_stamps() {
        let first = unix_millis();
        let second = unix_millis();
        assert!(second >= first);
    }
}
