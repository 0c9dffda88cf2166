use thiserror::Error;

/// Acquisition failures. Both are fatal to the call attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("permission to capture {0} was denied")]
    PermissionDenied(String),
    #[error("no capture device available: {0}")]
    DeviceUnavailable(String),
}
