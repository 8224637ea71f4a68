use std::fmt::Display;

use fluentd_common::errors::FluentdServiceError;
use http::StatusCode;

#[derive(Debug)]
pub enum FluentdPatchError {
    /// The AdmissionReview could not be understood, nothing can be echoed back.
    MalformedRequest(FluentdServiceError),
    /// The patch or the response carrying it could not be serialized.
    InvalidPatch(FluentdServiceError),
}

impl FluentdPatchError {
    pub fn malformed<E: Display>(prefix: &str) -> impl Fn(E) -> Self + '_ {
        move |e: E| {
            FluentdPatchError::MalformedRequest(FluentdServiceError::from_error(prefix)(e))
        }
    }

    pub fn invalid_patch<E: Display>(prefix: &str) -> impl Fn(E) -> Self + '_ {
        move |e: E| FluentdPatchError::InvalidPatch(FluentdServiceError::from_error(prefix)(e))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            FluentdPatchError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            FluentdPatchError::InvalidPatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for FluentdPatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FluentdPatchError::MalformedRequest(e) => write!(f, "Malformed request: {}", e),
            FluentdPatchError::InvalidPatch(e) => write!(f, "Invalid patch: {}", e),
        }
    }
}

impl From<FluentdServiceError> for FluentdPatchError {
    fn from(e: FluentdServiceError) -> Self {
        FluentdPatchError::InvalidPatch(e)
    }
}
