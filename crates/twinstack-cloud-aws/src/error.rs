//! AWS control-plane errors

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use thiserror::Error;
use twinstack_cloud::CloudError;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("{operation} failed: {message}")]
    Sdk {
        operation: &'static str,
        /// Error code reported by the service, if any
        code: Option<String>,
        message: String,
    },

    #[error("{operation} response is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Invalid request for {operation}: {message}")]
    Build {
        operation: &'static str,
        message: String,
    },
}

impl AwsError {
    /// Service error code (e.g. `InvalidInstanceID.NotFound`)
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::Sdk { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<AwsError> for CloudError {
    fn from(e: AwsError) -> Self {
        CloudError::ApiError(e.to_string())
    }
}

/// Map an SDK error into [`AwsError::Sdk`], keeping the full source chain
pub(crate) fn sdk<E>(operation: &'static str) -> impl FnOnce(E) -> AwsError
where
    E: std::error::Error + ProvideErrorMetadata + 'static,
{
    move |err| AwsError::Sdk {
        operation,
        code: err.code().map(str::to_string),
        message: DisplayErrorContext(&err).to_string(),
    }
}

/// Map a builder validation error
pub(crate) fn build<E: std::fmt::Display>(operation: &'static str) -> impl FnOnce(E) -> AwsError {
    move |err| AwsError::Build {
        operation,
        message: err.to_string(),
    }
}

pub(crate) fn missing(operation: &'static str, field: &'static str) -> AwsError {
    AwsError::MissingField { operation, field }
}

pub type Result<T> = std::result::Result<T, AwsError>;
