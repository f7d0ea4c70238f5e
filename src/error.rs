//! Error taxonomy shared by the runner, parsers, normalizer and backend client.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HealthError>;

#[derive(Debug, Error)]
pub enum HealthError {
    /// Binary missing, spawn I/O failure, or non-zero exit. `code` is `None`
    /// when the process never ran or was killed by a signal.
    #[error("{program} failed (exit code {code:?}): {output}")]
    ProcessExecutionFailed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("invalid probe argument: {0}")]
    InvalidArgument(String),

    #[error("{program} did not finish within {timeout:?}")]
    ProcessTimeout { program: String, timeout: Duration },

    #[error("could not parse {tool} output ({hint}):\n{raw}")]
    ParseFailure {
        tool: &'static str,
        hint: String,
        raw: String,
    },

    #[error("no descriptor registered for metric `{0}`")]
    UnknownMetric(String),

    #[error("metric `{metric}` has non-numeric value `{value}`")]
    InvalidMetricValue { metric: String, value: String },

    #[error("credential validation failed with status {status}: {reason}")]
    AuthenticationFailed { status: u16, reason: String },

    #[error("metrics client has not validated its credentials")]
    NotAuthenticated,

    #[error("metric submission failed with status {status}: {reason}")]
    SubmissionFailed { status: u16, reason: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
