// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Error type shared by every xyz crate.
///
/// Whole-call failures (bad configuration, malformed input shape) surface as
/// `Err(XyzError)`. Per-item failures are converted into failure records by
/// the engine and never abort a batch.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum XyzError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
}

impl XyzError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    /// Stable machine-readable code for structured error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
        }
    }
}
