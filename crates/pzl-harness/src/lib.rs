#![forbid(unsafe_code)]

pub mod bind;
pub mod candidate;
pub mod case;
pub mod dispatch;
pub mod driver;
pub mod wire;

pub use bind::{Bound, Returned, bind_arguments, convert_output};
pub use candidate::{Candidate, Invocation, InvocationResult, NativeCandidate, StatefulObject};
pub use case::{ProblemSignature, TestCase, Verdict, positional_args};
pub use dispatch::{CaseReport, Dispatcher, FixtureError, PreparedCall, Stage};
pub use driver::{Language, ProcessCandidate};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// The test case cannot be bound to the entry point's argument shapes.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// The candidate raised, exited non-zero, or produced unusable output.
    #[error("invocation failed: {0}")]
    Invocation(String),
    #[error("timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    /// The harness itself is misconfigured for this entry point.
    #[error("harness config: {0}")]
    HarnessConfig(String),
}

impl HarnessError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::Invocation(_) => ErrorKind::Invocation,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::HarnessConfig(_) => ErrorKind::HarnessConfig,
        }
    }

    /// Malformed fixtures and harness misconfiguration are reported apart
    /// from candidate failures.
    #[must_use]
    pub const fn is_fixture_defect(&self) -> bool {
        matches!(self, Self::MalformedInput(_) | Self::HarnessConfig(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedInput,
    Invocation,
    Timeout,
    HarnessConfig,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed_input",
            Self::Invocation => "invocation",
            Self::Timeout => "timeout",
            Self::HarnessConfig => "harness_config",
        }
    }
}
