use hyper::http;
use std::{fmt, io};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Store {
    WriteModel,
    ReadModel,
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Store::WriteModel => write!(f, "write-model"),
            Store::ReadModel => write!(f, "read-model"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Open,
    Rollback,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Open => write!(f, "open"),
            Phase::Rollback => write!(f, "rollback"),
        }
    }
}

/// A backing store refused to open or roll back a scenario transaction.
#[derive(Debug, Error)]
#[error("{store} store failed to {phase} the scenario transaction: {source}")]
pub struct StoreFailure {
    pub store: Store,
    pub phase: Phase,
    pub source: BoxError,
}

/// What an assertion step was comparing when it failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Subject {
    StatusCode,
    Body,
    JsonShape,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::StatusCode => write!(f, "status code"),
            Subject::Body => write!(f, "response body"),
            Subject::JsonShape => write!(f, "response JSON shape"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Expected body couldn't be parsed to JSON: {0}")]
    MalformedExpectedBody(#[source] serde_json::Error),
    #[error("Response body couldn't be parsed to JSON: {0}")]
    MalformedActualBody(#[source] serde_json::Error),
    #[error("No response has been captured yet, call the API before asserting on the response")]
    NoResponseCaptured,
    #[error("{subject} mismatch.\nExpected: {expected}\nActual: {actual}")]
    AssertionMismatch {
        subject: Subject,
        expected: String,
        actual: String,
    },
    #[error("Sandbox setup failed: {}", join_failures(.0))]
    SandboxSetup(Vec<StoreFailure>),
    #[error("Sandbox teardown failed: {}", join_failures(.0))]
    SandboxTeardown(Vec<StoreFailure>),
    #[error("The sandbox has no open scenario")]
    SandboxNotActive,
    #[error("The sandbox already has an open scenario")]
    SandboxAlreadyActive,
    #[error("The scenario context hasn't been configured with a {0}")]
    NotConfigured(&'static str),
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("Invalid header name")]
    InvalidHeaderName,
    #[error("Invalid header value")]
    InvalidHeaderValue,
    #[error("Invalid response pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Http error: {0}")]
    Http(#[from] http::Error),
    #[error("Hyper error: {0}")]
    Hyper(#[from] hyper::Error),
    #[error("Dispatch pipeline error: {0}")]
    Dispatch(BoxError),
    #[error("IoError: {0}")]
    Io(#[from] io::Error),
    #[error("Undefined step: {0}")]
    UndefinedStep(String),
    #[error("Step \"{0}\" requires a doc string")]
    MissingDocString(String),
    #[error("Invalid feature at line {line}: {reason}")]
    InvalidFeature { line: usize, reason: String },
}

impl Error {
    /// Sandbox failures break isolation for every scenario that follows, so they abort the run
    /// instead of failing a single scenario.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::SandboxSetup(_) | Error::SandboxTeardown(_))
    }

    pub(crate) fn mismatch<E: ToString, A: ToString>(
        subject: Subject,
        expected: E,
        actual: A,
    ) -> Self {
        Error::AssertionMismatch {
            subject,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

fn join_failures(failures: &[StoreFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}
