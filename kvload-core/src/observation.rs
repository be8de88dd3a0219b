use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSecondsWithFrac};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// The three operations understood by the target key-value service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Get,
    Put,
    Delete,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [Self::Get, Self::Put, Self::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }

    /// Request path for `key`, relative to the target root.
    pub fn path(&self, key: &str) -> String {
        format!("/{}/{key}", self.as_str())
    }

    /// Whether `status` is a normal answer for this operation.
    ///
    /// A missing key is a valid answer to a read or a delete, and the service answers a put
    /// with either `200 OK` or `201 Created`.
    pub fn expects(&self, status: u16) -> bool {
        match self {
            Self::Get | Self::Delete => status == 200 || status == 404,
            Self::Put => status == 200 || status == 201,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request never produced an HTTP status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connect,
    Timeout,
    Request,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::Timeout => f.write_str("timeout"),
            Self::Request => f.write_str("request"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Status(u16),
    Failed(FailureKind),
}

impl Outcome {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(status) => Some(*status),
            Self::Failed(_) => None,
        }
    }
}

/// A single request as seen by a virtual user.
///
/// Observations are created once by the issuer and never change afterwards; there are no
/// setters.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    operation: OperationKind,
    outcome: Outcome,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    latency: Duration,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

impl Observation {
    pub fn new(
        operation: OperationKind,
        outcome: Outcome,
        latency: Duration,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            operation,
            outcome,
            latency,
            timestamp,
        }
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Network failures and unexpected statuses both count as failed requests.
    pub fn is_failure(&self) -> bool {
        match self.outcome {
            Outcome::Status(status) => !self.operation.expects(status),
            Outcome::Failed(_) => true,
        }
    }
}
