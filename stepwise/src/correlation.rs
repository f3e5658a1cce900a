use std::fmt::{self, Debug, Display};
use uuid::Uuid;

/// Opaque token tying a scenario's HTTP calls to its read-model transaction scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn human_readable(&self) -> &str {
        &self.0
    }
}

impl Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait IdGenerator: Debug {
    fn generate(&self) -> CorrelationId;
}

#[derive(Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> CorrelationId {
        CorrelationId(Uuid::new_v4().hyphenated().to_string())
    }
}
