use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("Scenario name must not be empty")]
    EmptyName,

    #[error("Duplicate scenario name `{0}`")]
    DuplicateName(String),

    #[error("No scenarios configured")]
    NoScenarios,
}
