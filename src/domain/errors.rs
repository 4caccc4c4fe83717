//! Domain errors. Used by ports and use cases.
//!
//! Dispatch operations never return these to their caller: local failures are
//! folded into `DeliveryOutcome` values by the orchestrator.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Numbering plan error: {0}")]
    NumberingPlan(String),

    #[error("Console error: {0}")]
    Console(String),
}

/// Raw phone string could not be turned into a dialable international number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not a number: {reason}")]
pub struct NotANumber {
    pub reason: String,
}

impl NotANumber {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Local precondition failures raised while building a provider request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// The provider refuses groups with zero members and its error text is not diagnostic.
    #[error("group must have at least one participant")]
    EmptyParticipantList,

    #[error("message body is empty")]
    EmptyMessageBody,

    #[error("group name is empty")]
    EmptyGroupName,
}
