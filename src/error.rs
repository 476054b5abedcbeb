//! Error types for subscription operations.

use crate::types::{ChannelSubscriptionId, RuleViolation, SubscriptionId};
use thiserror::Error;

/// Main error type for subscribe/unsubscribe operations.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Syntax error: {0}")]
    Syntax(#[from] async_graphql_parser::Error),

    /// The document failed schema validation. The message is deliberately
    /// generic; the individual rule violations are kept in `violations`.
    #[error("There was a problem with your subscription")]
    Validation { violations: Vec<RuleViolation> },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Operation name required when the document has several operations")]
    OperationNameRequired,

    #[error("Expected a subscription operation, got {0}")]
    NotASubscription(&'static str),

    #[error("Subscription has no root field")]
    NoRootField,

    #[error("Subscription must select exactly one root field, got: {}", .0.join(", "))]
    MultipleRootFields(Vec<String>),

    #[error("Invalid value for argument {argument}: {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("Setup function for {0} returned no triggers")]
    NoTriggers(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    #[error("Channel subscription not found: {0}")]
    ChannelSubscriptionNotFound(ChannelSubscriptionId),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl SubscriptionError {
    pub(crate) fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        SubscriptionError::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised while executing a document for a published event.
///
/// Never returned to the publisher; it is handed to the subscription's
/// callback instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Execution failed: {message}")]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type for subscription operations.
pub type Result<T> = std::result::Result<T, SubscriptionError>;
