//! # Error Types
//!
//! Domain errors for the network model. Field-level validation failures are
//! collected separately in [`crate::FieldErrors`] so a caller sees every bad
//! field in one response.

use thiserror::Error;

use crate::identity::NodeId;

/// A debt amount that violates the money rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebtError {
    /// Debt can never drop below zero.
    #[error("debt must be greater than or equal to 0.00, got {0}")]
    Negative(String),

    /// At most two digits after the decimal point.
    #[error("debt must have no more than 2 decimal places, got {0}")]
    TooManyDecimalPlaces(String),

    /// At most 15 digits in total (13 before the decimal point).
    #[error("debt must have no more than 15 digits in total, got {0}")]
    TooManyDigits(String),

    /// The value could not be read as a decimal number.
    #[error("debt must be a valid decimal number, got {0:?}")]
    NotANumber(String),
}

/// Failure while walking the supplier graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// The supplier chain starting at `start` revisits `repeated`.
    #[error("supplier cycle detected starting at node {start} (node {repeated} visited twice)")]
    Cycle {
        /// Node whose level was requested.
        start: NodeId,
        /// First node seen a second time.
        repeated: NodeId,
    },

    /// A node id that is not part of the index.
    #[error("node {0} is not part of the supplier index")]
    UnknownNode(NodeId),
}
