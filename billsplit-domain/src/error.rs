use crate::model::Person;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Person '{name}' is already on the roster")]
    DuplicateName { name: Person },
    #[error("Person name must not be empty")]
    InvalidName,
    #[error("Invalid expense: {0}")]
    InvalidExpense(#[from] InvalidExpense),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidExpense {
    #[error("amount must be positive and finite (found {0})")]
    NonPositiveAmount(f64),
    #[error("payer '{0}' is not on the roster")]
    UnknownPayer(String),
    #[error("participant '{0}' is not on the roster")]
    UnknownParticipant(String),
    #[error("payer '{0}' cannot be listed as a participant")]
    SelfParticipation(String),
    #[error("participant '{0}' is listed more than once")]
    DuplicateParticipant(String),
}

/// Raised when computed balances do not sum to zero.
///
/// This is a logic or floating-point defect, never an input error, and must
/// abort any settlement built on top of the balances.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("Sum of balances must be zero (found {total}, tolerance {tolerance})")]
pub struct BalanceInconsistency {
    pub total: f64,
    pub tolerance: f64,
}
