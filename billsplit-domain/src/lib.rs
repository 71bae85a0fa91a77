#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod ledger;
pub mod model;
pub mod services;

pub use error::{BalanceInconsistency, InvalidExpense, LedgerError};
pub use ledger::Ledger;
pub use model::{Balances, Expense, ExpenseLog, HistoryEpoch, Person, Sequence, Transaction};
pub use services::{BalanceCalculator, DEFAULT_EPS_SUM};
