#![warn(clippy::uninlined_format_args)]

pub mod bill_split;
pub mod error;
pub mod service;

pub use bill_split::BillSplit;
pub use error::{HistoryError, SettlementError};
pub use service::SettlementService;
