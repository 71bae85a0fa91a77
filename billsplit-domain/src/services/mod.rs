pub mod balance_calculator;

pub use balance_calculator::{BalanceCalculator, DEFAULT_EPS_SUM};
