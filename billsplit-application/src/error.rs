use billsplit_domain::BalanceInconsistency;
use billsplit_settlement::SolverError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Inconsistent(#[from] BalanceInconsistency),
    #[error("No settlement satisfies the model (big_m={big_m})")]
    Infeasible { big_m: f64 },
    #[error(transparent)]
    Solver(#[from] SolverError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    #[error("Epoch {0} does not exist")]
    UnknownEpoch(usize),
    #[error(transparent)]
    Inconsistent(#[from] BalanceInconsistency),
}
