#![warn(clippy::uninlined_format_args)]

pub mod config;
pub mod extractor;
pub mod greedy;
pub mod milp;
pub mod model;
pub mod solver;

pub use config::{BigM, ConfigError, SettlementConfig};
pub use extractor::{TransactionExtractor, verify_settlement};
pub use greedy::GreedySolver;
pub use milp::MilpSolver;
pub use model::{
    ConstraintKind, LinearConstraint, ModelBuildError, Participant, Relation, SettlementModel,
    SettlementModelBuilder, Term, TransferPair, Variable,
};
pub use solver::{
    Assignment, DetachedSolves, MAX_DETACHED_SOLVES, SolveOutcome, Solver, SolverError,
    solve_with_deadline, solve_with_deadline_in,
};
