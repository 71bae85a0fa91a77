use crate::error::SettlementError;
use billsplit_domain::{BalanceCalculator, Balances, Ledger, Transaction};
use billsplit_settlement::{
    Assignment, ConfigError, ModelBuildError, SettlementConfig, SettlementModel,
    SettlementModelBuilder, SolveOutcome, Solver, SolverError, TransactionExtractor,
    verify_settlement,
};

/// Runs one settlement request: balances, model, solve, extraction.
///
/// The ledger is only borrowed, so nothing can mutate it while a request is
/// in flight.
#[derive(Clone, Copy)]
pub struct SettlementService<'a> {
    solver: &'a dyn Solver,
    config: SettlementConfig,
    calculator: BalanceCalculator,
}

impl<'a> SettlementService<'a> {
    pub fn new(solver: &'a dyn Solver, config: SettlementConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            solver,
            config,
            calculator: BalanceCalculator::new(config.eps_sum),
        })
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub fn calculator(&self) -> BalanceCalculator {
        self.calculator
    }

    pub fn settle(&self, ledger: &Ledger) -> Result<Vec<Transaction>, SettlementError> {
        let balances = self.calculator.compute(ledger)?;
        self.settle_balances(&balances)
    }

    /// Settles a balance snapshot. All-or-nothing: any failure yields no transactions.
    pub fn settle_balances(&self, balances: &Balances) -> Result<Vec<Transaction>, SettlementError> {
        let model = match SettlementModelBuilder::new(&self.config).build(balances) {
            Ok(model) => model,
            Err(ModelBuildError::Empty) => {
                tracing::debug!(
                    member_count = balances.len(),
                    "Balances already settled; skipping solve"
                );
                return Ok(Vec::new());
            }
        };

        let assignment = match self.solve(&model) {
            Err(SettlementError::Infeasible { big_m }) => {
                let Some(factor) = self.config.big_m_retry_factor else {
                    return Err(SettlementError::Infeasible { big_m });
                };
                let enlarged = model.with_big_m(big_m * factor);
                tracing::warn!(
                    previous_big_m = big_m,
                    big_m = enlarged.big_m(),
                    "Settlement model infeasible; retrying once with enlarged big-M"
                );
                self.solve(&enlarged)?
            }
            other => other?,
        };

        let transactions =
            TransactionExtractor::from_config(&self.config).extract(&model, &assignment)?;
        verify_settlement(
            balances,
            &transactions,
            self.config.verification_tolerance() + model.residue(),
        )?;

        if transactions.len() > model.transaction_bound() {
            tracing::warn!(
                transaction_count = transactions.len(),
                bound = model.transaction_bound(),
                solver = self.solver.name(),
                "Settlement uses more transfers than a spanning settlement needs"
            );
        }
        tracing::info!(
            participant_count = model.participants().len(),
            transaction_count = transactions.len(),
            solver = self.solver.name(),
            "Settlement computed"
        );
        Ok(transactions)
    }

    fn solve(&self, model: &SettlementModel) -> Result<Assignment, SettlementError> {
        tracing::debug!(
            solver = self.solver.name(),
            timeout = ?self.config.solve_timeout,
            big_m = model.big_m(),
            "Settlement solve started"
        );
        match self.solver.solve(model, self.config.solve_timeout) {
            SolveOutcome::Optimal(assignment) => Ok(assignment),
            SolveOutcome::Feasible(assignment) => {
                if model.is_satisfied_by(&assignment, model.tolerance()) {
                    Ok(assignment)
                } else {
                    tracing::warn!(
                        solver = self.solver.name(),
                        "Heuristic assignment violates the settlement model"
                    );
                    Err(SolverError::Numerical(format!(
                        "{} returned an assignment that violates the model",
                        self.solver.name()
                    ))
                    .into())
                }
            }
            SolveOutcome::Infeasible => Err(SettlementError::Infeasible {
                big_m: model.big_m(),
            }),
            SolveOutcome::Failed(err) => Err(err.into()),
        }
    }
}
