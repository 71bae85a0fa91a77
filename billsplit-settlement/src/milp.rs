use crate::{
    model::{Relation, SettlementModel, Variable as ModelVariable},
    solver::{Assignment, SolveOutcome, Solver, SolverError, solve_with_deadline},
};
use good_lp::{
    Expression, ResolutionError, Solution, SolverModel, Variable, default_solver, variable,
    variables,
};
use std::time::Duration;

/// Exact backend: translates the model into a `good_lp` problem and solves it
/// with the default MILP solver.
#[derive(Clone, Copy, Debug, Default)]
pub struct MilpSolver;

impl Solver for MilpSolver {
    fn name(&self) -> &'static str {
        "milp"
    }

    fn solve(&self, model: &SettlementModel, timeout: Duration) -> SolveOutcome {
        solve_with_deadline(model, timeout, solve_blocking)
    }
}

fn solve_blocking(model: &SettlementModel) -> SolveOutcome {
    let pair_count = model.pairs().len();
    let mut vars = variables!();

    let mut active: Vec<Variable> = Vec::with_capacity(pair_count);
    let mut amount: Vec<Variable> = Vec::with_capacity(pair_count);
    for _ in 0..pair_count {
        active.push(vars.add(variable().binary()));
        amount.push(vars.add(variable().min(0.0)));
    }

    let mut objective = Expression::with_capacity(pair_count);
    for term in model.objective() {
        objective.add_mul(term.coefficient, lookup(&active, &amount, term.variable));
    }

    let mut problem = vars.minimise(objective).using(default_solver);
    #[cfg(feature = "coin_cbc")]
    problem.set_parameter("log", "0");

    for constraint in model.constraints() {
        let mut lhs = Expression::with_capacity(constraint.terms.len());
        for term in &constraint.terms {
            lhs.add_mul(term.coefficient, lookup(&active, &amount, term.variable));
        }
        problem = problem.with(match constraint.relation {
            Relation::Eq => lhs.eq(constraint.rhs),
            Relation::Leq => lhs.leq(constraint.rhs),
            Relation::Geq => lhs.geq(constraint.rhs),
        });
    }

    tracing::debug!(
        pair_count,
        constraint_count = model.constraints().len(),
        "MILP solve started"
    );

    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => return SolveOutcome::Infeasible,
        Err(err) => return SolveOutcome::Failed(SolverError::Backend(err.to_string())),
    };

    let assignment = Assignment::new(
        active.iter().map(|&var| solution.value(var)).collect(),
        amount.iter().map(|&var| solution.value(var)).collect(),
    );
    tracing::debug!(
        active_pairs = (0..pair_count).filter(|&idx| assignment.active(idx) >= 0.5).count(),
        "MILP solve finished"
    );
    SolveOutcome::Optimal(assignment)
}

fn lookup(active: &[Variable], amount: &[Variable], variable: ModelVariable) -> Variable {
    match variable {
        ModelVariable::Active(pair) => active[pair],
        ModelVariable::Amount(pair) => amount[pair],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BigM, SettlementConfig, SettlementModelBuilder, TransactionExtractor, verify_settlement,
    };
    use billsplit_domain::{Balances, Person, Transaction};
    use rstest::rstest;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn balances(entries: &[(&str, f64)]) -> Balances {
        entries
            .iter()
            .map(|(name, balance)| (Person::new(name), *balance))
            .collect()
    }

    fn settle(config: &SettlementConfig, entries: &[(&str, f64)]) -> Vec<Transaction> {
        let model = SettlementModelBuilder::new(config)
            .build(&balances(entries))
            .expect("model");
        let SolveOutcome::Optimal(assignment) = MilpSolver.solve(&model, TIMEOUT) else {
            panic!("expected optimal outcome");
        };
        TransactionExtractor::from_config(config)
            .extract(&model, &assignment)
            .expect("transactions")
    }

    fn summary(transactions: &[Transaction]) -> Vec<(&str, &str, f64)> {
        transactions
            .iter()
            .map(|t| (t.from.as_str(), t.to.as_str(), (t.amount * 1e6).round() / 1e6))
            .collect()
    }

    #[rstest]
    #[case::two_people(&[("A", 25.0), ("B", -25.0)], vec![("B", "A", 25.0)])]
    #[case::one_creditor(
        &[("A", 60.0), ("B", -30.0), ("C", -30.0)],
        vec![("B", "A", 30.0), ("C", "A", 30.0)]
    )]
    #[case::one_debtor(
        &[("A", -80.0), ("B", 50.0), ("C", 30.0)],
        vec![("A", "B", 50.0), ("A", "C", 30.0)]
    )]
    #[case::matching_pairs_beat_greedy(
        &[("D1", -3.0), ("D2", -7.0), ("C1", 7.0), ("C2", 3.0)],
        vec![("D1", "C2", 3.0), ("D2", "C1", 7.0)]
    )]
    fn finds_minimal_settlement(
        #[case] entries: &[(&str, f64)],
        #[case] expected: Vec<(&str, &str, f64)>,
    ) {
        let transactions = settle(&SettlementConfig::default(), entries);
        assert_eq!(summary(&transactions), expected);
    }

    #[test]
    fn millions_settle_to_the_cent() {
        let config = SettlementConfig::default();
        let entries = [
            ("A", 3_703_703.67),
            ("B", -617_283.945),
            ("C", -1_851_851.835),
            ("D", -1_234_567.89),
        ];
        let transactions = settle(&config, &entries);

        assert_eq!(transactions.len(), 3);
        assert!(transactions.iter().all(|t| t.to.as_str() == "A"));
        verify_settlement(
            &balances(&entries),
            &transactions,
            config.verification_tolerance(),
        )
        .expect("transfers reproduce the balances");
    }

    #[test]
    fn undersized_big_m_is_infeasible() {
        let config = SettlementConfig {
            big_m: BigM::Fixed(10.0),
            ..SettlementConfig::default()
        };
        let model = SettlementModelBuilder::new(&config)
            .build(&balances(&[("A", 60.0), ("B", -60.0)]))
            .expect("model");

        assert_eq!(MilpSolver.solve(&model, TIMEOUT), SolveOutcome::Infeasible);
        assert!(matches!(
            MilpSolver.solve(&model.with_big_m(100.0), TIMEOUT),
            SolveOutcome::Optimal(_)
        ));
    }
}
