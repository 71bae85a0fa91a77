use billsplit_domain::{Balances, Person};
use billsplit_settlement::{
    GreedySolver, MilpSolver, SettlementConfig, SettlementModelBuilder, SolveOutcome, Solver,
    TransactionExtractor, verify_settlement,
};
use proptest::prelude::*;
use std::time::Duration;

const NAMES: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

fn zero_sum_balances(people_count: usize, raw: &[i64]) -> Balances {
    let mut sum = 0i64;
    let mut entries = Vec::with_capacity(people_count);
    for (idx, name) in NAMES[..people_count - 1].iter().enumerate() {
        let balance = raw.get(idx).copied().unwrap_or(0);
        sum += balance;
        entries.push((Person::new(name), balance as f64));
    }
    entries.push((Person::new(NAMES[people_count - 1]), -sum as f64));
    entries.into_iter().collect()
}

fn check_solver(solver: &dyn Solver, balances: &Balances) -> Result<(), TestCaseError> {
    let config = SettlementConfig::default();
    let model = match SettlementModelBuilder::new(&config).build(balances) {
        Ok(model) => model,
        Err(_) => {
            prop_assert!(balances.is_settled(config.eps_sum));
            return Ok(());
        }
    };

    let assignment = match solver.solve(&model, Duration::from_secs(30)) {
        SolveOutcome::Optimal(assignment) | SolveOutcome::Feasible(assignment) => assignment,
        other => return Err(TestCaseError::fail(format!("unexpected outcome {other:?}"))),
    };
    let transactions = TransactionExtractor::from_config(&config)
        .extract(&model, &assignment)
        .map_err(|err| TestCaseError::fail(err.to_string()))?;

    prop_assert!(transactions.len() <= model.transaction_bound());
    for transaction in &transactions {
        prop_assert!(transaction.amount > 0.0);
        prop_assert_ne!(&transaction.from, &transaction.to);
    }
    prop_assert!(verify_settlement(balances, &transactions, config.verification_tolerance() + model.residue()).is_ok());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn milp_settles_within_bound(
        people_count in 2usize..=5,
        raw in prop::collection::vec(-200i64..=200, 1..=4),
    ) {
        let balances = zero_sum_balances(people_count, &raw);
        check_solver(&MilpSolver, &balances)?;
    }

    #[test]
    fn greedy_settles_within_bound(
        people_count in 2usize..=6,
        raw in prop::collection::vec(-200i64..=200, 1..=5),
    ) {
        let balances = zero_sum_balances(people_count, &raw);
        check_solver(&GreedySolver, &balances)?;
    }
}
