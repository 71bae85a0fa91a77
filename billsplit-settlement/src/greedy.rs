use crate::{
    model::{SettlementModel, Variable},
    solver::{Assignment, SolveOutcome, Solver},
};
use std::time::Duration;

/// Heuristic backend that matches debtors to creditors in roster order.
///
/// Each step closes out at least one side, so the result never exceeds
/// `participants - 1` transfers, though it is not always minimal.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedySolver;

impl Solver for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn solve(&self, model: &SettlementModel, _timeout: Duration) -> SolveOutcome {
        let tolerance = model.tolerance();
        let mut debtors: Vec<(usize, f64)> = Vec::new();
        let mut creditors: Vec<(usize, f64)> = Vec::new();
        for idx in 0..model.participants().len() {
            let target = model.target(idx) / model.scale();
            if target < 0.0 {
                debtors.push((idx, -target));
            } else if target > 0.0 {
                creditors.push((idx, target));
            }
        }

        // Every transfer is at least `tolerance`, which is never below eps_min.
        let mut assignment = Assignment::zeroed(model.pairs().len());
        let mut creditor_cursor = 0;
        for (debtor, remaining) in &mut debtors {
            while *remaining >= tolerance && creditor_cursor < creditors.len() {
                let (creditor, available) = &mut creditors[creditor_cursor];
                if *available < tolerance {
                    creditor_cursor += 1;
                    continue;
                }
                let amount = remaining.min(*available);
                let Some(pair) = model.pair_index(*debtor, *creditor) else {
                    return SolveOutcome::Infeasible;
                };
                if amount > model.pair_bound(pair) / model.scale() + tolerance {
                    return SolveOutcome::Infeasible;
                }
                assignment.set(Variable::Active(pair), 1.0);
                assignment.set(Variable::Amount(pair), amount);
                *remaining -= amount;
                *available -= amount;
                if *available < tolerance {
                    creditor_cursor += 1;
                }
            }
        }

        let unsettled = debtors
            .iter()
            .chain(&creditors)
            .any(|(_, remaining)| *remaining >= tolerance);
        if unsettled {
            return SolveOutcome::Infeasible;
        }
        SolveOutcome::Feasible(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BigM, SettlementConfig, SettlementModelBuilder, TransactionExtractor};
    use billsplit_domain::{Balances, Person};
    use rstest::rstest;

    fn model(entries: &[(&str, f64)]) -> SettlementModel {
        let balances: Balances = entries
            .iter()
            .map(|(name, balance)| (Person::new(name), *balance))
            .collect();
        SettlementModelBuilder::new(&SettlementConfig::default())
            .build(&balances)
            .expect("model")
    }

    #[rstest]
    #[case::one_creditor(&[("A", 60.0), ("B", -30.0), ("C", -30.0)], vec![("B", "A", 30.0), ("C", "A", 30.0)])]
    #[case::split_debtor(&[("A", -80.0), ("B", 50.0), ("C", 30.0)], vec![("A", "B", 50.0), ("A", "C", 30.0)])]
    #[case::not_minimal(
        &[("D1", -3.0), ("D2", -7.0), ("C1", 7.0), ("C2", 3.0)],
        vec![("D1", "C1", 3.0), ("D2", "C1", 4.0), ("D2", "C2", 3.0)]
    )]
    fn greedy_matches_in_roster_order(
        #[case] entries: &[(&str, f64)],
        #[case] expected: Vec<(&str, &str, f64)>,
    ) {
        let model = model(entries);
        let SolveOutcome::Feasible(assignment) = GreedySolver.solve(&model, Duration::ZERO) else {
            panic!("expected feasible outcome");
        };
        assert!(model.is_satisfied_by(&assignment, model.tolerance()));

        let transactions = TransactionExtractor::from_config(&SettlementConfig::default())
            .extract(&model, &assignment)
            .expect("transactions");
        let actual: Vec<(&str, &str, f64)> = transactions
            .iter()
            .map(|t| (t.from.as_str(), t.to.as_str(), t.amount))
            .collect();
        assert_eq!(actual, expected);
        assert!(transactions.len() <= model.transaction_bound());
    }

    #[test]
    fn near_equal_balances_never_produce_a_dust_transfer() {
        let model = model(&[("D1", -10.0), ("D2", -5.0), ("C1", 9.999_997), ("C2", 5.000_003)]);
        let SolveOutcome::Feasible(assignment) = GreedySolver.solve(&model, Duration::ZERO) else {
            panic!("expected feasible outcome");
        };
        assert!(model.is_satisfied_by(&assignment, model.tolerance()));

        let transactions = TransactionExtractor::from_config(&SettlementConfig::default())
            .extract(&model, &assignment)
            .expect("transactions");
        assert_eq!(transactions.len(), 2);
        assert!(transactions.iter().all(|t| t.amount >= 5.0));
    }

    #[test]
    fn undersized_big_m_is_respected() {
        let balances: Balances = [("A", 60.0), ("B", -60.0)]
            .into_iter()
            .map(|(name, balance)| (Person::new(name), balance))
            .collect();
        let config = SettlementConfig {
            big_m: BigM::Fixed(10.0),
            ..SettlementConfig::default()
        };
        let model = SettlementModelBuilder::new(&config)
            .build(&balances)
            .expect("model");

        assert_eq!(GreedySolver.solve(&model, Duration::ZERO), SolveOutcome::Infeasible);
        assert!(matches!(
            GreedySolver.solve(&model.with_big_m(100.0), Duration::ZERO),
            SolveOutcome::Feasible(_)
        ));
    }

    #[test]
    fn lone_balance_is_infeasible() {
        let model = model(&[("A", 5.0), ("B", 0.0)]);
        assert_eq!(GreedySolver.solve(&model, Duration::ZERO), SolveOutcome::Infeasible);
    }
}
