use billsplit_domain::{BalanceCalculator, Ledger};
use proptest::prelude::*;

const NAMES: [&str; 7] = ["A", "B", "C", "D", "E", "F", "G"];

fn volume(ledger: &Ledger) -> f64 {
    ledger.expenses().iter().map(|expense| expense.amount()).sum()
}

fn build_ledger(
    member_count: usize,
    amounts: &[u32],
    payer_indexes: &[usize],
    participant_masks: &[u8],
) -> Ledger {
    let mut ledger = Ledger::new();
    for name in &NAMES[..member_count] {
        ledger.add_person(name).expect("person");
    }

    for (idx, &cents) in amounts.iter().enumerate() {
        let payer = payer_indexes.get(idx).copied().unwrap_or(0) % member_count;
        let mask = participant_masks.get(idx).copied().unwrap_or(0);
        let participants: Vec<&str> = (0..member_count)
            .filter(|&member| member != payer && mask & (1 << member) != 0)
            .map(|member| NAMES[member])
            .collect();
        let amount = f64::from(cents + 1) / 100.0;
        ledger
            .add_expense(NAMES[payer], participants, amount, "")
            .expect("generated expense is valid");
    }
    ledger
}

proptest! {
    #[test]
    fn balances_sum_to_zero(
        member_count in 1usize..=6,
        amounts in prop::collection::vec(0u32..=1_000_000, 0..=30),
        payer_indexes in prop::collection::vec(0usize..=5, 0..=30),
        participant_masks in prop::collection::vec(any::<u8>(), 0..=30),
    ) {
        let ledger = build_ledger(member_count, &amounts, &payer_indexes, &participant_masks);
        let balances = BalanceCalculator::default()
            .compute(&ledger)
            .expect("balances are consistent");

        prop_assert_eq!(balances.len(), member_count);
        prop_assert!(balances.total().abs() < BalanceCalculator::default().tolerance_for(volume(&ledger)));
    }

    #[test]
    fn large_ledgers_stay_within_scaled_tolerance(
        member_count in 2usize..=7,
        amounts in prop::collection::vec(1_000_000u32..=1_000_000_000, 50..=200),
        payer_indexes in prop::collection::vec(0usize..=6, 50..=200),
        participant_masks in prop::collection::vec(any::<u8>(), 50..=200),
    ) {
        let ledger = build_ledger(member_count, &amounts, &payer_indexes, &participant_masks);
        let balances = BalanceCalculator::default()
            .compute(&ledger)
            .expect("large ledgers are consistent");

        prop_assert!(balances.total().abs() < BalanceCalculator::default().tolerance_for(volume(&ledger)));
    }

    #[test]
    fn compute_is_idempotent(
        member_count in 2usize..=6,
        amounts in prop::collection::vec(0u32..=100_000, 0..=20),
        payer_indexes in prop::collection::vec(0usize..=5, 0..=20),
        participant_masks in prop::collection::vec(any::<u8>(), 0..=20),
    ) {
        let ledger = build_ledger(member_count, &amounts, &payer_indexes, &participant_masks);
        let calculator = BalanceCalculator::default();

        let first = calculator.compute(&ledger).expect("consistent");
        let second = calculator.compute(&ledger).expect("consistent");
        prop_assert_eq!(first, second);
    }
}
