use indexmap::IndexMap;
use smol_str::SmolStr;
use std::{borrow::Borrow, fmt};

/// Unique participant identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Person(SmolStr);

impl Person {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Borrow<str> for Person {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Person {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Insertion-order number of an expense. Never reused, not even across resets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(pub u64);

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A recorded expense. The payer's own share is implicit, so `participants`
/// never contains the payer.
#[derive(Clone, Debug, PartialEq)]
pub struct Expense {
    sequence: Sequence,
    payer: Person,
    participants: Vec<Person>,
    amount: f64,
    memo: String,
}

impl Expense {
    pub(crate) fn new(
        sequence: Sequence,
        payer: Person,
        participants: Vec<Person>,
        amount: f64,
        memo: String,
    ) -> Self {
        Self {
            sequence,
            payer,
            participants,
            amount,
            memo,
        }
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn payer(&self) -> &Person {
        &self.payer
    }

    pub fn participants(&self) -> &[Person] {
        &self.participants
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    /// Amount borne by each head, payer included.
    pub fn share(&self) -> f64 {
        self.amount / (self.participants.len() + 1) as f64
    }
}

/// Append-only expense arena ordered by sequence number.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpenseLog {
    entries: Vec<Expense>,
}

impl ExpenseLog {
    pub(crate) fn push(&mut self, expense: Expense) {
        debug_assert!(
            self.entries
                .last()
                .is_none_or(|last| last.sequence < expense.sequence)
        );
        self.entries.push(expense);
    }

    pub fn get(&self, sequence: Sequence) -> Option<&Expense> {
        self.entries
            .binary_search_by_key(&sequence, Expense::sequence)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Expense> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ExpenseLog {
    type Item = &'a Expense;
    type IntoIter = std::slice::Iter<'a, Expense>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// An archived expense log. Epochs are numbered from zero, oldest first.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEpoch {
    index: usize,
    expenses: ExpenseLog,
}

impl HistoryEpoch {
    pub(crate) fn new(index: usize, expenses: ExpenseLog) -> Self {
        Self { index, expenses }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn expenses(&self) -> &ExpenseLog {
        &self.expenses
    }
}

/// Net balance per person in roster order (positive: is owed, negative: owes).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Balances {
    entries: IndexMap<Person, f64>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, person: &str) -> Option<f64> {
        self.entries.get(person).copied()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Person, f64)> + '_ {
        self.entries.iter().map(|(person, balance)| (person, *balance))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Largest absolute balance, or zero when empty.
    pub fn max_magnitude(&self) -> f64 {
        self.entries
            .values()
            .fold(0.0_f64, |acc, balance| acc.max(balance.abs()))
    }

    pub fn is_settled(&self, tolerance: f64) -> bool {
        self.entries.values().all(|balance| balance.abs() < tolerance)
    }

    /// People whose balance is at least `tolerance` away from zero.
    pub fn nonzero(&self, tolerance: f64) -> impl Iterator<Item = (&Person, f64)> + '_ {
        self.iter()
            .filter(move |(_, balance)| balance.abs() >= tolerance)
    }

    pub(crate) fn adjust(&mut self, person: &Person, delta: f64) {
        *self.entries.entry(person.clone()).or_insert(0.0) += delta;
    }
}

impl FromIterator<(Person, f64)> for Balances {
    fn from_iter<T: IntoIterator<Item = (Person, f64)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A single directed transfer that settles part of a debt.
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub from: Person,
    pub to: Person,
    pub amount: f64,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {:.2}", self.from, self.to, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn balances(entries: &[(&str, f64)]) -> Balances {
        entries
            .iter()
            .map(|(name, balance)| (Person::new(name), *balance))
            .collect()
    }

    #[rstest]
    #[case::no_participants(90.0, 0, 90.0)]
    #[case::two_participants(90.0, 2, 30.0)]
    #[case::one_participant(50.0, 1, 25.0)]
    fn share_includes_payer(#[case] amount: f64, #[case] participants: usize, #[case] expected: f64) {
        let expense = Expense::new(
            Sequence(0),
            Person::new("A"),
            (0..participants)
                .map(|idx| Person::new(format!("P{idx}")))
                .collect(),
            amount,
            String::new(),
        );
        assert_eq!(expense.share(), expected);
    }

    #[test]
    fn nonzero_filters_within_tolerance_and_keeps_order() {
        let balances = balances(&[("C", 10.0), ("A", 1e-12), ("B", -10.0)]);
        let names: Vec<&str> = balances
            .nonzero(1e-9)
            .map(|(person, _)| person.as_str())
            .collect();
        assert_eq!(names, ["C", "B"]);
    }

    #[test]
    fn max_magnitude_uses_absolute_values() {
        let balances = balances(&[("A", 60.0), ("B", -75.0), ("C", 15.0)]);
        assert_eq!(balances.max_magnitude(), 75.0);
        assert_eq!(Balances::new().max_magnitude(), 0.0);
    }

    #[test]
    fn expense_log_lookup_by_sequence() {
        let mut log = ExpenseLog::default();
        for seq in [2, 5, 9] {
            log.push(Expense::new(
                Sequence(seq),
                Person::new("A"),
                vec![Person::new("B")],
                10.0,
                format!("memo {seq}"),
            ));
        }
        assert_eq!(log.get(Sequence(5)).map(Expense::memo), Some("memo 5"));
        assert!(log.get(Sequence(3)).is_none());
    }

    #[test]
    fn transaction_display() {
        let transaction = Transaction {
            from: Person::new("B"),
            to: Person::new("A"),
            amount: 30.0,
        };
        assert_eq!(transaction.to_string(), "B -> A: 30.00");
    }
}
