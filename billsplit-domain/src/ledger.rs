use crate::{
    error::{InvalidExpense, LedgerError},
    model::{Expense, ExpenseLog, HistoryEpoch, Person, Sequence},
};
use indexmap::IndexSet;
use std::mem;

/// Owner of the roster, the current expense log and the archived history.
///
/// Every mutation is validated up front; a failed call leaves the ledger
/// exactly as it was.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    roster: IndexSet<Person>,
    expenses: ExpenseLog,
    history: Vec<HistoryEpoch>,
    next_sequence: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_person(&mut self, name: &str) -> Result<(), LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidName);
        }
        if self.roster.contains(name) {
            return Err(LedgerError::DuplicateName {
                name: Person::new(name),
            });
        }
        self.roster.insert(Person::new(name));
        Ok(())
    }

    /// Records an expense that `payer` fronted for `participants`.
    ///
    /// The amount is split evenly among the participants and the payer.
    pub fn add_expense<I, S>(
        &mut self,
        payer: &str,
        participants: I,
        amount: f64,
        memo: impl Into<String>,
    ) -> Result<Sequence, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(InvalidExpense::NonPositiveAmount(amount).into());
        }

        let Some(payer) = self.roster.get(payer).cloned() else {
            return Err(InvalidExpense::UnknownPayer(payer.to_owned()).into());
        };

        let mut resolved: IndexSet<Person> = IndexSet::new();
        for name in participants {
            let name = name.as_ref();
            let Some(person) = self.roster.get(name) else {
                return Err(InvalidExpense::UnknownParticipant(name.to_owned()).into());
            };
            if *person == payer {
                return Err(InvalidExpense::SelfParticipation(name.to_owned()).into());
            }
            if !resolved.insert(person.clone()) {
                return Err(InvalidExpense::DuplicateParticipant(name.to_owned()).into());
            }
        }

        let sequence = Sequence(self.next_sequence);
        self.next_sequence += 1;
        self.expenses.push(Expense::new(
            sequence,
            payer,
            resolved.into_iter().collect(),
            amount,
            memo.into(),
        ));
        Ok(sequence)
    }

    /// Archives the current log as a new epoch and starts an empty one.
    ///
    /// Returns the index of the archived epoch.
    pub fn reset(&mut self) -> usize {
        let index = self.history.len();
        let archived = mem::take(&mut self.expenses);
        tracing::info!(
            epoch = index,
            archived_expenses = archived.len(),
            "Expense log archived"
        );
        self.history.push(HistoryEpoch::new(index, archived));
        index
    }

    pub fn roster(&self) -> &IndexSet<Person> {
        &self.roster
    }

    /// Position of `name` in the roster (insertion order).
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.roster.get_index_of(name)
    }

    pub fn expenses(&self) -> &ExpenseLog {
        &self.expenses
    }

    pub fn expense(&self, sequence: Sequence) -> Option<&Expense> {
        self.expenses.get(sequence)
    }

    pub fn history(&self) -> &[HistoryEpoch] {
        &self.history
    }

    pub fn epoch(&self, index: usize) -> Option<&HistoryEpoch> {
        self.history.get(index)
    }
}
