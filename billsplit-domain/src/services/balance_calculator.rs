use crate::{
    error::BalanceInconsistency,
    ledger::Ledger,
    model::{Balances, Expense, HistoryEpoch, Person},
};

/// Default tolerance for the zero-sum check, per unit of money moved.
pub const DEFAULT_EPS_SUM: f64 = 1e-9;

/// Balance derivation service
///
/// Turns an expense log into per-person net balances and enforces that the
/// result sums to zero. Float rounding grows with the amounts involved, so the
/// check allows `eps_sum` per unit of total expense amount (and never less
/// than `eps_sum` itself).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BalanceCalculator {
    eps_sum: f64,
}

impl Default for BalanceCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_EPS_SUM)
    }
}

impl BalanceCalculator {
    pub fn new(eps_sum: f64) -> Self {
        Self { eps_sum }
    }

    /// Zero-sum tolerance for a log whose amounts add up to `volume`.
    pub fn tolerance_for(&self, volume: f64) -> f64 {
        self.eps_sum * volume.max(1.0)
    }

    /// Balances of the ledger's current (unarchived) expense log.
    pub fn compute(&self, ledger: &Ledger) -> Result<Balances, BalanceInconsistency> {
        self.compute_from(ledger.roster(), ledger.expenses())
    }

    /// Balances of an archived epoch, reported against the current roster.
    pub fn compute_epoch(
        &self,
        ledger: &Ledger,
        epoch: &HistoryEpoch,
    ) -> Result<Balances, BalanceInconsistency> {
        self.compute_from(ledger.roster(), epoch.expenses())
    }

    fn compute_from<'a>(
        &self,
        roster: impl IntoIterator<Item = &'a Person>,
        expenses: impl IntoIterator<Item = &'a Expense>,
    ) -> Result<Balances, BalanceInconsistency> {
        let mut balances: Balances = roster
            .into_iter()
            .map(|person| (person.clone(), 0.0))
            .collect();

        let mut volume = 0.0;
        for expense in expenses {
            volume += expense.amount();
            let share = expense.share();
            balances.adjust(expense.payer(), expense.amount() - share);
            for participant in expense.participants() {
                balances.adjust(participant, -share);
            }
        }

        let total = balances.total();
        let tolerance = self.tolerance_for(volume);
        if total.abs() >= tolerance {
            tracing::error!(
                reject_reason = "balance_imbalance",
                member_count = balances.len(),
                total,
                tolerance,
                volume,
                "Balance computation violated the zero-sum invariant"
            );
            return Err(BalanceInconsistency { total, tolerance });
        }

        Ok(balances)
    }
}
