use crate::{
    error::{HistoryError, SettlementError},
    service::SettlementService,
};
use billsplit_domain::{
    BalanceInconsistency, Balances, HistoryEpoch, Ledger, LedgerError, Sequence, Transaction,
};
use billsplit_settlement::{ConfigError, SettlementConfig, Solver};

/// Ledger plus settlement service behind a single surface.
pub struct BillSplit<'a> {
    ledger: Ledger,
    service: SettlementService<'a>,
}

impl<'a> BillSplit<'a> {
    pub fn new(solver: &'a dyn Solver, config: SettlementConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            ledger: Ledger::new(),
            service: SettlementService::new(solver, config)?,
        })
    }

    pub fn add_person(&mut self, name: &str) -> Result<(), LedgerError> {
        self.ledger.add_person(name)
    }

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
        self.ledger.add_expense(payer, participants, amount, memo)
    }

    pub fn compute_balances(&self) -> Result<Balances, BalanceInconsistency> {
        self.service.calculator().compute(&self.ledger)
    }

    pub fn settle(&self) -> Result<Vec<Transaction>, SettlementError> {
        self.service.settle(&self.ledger)
    }

    pub fn reset(&mut self) -> usize {
        self.ledger.reset()
    }

    pub fn history(&self) -> &[HistoryEpoch] {
        self.ledger.history()
    }

    pub fn epoch_balances(&self, index: usize) -> Result<Balances, HistoryError> {
        let epoch = self
            .ledger
            .epoch(index)
            .ok_or(HistoryError::UnknownEpoch(index))?;
        Ok(self.service.calculator().compute_epoch(&self.ledger, epoch)?)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &SettlementConfig {
        self.service.config()
    }
}
