use crate::{
    config::SettlementConfig,
    model::SettlementModel,
    solver::{Assignment, SolverError},
};
use billsplit_domain::{Balances, Person, Transaction};
use std::collections::HashMap;

/// Turns a solved assignment into transactions ordered by roster rank.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransactionExtractor {
    eps_active: f64,
}

impl TransactionExtractor {
    pub fn new(eps_active: f64) -> Self {
        Self { eps_active }
    }

    pub fn from_config(config: &SettlementConfig) -> Self {
        Self::new(config.eps_active)
    }

    pub fn extract(
        &self,
        model: &SettlementModel,
        assignment: &Assignment,
    ) -> Result<Vec<Transaction>, SolverError> {
        if assignment.len() != model.pairs().len() {
            return Err(SolverError::Numerical(format!(
                "assignment covers {} pairs but the model has {}",
                assignment.len(),
                model.pairs().len()
            )));
        }

        let mut support = Vec::new();
        for (idx, pair) in model.pairs().iter().enumerate() {
            if assignment.active(idx) < self.eps_active {
                continue;
            }
            let amount = assignment.amount(idx);
            if !amount.is_finite() || amount <= 0.0 {
                let participants = model.participants();
                return Err(SolverError::Numerical(format!(
                    "active transfer {} -> {} carries amount {amount}",
                    participants[pair.from].person, participants[pair.to].person
                )));
            }
            support.push(idx);
        }

        let amounts = match settle_on_support(model, &support) {
            Some(amounts) => amounts,
            None => {
                tracing::debug!(
                    active_pairs = support.len(),
                    "Active transfers contain a cycle; keeping solver amounts"
                );
                support
                    .iter()
                    .map(|&idx| model.to_money(assignment.amount(idx)))
                    .collect()
            }
        };

        let participants = model.participants();
        let mut ranked = Vec::with_capacity(support.len());
        for (&idx, amount) in support.iter().zip(amounts) {
            let pair = model.pairs()[idx];
            let from = &participants[pair.from];
            let to = &participants[pair.to];
            if !amount.is_finite() || amount <= 0.0 {
                return Err(SolverError::Numerical(format!(
                    "transfer {} -> {} settles to amount {amount}",
                    from.person, to.person
                )));
            }
            ranked.push((
                (from.rank, to.rank),
                Transaction {
                    from: from.person.clone(),
                    to: to.person.clone(),
                    amount,
                },
            ));
        }

        ranked.sort_by_key(|(key, _)| *key);
        Ok(ranked
            .into_iter()
            .map(|(_, transaction)| transaction)
            .collect())
    }
}

/// Recomputes transfer amounts in money from the model targets alone.
///
/// Only the choice of pairs is taken from the solver. When those pairs form a
/// forest the amounts are unique: each leaf's pair carries the leaf's whole
/// remaining balance. Returns `None` when the pairs contain a cycle.
fn settle_on_support(model: &SettlementModel, support: &[usize]) -> Option<Vec<f64>> {
    let n = model.participants().len();
    let mut remaining: Vec<f64> = (0..n).map(|idx| model.target(idx)).collect();
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (pos, &idx) in support.iter().enumerate() {
        let pair = model.pairs()[idx];
        incident[pair.from].push(pos);
        incident[pair.to].push(pos);
    }

    let mut degree: Vec<usize> = incident.iter().map(Vec::len).collect();
    let mut amounts: Vec<Option<f64>> = vec![None; support.len()];
    let mut leaves: Vec<usize> = (0..n).filter(|&node| degree[node] == 1).collect();
    while let Some(leaf) = leaves.pop() {
        if degree[leaf] != 1 {
            continue;
        }
        let Some(&pos) = incident[leaf].iter().find(|&&pos| amounts[pos].is_none()) else {
            continue;
        };
        let pair = model.pairs()[support[pos]];
        let amount = if leaf == pair.to {
            remaining[pair.to]
        } else {
            -remaining[pair.from]
        };
        remaining[pair.to] -= amount;
        remaining[pair.from] += amount;
        amounts[pos] = Some(amount);
        for node in [pair.from, pair.to] {
            degree[node] -= 1;
            if degree[node] == 1 {
                leaves.push(node);
            }
        }
    }

    amounts.into_iter().collect()
}

/// Checks that applying `transactions` reproduces every balance within `tolerance`.
pub fn verify_settlement(
    balances: &Balances,
    transactions: &[Transaction],
    tolerance: f64,
) -> Result<(), SolverError> {
    let mut net: HashMap<&Person, f64> =
        balances.iter().map(|(person, _)| (person, 0.0)).collect();

    for transaction in transactions {
        if transaction.from == transaction.to {
            return Err(SolverError::Numerical(format!(
                "transfer from {} to itself",
                transaction.from
            )));
        }
        for (person, delta) in [
            (&transaction.from, -transaction.amount),
            (&transaction.to, transaction.amount),
        ] {
            let Some(entry) = net.get_mut(person) else {
                return Err(SolverError::Numerical(format!(
                    "transfer references unknown person {person}"
                )));
            };
            *entry += delta;
        }
    }

    for (person, balance) in balances.iter() {
        let received = net.get(person).copied().unwrap_or(0.0);
        if (received - balance).abs() > tolerance {
            return Err(SolverError::Numerical(format!(
                "transfers leave {person} at {received} instead of {balance}"
            )));
        }
    }
    Ok(())
}
