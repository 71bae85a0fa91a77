use crate::{config::SettlementConfig, solver::Assignment};
use billsplit_domain::{Balances, Person};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModelBuildError {
    #[error("All balances are already settled")]
    Empty,
}

/// A person with a balance too large to count as settled. `rank` is the
/// roster position.
#[derive(Clone, Debug, PartialEq)]
pub struct Participant {
    pub person: Person,
    pub rank: usize,
    pub balance: f64,
}

/// Ordered pair of participant indices; a candidate transfer `from -> to`.
///
/// `cap` is the most a transfer between the two can carry:
/// the smaller of their balance magnitudes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransferPair {
    pub from: usize,
    pub to: usize,
    pub cap: f64,
}

/// Decision variable of a pair, addressed by pair index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Binary: 1 iff the transfer happens.
    Active(usize),
    /// Continuous, non-negative: the transferred amount in model units.
    Amount(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Term {
    pub variable: Variable,
    pub coefficient: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Leq,
    Geq,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    DebtorOutflow,
    DebtorInflow,
    CreditorInflow,
    CreditorOutflow,
    LinkUpper,
    LinkLower,
}

/// `Σ coefficient·variable  relation  rhs`
#[derive(Clone, Debug, PartialEq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub terms: Vec<Term>,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn lhs(&self, assignment: &Assignment) -> f64 {
        self.terms
            .iter()
            .map(|term| term.coefficient * assignment.value(term.variable))
            .sum()
    }

    pub fn is_satisfied(&self, assignment: &Assignment, tolerance: f64) -> bool {
        let lhs = self.lhs(assignment);
        match self.relation {
            Relation::Eq => (lhs - self.rhs).abs() <= tolerance,
            Relation::Leq => lhs <= self.rhs + tolerance,
            Relation::Geq => lhs >= self.rhs - tolerance,
        }
    }
}

/// Minimum-transaction settlement problem for one balance snapshot.
///
/// Every ordered pair of participants gets a binary `active` flag and a
/// non-negative `amount`; the objective counts active flags.
///
/// Amounts and right-hand sides are expressed in model units: money divided
/// by [`scale`](Self::scale), the largest balance magnitude. This keeps every
/// coefficient within `[0, 1]` regardless of the currency range.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementModel {
    participants: Vec<Participant>,
    targets: Vec<f64>,
    pairs: Vec<TransferPair>,
    constraints: Vec<LinearConstraint>,
    big_m: f64,
    scale: f64,
    residue: f64,
    cutoff: f64,
}

impl SettlementModel {
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn pairs(&self) -> &[TransferPair] {
        &self.pairs
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn big_m(&self) -> f64 {
        self.big_m
    }

    /// Money per model unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn to_money(&self, amount: f64) -> f64 {
        amount * self.scale
    }

    /// Balance the model settles for participant `idx`, in money.
    ///
    /// Equals the participant's balance except for the one participant that
    /// absorbs the [`residue`](Self::residue).
    pub fn target(&self, idx: usize) -> f64 {
        self.targets[idx]
    }

    /// Imbalance moved onto the largest participant so the flow rows sum to
    /// zero: float residue plus the balances too small to settle.
    pub fn residue(&self) -> f64 {
        self.residue
    }

    /// Settlement tolerance in model units.
    pub fn tolerance(&self) -> f64 {
        self.cutoff / self.scale
    }

    /// Objective terms: one unit per active flag.
    pub fn objective(&self) -> impl Iterator<Item = Term> + '_ {
        (0..self.pairs.len()).map(|idx| Term {
            variable: Variable::Active(idx),
            coefficient: 1.0,
        })
    }

    pub fn variable_count(&self) -> usize {
        self.pairs.len() * 2
    }

    /// Upper bound on the optimal transaction count (a spanning settlement).
    pub fn transaction_bound(&self) -> usize {
        self.participants.len().saturating_sub(1)
    }

    pub fn pair_index(&self, from: usize, to: usize) -> Option<usize> {
        let n = self.participants.len();
        if from >= n || to >= n || from == to {
            return None;
        }
        let column = if to < from { to } else { to - 1 };
        Some(from * (n - 1) + column)
    }

    /// Largest amount, in money, the linking constraint lets pair `idx` carry.
    pub fn pair_bound(&self, idx: usize) -> f64 {
        self.pairs[idx].cap.min(self.big_m)
    }

    /// Same model with the linking upper bound rebuilt for a new `big_m`.
    pub fn with_big_m(&self, big_m: f64) -> Self {
        let mut model = self.clone();
        model.big_m = big_m;
        for constraint in &mut model.constraints {
            if constraint.kind != ConstraintKind::LinkUpper {
                continue;
            }
            for term in &mut constraint.terms {
                if let Variable::Active(pair) = term.variable {
                    term.coefficient = -self.pairs[pair].cap.min(big_m) / self.scale;
                }
            }
        }
        model
    }

    pub fn is_satisfied_by(&self, assignment: &Assignment, tolerance: f64) -> bool {
        assignment.len() == self.pairs.len()
            && self
                .constraints
                .iter()
                .all(|constraint| constraint.is_satisfied(assignment, tolerance))
    }
}

pub struct SettlementModelBuilder<'a> {
    config: &'a SettlementConfig,
}

impl<'a> SettlementModelBuilder<'a> {
    pub fn new(config: &'a SettlementConfig) -> Self {
        Self { config }
    }

    /// Builds the model for `balances`.
    ///
    /// Balances below the config's verification tolerance cannot carry a
    /// transfer of at least `eps_min`, so they count as settled. Their sum,
    /// together with any float residue, is moved onto the largest participant.
    pub fn build(&self, balances: &Balances) -> Result<SettlementModel, ModelBuildError> {
        let cutoff = self.config.verification_tolerance();
        let mut excluded = 0.0;
        let mut participants = Vec::new();
        for (rank, (person, balance)) in balances.iter().enumerate() {
            if balance.abs() < cutoff {
                excluded += balance.abs();
                continue;
            }
            participants.push(Participant {
                person: person.clone(),
                rank,
                balance,
            });
        }

        if participants.is_empty() {
            return Err(ModelBuildError::Empty);
        }

        let scale = balances.max_magnitude();
        let mut targets: Vec<f64> = participants.iter().map(|p| p.balance).collect();
        let imbalance: f64 = targets.iter().sum();
        let residue = if imbalance.abs() <= excluded + cutoff {
            let anchor = (0..targets.len())
                .max_by(|&a, &b| targets[a].abs().total_cmp(&targets[b].abs()))
                .unwrap_or(0);
            targets[anchor] -= imbalance;
            let has_debtor = targets.iter().any(|&target| target <= -cutoff);
            let has_creditor = targets.iter().any(|&target| target >= cutoff);
            if !(has_debtor && has_creditor) {
                return Err(ModelBuildError::Empty);
            }
            imbalance.abs()
        } else {
            tracing::warn!(
                imbalance,
                absorbable = excluded + cutoff,
                "Balances do not sum to zero; the settlement model is infeasible"
            );
            0.0
        };

        let big_m = self.config.big_m.resolve(scale);
        if big_m <= scale {
            tracing::warn!(
                big_m,
                max_magnitude = scale,
                "Configured big-M does not exceed the largest balance; the model may be infeasible"
            );
        }

        let n = participants.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1));
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
        for from in 0..n {
            for to in 0..n {
                if from == to {
                    continue;
                }
                let idx = pairs.len();
                pairs.push(TransferPair {
                    from,
                    to,
                    cap: targets[from].abs().min(targets[to].abs()),
                });
                outgoing[from].push(idx);
                incoming[to].push(idx);
            }
        }

        let mut constraints = Vec::with_capacity(2 * n + 2 * pairs.len());
        for (idx, &target) in targets.iter().enumerate() {
            let (must_carry, must_be_empty, carry_kind, empty_kind) = if target < 0.0 {
                (
                    &outgoing[idx],
                    &incoming[idx],
                    ConstraintKind::DebtorOutflow,
                    ConstraintKind::DebtorInflow,
                )
            } else {
                (
                    &incoming[idx],
                    &outgoing[idx],
                    ConstraintKind::CreditorInflow,
                    ConstraintKind::CreditorOutflow,
                )
            };
            constraints.push(flow_constraint(carry_kind, must_carry, target.abs() / scale));
            constraints.push(flow_constraint(empty_kind, must_be_empty, 0.0));
        }

        let eps_min = self.config.eps_min / scale;
        for (idx, pair) in pairs.iter().enumerate() {
            constraints.push(LinearConstraint {
                kind: ConstraintKind::LinkUpper,
                terms: vec![amount_term(idx, 1.0), active_term(idx, -pair.cap.min(big_m) / scale)],
                relation: Relation::Leq,
                rhs: 0.0,
            });
            constraints.push(LinearConstraint {
                kind: ConstraintKind::LinkLower,
                terms: vec![amount_term(idx, 1.0), active_term(idx, -eps_min)],
                relation: Relation::Geq,
                rhs: 0.0,
            });
        }

        tracing::debug!(
            participant_count = n,
            pair_count = pairs.len(),
            constraint_count = constraints.len(),
            big_m,
            scale,
            residue,
            eps_min = self.config.eps_min,
            "Settlement model built"
        );

        Ok(SettlementModel {
            participants,
            targets,
            pairs,
            constraints,
            big_m,
            scale,
            residue,
            cutoff,
        })
    }
}

fn flow_constraint(kind: ConstraintKind, pair_indexes: &[usize], rhs: f64) -> LinearConstraint {
    LinearConstraint {
        kind,
        terms: pair_indexes
            .iter()
            .map(|&idx| amount_term(idx, 1.0))
            .collect(),
        relation: Relation::Eq,
        rhs,
    }
}

fn amount_term(pair: usize, coefficient: f64) -> Term {
    Term {
        variable: Variable::Amount(pair),
        coefficient,
    }
}

fn active_term(pair: usize, coefficient: f64) -> Term {
    Term {
        variable: Variable::Active(pair),
        coefficient,
    }
}
