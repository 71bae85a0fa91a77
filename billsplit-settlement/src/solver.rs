use crate::model::{SettlementModel, Variable};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicUsize, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::Duration,
};
use thiserror::Error;

/// Variable values returned by a solver, indexed by pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    active: Vec<f64>,
    amount: Vec<f64>,
}

impl Assignment {
    pub fn new(active: Vec<f64>, amount: Vec<f64>) -> Self {
        debug_assert_eq!(active.len(), amount.len());
        Self { active, amount }
    }

    pub fn zeroed(pair_count: usize) -> Self {
        Self::new(vec![0.0; pair_count], vec![0.0; pair_count])
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active(&self, pair: usize) -> f64 {
        self.active[pair]
    }

    pub fn amount(&self, pair: usize) -> f64 {
        self.amount[pair]
    }

    pub fn value(&self, variable: Variable) -> f64 {
        match variable {
            Variable::Active(pair) => self.active[pair],
            Variable::Amount(pair) => self.amount[pair],
        }
    }

    pub fn set(&mut self, variable: Variable, value: f64) {
        match variable {
            Variable::Active(pair) => self.active[pair] = value,
            Variable::Amount(pair) => self.amount[pair] = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("Solver did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Solver returned numerically unusable values: {0}")]
    Numerical(String),
    #[error("Solver backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// Proven minimal assignment.
    Optimal(Assignment),
    /// Valid assignment without an optimality proof.
    Feasible(Assignment),
    Infeasible,
    Failed(SolverError),
}

/// A backend able to solve a [`SettlementModel`].
pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, model: &SettlementModel, timeout: Duration) -> SolveOutcome;
}

/// Most timed-out solver threads allowed to keep running at once.
pub const MAX_DETACHED_SOLVES: usize = 2;

static DETACHED: DetachedSolves = DetachedSolves::new(MAX_DETACHED_SOLVES);

const RUNNING: u8 = 0;
const DONE: u8 = 1;
const ABANDONED: u8 = 2;

/// Counts worker threads abandoned after a timeout that are still busy.
///
/// A backend cannot be interrupted, so an abandoned thread keeps its CPU
/// until the backend returns. Once `limit` of them are busy, new solves fail
/// fast instead of spawning more.
#[derive(Debug)]
pub struct DetachedSolves {
    running: AtomicUsize,
    limit: usize,
}

impl DetachedSolves {
    pub const fn new(limit: usize) -> Self {
        Self {
            running: AtomicUsize::new(0),
            limit,
        }
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

struct FinishGuard {
    state: Arc<AtomicU8>,
    detached: &'static DetachedSolves,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if self.state.swap(DONE, Ordering::SeqCst) == ABANDONED {
            self.detached.running.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Runs `solve` on a worker thread and waits at most `timeout` for it.
///
/// On expiry the worker is detached and its eventual result dropped. At most
/// [`MAX_DETACHED_SOLVES`] detached workers may be running at once.
pub fn solve_with_deadline<F>(model: &SettlementModel, timeout: Duration, solve: F) -> SolveOutcome
where
    F: FnOnce(&SettlementModel) -> SolveOutcome + Send + 'static,
{
    solve_with_deadline_in(&DETACHED, model, timeout, solve)
}

/// [`solve_with_deadline`] with a caller-owned detached-thread budget.
pub fn solve_with_deadline_in<F>(
    detached: &'static DetachedSolves,
    model: &SettlementModel,
    timeout: Duration,
    solve: F,
) -> SolveOutcome
where
    F: FnOnce(&SettlementModel) -> SolveOutcome + Send + 'static,
{
    let busy = detached.running();
    if busy >= detached.limit {
        tracing::warn!(busy, limit = detached.limit, "Refusing solve while timed-out solves run");
        return SolveOutcome::Failed(SolverError::Backend(format!(
            "{busy} timed-out solves are still running"
        )));
    }

    let model = model.clone();
    let state = Arc::new(AtomicU8::new(RUNNING));
    let guard = FinishGuard {
        state: Arc::clone(&state),
        detached,
    };
    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("settlement-solve".to_owned())
        .spawn(move || {
            let _guard = guard;
            let _ = sender.send(solve(&model));
        });
    if let Err(err) = spawned {
        return SolveOutcome::Failed(SolverError::Backend(format!(
            "failed to spawn solver thread: {err}"
        )));
    }

    match receiver.recv_timeout(timeout) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            detached.running.fetch_add(1, Ordering::SeqCst);
            if state
                .compare_exchange(RUNNING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                // The worker finished between the timeout and the hand-off.
                detached.running.fetch_sub(1, Ordering::SeqCst);
                return receiver.try_recv().unwrap_or_else(|_| {
                    SolveOutcome::Failed(SolverError::Backend(
                        "solver thread exited without a result".to_owned(),
                    ))
                });
            }
            tracing::warn!(?timeout, "Settlement solve timed out");
            SolveOutcome::Failed(SolverError::Timeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => SolveOutcome::Failed(SolverError::Backend(
            "solver thread exited without a result".to_owned(),
        )),
    }
}
