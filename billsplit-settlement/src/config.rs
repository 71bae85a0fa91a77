use billsplit_domain::DEFAULT_EPS_SUM;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIG_M_MARGIN: f64 = 1.0;
pub const DEFAULT_EPS_MIN: f64 = 1e-5;
pub const DEFAULT_EPS_ACTIVE: f64 = 0.5;
pub const DEFAULT_SOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a single transfer used by the linking constraints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BigM {
    /// Largest balance magnitude plus `margin`.
    Auto { margin: f64 },
    /// A caller-chosen constant. Must exceed every balance magnitude to be safe.
    Fixed(f64),
}

impl Default for BigM {
    fn default() -> Self {
        Self::Auto {
            margin: DEFAULT_BIG_M_MARGIN,
        }
    }
}

impl BigM {
    pub fn resolve(self, max_magnitude: f64) -> f64 {
        match self {
            Self::Auto { margin } => max_magnitude + margin,
            Self::Fixed(value) => value,
        }
    }
}

/// Tuning knobs for building, solving and interpreting a settlement model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SettlementConfig {
    pub big_m: BigM,
    /// Smallest amount a transfer flagged active may carry.
    pub eps_min: f64,
    /// Threshold above which a relaxed binary flag counts as set.
    pub eps_active: f64,
    /// Zero-sum tolerance per unit of money moved by the expense log.
    pub eps_sum: f64,
    pub solve_timeout: Duration,
    /// When set, an infeasible solve is retried once with `big_m` scaled by this factor.
    pub big_m_retry_factor: Option<f64>,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            big_m: BigM::default(),
            eps_min: DEFAULT_EPS_MIN,
            eps_active: DEFAULT_EPS_ACTIVE,
            eps_sum: DEFAULT_EPS_SUM,
            solve_timeout: DEFAULT_SOLVE_TIMEOUT,
            big_m_retry_factor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be positive and finite (found {value})")]
    NonPositive { name: &'static str, value: f64 },
    #[error("eps_active must lie strictly between 0 and 1 (found {0})")]
    EpsActiveOutOfRange(f64),
    #[error("solve timeout must be non-zero")]
    ZeroTimeout,
    #[error("big_m retry factor must be greater than 1 (found {0})")]
    RetryFactorTooSmall(f64),
}

fn ensure_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

impl SettlementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.big_m {
            BigM::Auto { margin } => ensure_positive("big_m margin", margin)?,
            BigM::Fixed(value) => ensure_positive("big_m", value)?,
        }
        ensure_positive("eps_min", self.eps_min)?;
        ensure_positive("eps_sum", self.eps_sum)?;
        if !(self.eps_active > 0.0 && self.eps_active < 1.0) {
            return Err(ConfigError::EpsActiveOutOfRange(self.eps_active));
        }
        if self.solve_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Some(factor) = self
            .big_m_retry_factor
            .filter(|factor| !(factor.is_finite() && *factor > 1.0))
        {
            return Err(ConfigError::RetryFactorTooSmall(factor));
        }
        Ok(())
    }

    /// Tolerance used when checking that transfers reproduce the balances.
    ///
    /// Balances smaller than this count as settled when the model is built.
    pub fn verification_tolerance(&self) -> f64 {
        self.eps_sum.max(self.eps_min)
    }
}
