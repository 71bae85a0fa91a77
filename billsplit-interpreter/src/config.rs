use billsplit_settlement::{
    BigM, ConfigError, GreedySolver, MilpSolver, SettlementConfig, Solver,
};
use std::{env, str::FromStr, time::Duration};
use thiserror::Error;

static MILP: MilpSolver = MilpSolver;
static GREEDY: GreedySolver = GreedySolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverChoice {
    #[default]
    Milp,
    Greedy,
}

impl SolverChoice {
    pub fn solver(self) -> &'static dyn Solver {
        match self {
            Self::Milp => &MILP,
            Self::Greedy => &GREEDY,
        }
    }
}

impl FromStr for SolverChoice {
    type Err = EnvConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "milp" => Ok(Self::Milp),
            "greedy" => Ok(Self::Greedy),
            _ => Err(EnvConfigError::UnknownSolver(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvConfigError {
    #[error("{key} must be a number (found '{value}')")]
    InvalidNumber { key: &'static str, value: String },
    #[error("unknown solver '{0}' (expected 'milp' or 'greedy')")]
    UnknownSolver(String),
    #[error(transparent)]
    Settlement(#[from] ConfigError),
}

/// Interpreter configuration read from `BILLSPLIT_*` environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AppConfig {
    pub settlement: SettlementConfig,
    pub solver: SolverChoice,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, EnvConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EnvConfigError> {
        let number = |key: &'static str| -> Result<Option<f64>, EnvConfigError> {
            lookup(key)
                .map(|value| {
                    value
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| EnvConfigError::InvalidNumber { key, value })
                })
                .transpose()
        };

        let mut settlement = SettlementConfig::default();

        let margin = number("BILLSPLIT_BIG_M_MARGIN")?;
        settlement.big_m = match lookup("BILLSPLIT_BIG_M") {
            Some(value) if !value.trim().eq_ignore_ascii_case("auto") => {
                let fixed = value.trim().parse::<f64>().map_err(|_| {
                    EnvConfigError::InvalidNumber {
                        key: "BILLSPLIT_BIG_M",
                        value,
                    }
                })?;
                BigM::Fixed(fixed)
            }
            _ => match margin {
                Some(margin) => BigM::Auto { margin },
                None => BigM::default(),
            },
        };

        if let Some(eps_min) = number("BILLSPLIT_EPS_MIN")? {
            settlement.eps_min = eps_min;
        }
        if let Some(eps_active) = number("BILLSPLIT_EPS_ACTIVE")? {
            settlement.eps_active = eps_active;
        }
        if let Some(eps_sum) = number("BILLSPLIT_EPS_SUM")? {
            settlement.eps_sum = eps_sum;
        }
        if let Some(secs) = number("BILLSPLIT_SOLVE_TIMEOUT_SECS")? {
            settlement.solve_timeout =
                Duration::try_from_secs_f64(secs).map_err(|_| EnvConfigError::InvalidNumber {
                    key: "BILLSPLIT_SOLVE_TIMEOUT_SECS",
                    value: secs.to_string(),
                })?;
        }
        settlement.big_m_retry_factor = number("BILLSPLIT_BIG_M_RETRY_FACTOR")?;
        settlement.validate()?;

        let solver = lookup("BILLSPLIT_SOLVER")
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or_default();

        Ok(Self { settlement, solver })
    }
}
