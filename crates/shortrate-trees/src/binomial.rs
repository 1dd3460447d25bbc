//! Binomial short-rate tree builder.
//!
//! Builds a tree from an initial rate and a fixed perturbation applied at
//! every node. Column `t + 1` is generated from column `t`: the top node is
//! the up move of the previous top node, and every other node is the down
//! move of its upper-left predecessor. Both perturbations commute, so the
//! tree recombines.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_positive, ensure_probability, TreeError, TreeResult};
use crate::model::ShortRateModel;
use crate::tree::{RateTree, DEFAULT_DT, DEFAULT_Q_UP};

/// Rule that moves a short rate one period forward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ShortRateDynamics {
    /// `r_up = r·exp(σ√dt)`, `r_down = r·exp(-σ√dt)`.
    Lognormal {
        /// Short-rate volatility σ.
        volatility: f64,
    },
    /// `r_up = r + σ√dt`, `r_down = r - σ√dt`.
    Normal {
        /// Absolute short-rate volatility σ.
        volatility: f64,
    },
    /// `r_up = r·u`, `r_down = r·d`.
    Factors {
        /// Up factor `u`.
        up: f64,
        /// Down factor `d`.
        down: f64,
    },
}

impl ShortRateDynamics {
    /// Validates the dynamics.
    pub fn validate(&self) -> TreeResult<()> {
        match *self {
            Self::Lognormal { volatility } | Self::Normal { volatility } => {
                ensure_positive("volatility", volatility)
            }
            Self::Factors { up, down } => {
                ensure_positive("up", up)?;
                ensure_positive("down", down)?;
                if down > up {
                    return Err(TreeError::invalid_parameter(
                        "down",
                        format!("down factor {down} exceeds up factor {up}"),
                    ));
                }
                Ok(())
            }
        }
    }

    fn up(&self, rate: f64, dt: f64) -> f64 {
        match *self {
            Self::Lognormal { volatility } => rate * (volatility * dt.sqrt()).exp(),
            Self::Normal { volatility } => rate + volatility * dt.sqrt(),
            Self::Factors { up, .. } => rate * up,
        }
    }

    fn down(&self, rate: f64, dt: f64) -> f64 {
        match *self {
            Self::Lognormal { volatility } => rate * (-volatility * dt.sqrt()).exp(),
            Self::Normal { volatility } => rate - volatility * dt.sqrt(),
            Self::Factors { down, .. } => rate * down,
        }
    }
}

/// Parameters of a binomial short-rate tree.
///
/// # Example
///
/// ```rust
/// use shortrate_trees::binomial::{BinomialTreeParams, ShortRateDynamics};
///
/// let tree = BinomialTreeParams::new(0.06, 10, ShortRateDynamics::Factors { up: 1.25, down: 0.9 })
///     .build()
///     .unwrap();
/// assert_eq!(tree.steps(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinomialTreeParams {
    /// Short rate at the root.
    pub initial_rate: f64,
    /// Number of time steps.
    pub steps: usize,
    /// Perturbation rule.
    pub dynamics: ShortRateDynamics,
    /// Risk-neutral probability of an up move.
    #[serde(default = "default_q_up")]
    pub q_up: f64,
    /// Period length in years.
    #[serde(default = "default_dt")]
    pub dt: f64,
}

fn default_q_up() -> f64 {
    DEFAULT_Q_UP
}

fn default_dt() -> f64 {
    DEFAULT_DT
}

impl BinomialTreeParams {
    /// Creates parameters with `q_up = 0.5` and annual steps.
    #[must_use]
    pub fn new(initial_rate: f64, steps: usize, dynamics: ShortRateDynamics) -> Self {
        Self {
            initial_rate,
            steps,
            dynamics,
            q_up: DEFAULT_Q_UP,
            dt: DEFAULT_DT,
        }
    }

    /// Sets the probability of an up move.
    #[must_use]
    pub fn with_q_up(mut self, q_up: f64) -> Self {
        self.q_up = q_up;
        self
    }

    /// Sets the period length in years.
    #[must_use]
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Validates the parameters.
    pub fn validate(&self) -> TreeResult<()> {
        ensure_finite("initial_rate", self.initial_rate)?;
        if self.steps == 0 {
            return Err(TreeError::invalid_parameter(
                "steps",
                "must be at least 1",
            ));
        }
        ensure_probability("q_up", self.q_up)?;
        ensure_positive("dt", self.dt)?;
        self.dynamics.validate()
    }

    /// Builds the rate tree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidParameter`] if the parameters fail
    /// [`validate`](Self::validate) or a generated rate gives a non-positive
    /// discount factor.
    pub fn build(&self) -> TreeResult<RateTree> {
        self.validate()?;

        let mut rates: Vec<Vec<f64>> = Vec::with_capacity(self.steps);
        rates.push(vec![self.initial_rate]);

        for t in 1..self.steps {
            let previous = &rates[t - 1];
            let mut column = Vec::with_capacity(t + 1);
            column.push(self.dynamics.up(previous[0], self.dt));
            column.extend(previous.iter().map(|&r| self.dynamics.down(r, self.dt)));
            rates.push(column);
        }

        log::debug!(
            "built {}-step binomial tree from r0 = {} ({:?})",
            self.steps,
            self.initial_rate,
            self.dynamics
        );
        RateTree::from_rates(rates, self.dt, self.q_up)
    }
}

impl ShortRateModel for BinomialTreeParams {
    fn build_tree(&self) -> TreeResult<RateTree> {
        self.build()
    }

    fn name(&self) -> &'static str {
        match self.dynamics {
            ShortRateDynamics::Lognormal { .. } => "Binomial (lognormal)",
            ShortRateDynamics::Normal { .. } => "Binomial (normal)",
            ShortRateDynamics::Factors { .. } => "Binomial (up/down factors)",
        }
    }
}
