//! Coupled prey-predator vector field.
//!
//! # State variables
//!
//! | Index | Variable | Description |
//! |-------|----------|-------------|
//! | 0 | `x` | Alert frequency of the prey population |
//! | 1..=k | `P_i` | Population of predator type `i` |

use crate::error::{ConfigurationError, DomainError};
use crate::payoff::{PayoffAggregator, Payoffs};
use crate::predator::PredatorProfile;

/// Total predator population below which fractions fall back to uniform.
pub const EXTINCTION_FLOOR: f64 = 1e-9;

/// Replicator dynamics for `x` coupled to per-type predator growth.
#[derive(Debug, PartialEq, Clone)]
pub struct CoupledSystem {
    aggregator: PayoffAggregator,
    predators: Vec<PredatorProfile>,
    growth_rate: f64,
    mortality_rate: f64,
}

impl CoupledSystem {
    pub fn new(
        aggregator: PayoffAggregator,
        predators: Vec<PredatorProfile>,
        growth_rate: f64,
        mortality_rate: f64,
    ) -> Result<Self, ConfigurationError> {
        if predators.is_empty() {
            return Err(ConfigurationError::NoPredators);
        }
        for prof in &predators {
            prof.validate()?;
        }
        for (field, value) in [
            ("growth_rate", growth_rate),
            ("mortality_rate", mortality_rate),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigurationError::Rate { field, value });
            }
        }
        Ok(Self {
            aggregator,
            predators,
            growth_rate,
            mortality_rate,
        })
    }

    /// Length of the state vector, `1 + k`.
    pub fn dim(&self) -> usize {
        1 + self.predators.len()
    }

    /// Population fractions `y_i`, uniform when the predators are (nearly) extinct.
    pub fn fractions(&self, populations: &[f64]) -> Vec<f64> {
        let total: f64 = populations.iter().map(|&pop| pop.max(0.0)).sum();
        if total < EXTINCTION_FLOOR {
            let uniform = 1.0 / populations.len() as f64;
            return vec![uniform; populations.len()];
        }
        populations.iter().map(|&pop| pop.max(0.0) / total).collect()
    }

    /// Profile of the predator community the prey actually face.
    pub fn blended_profile(&self, fractions: &[f64]) -> PredatorProfile {
        PredatorProfile::blend(fractions.iter().copied().zip(&self.predators))
    }

    fn split<'a>(&self, state: &'a [f64]) -> Result<(f64, &'a [f64]), DomainError> {
        let expected = self.dim();
        if state.len() != expected {
            return Err(DomainError::StateLength {
                expected,
                actual: state.len(),
            });
        }
        Ok((state[0], &state[1..]))
    }

    /// Expected payoffs of alerting and silent prey at `state`.
    pub fn payoffs(&self, state: &[f64]) -> Result<Payoffs, DomainError> {
        let (x, populations) = self.split(state)?;
        let fractions = self.fractions(populations);
        let blended = self.blended_profile(&fractions);

        // Integrator sub-steps may overshoot; composition terms need x in [0, 1].
        let x = x.clamp(0.0, 1.0);
        self.aggregator.payoffs(x, blended.p, &blended)
    }

    /// State derivative `(dx/dt, dP_1/dt, ..., dP_k/dt)`. The system is autonomous.
    pub fn derivative(&self, state: &[f64], _t: f64) -> Result<Vec<f64>, DomainError> {
        let (x, populations) = self.split(state)?;
        let Payoffs {
            alerting: pa,
            silent: pna,
        } = self.payoffs(state)?;

        let avg_payoff = x * pa + (1.0 - x) * pna;

        let mut deriv = Vec::with_capacity(state.len());
        deriv.push(x * (pa - avg_payoff));

        // Growth is type-specific: each type hunts with its own profile.
        let x_comp = x.clamp(0.0, 1.0);
        let group_size = self.aggregator.group_size();
        for (prof, &pop) in self.predators.iter().zip(populations) {
            let success = prof.success_rate(x_comp, group_size);
            deriv.push(self.growth_rate * pop * success - self.mortality_rate * pop);
        }

        Ok(deriv)
    }
}
