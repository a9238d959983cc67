use crate::payoff::{PayoffAggregator, PayoffRule};
use crate::predator::PredatorProfile;
use crate::system::CoupledSystem;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Model constants, fixed for the whole integration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Group size `N`.
    pub group_size: usize,
    /// Alerting cost multiplier `c`.
    pub alert_cost: f64,
    /// Predator growth rate `r`.
    pub growth_rate: f64,
    /// Predator per-capita mortality `m`.
    pub mortality_rate: f64,

    /// Payoff rule (defaults to focus dilution).
    #[serde(default)]
    pub payoff: PayoffRule,

    /// One profile per predator type.
    pub predators: Vec<PredatorProfile>,
}

/// Initial condition.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Initial alert frequency `x0`.
    pub alert_freq: f64,
    /// Initial population of each predator type.
    pub populations: Vec<f64>,
}

/// Integration and output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// RK4 step size.
    pub time_step: f64,
    /// Number of steps between records.
    pub steps_per_save: usize,
    /// Number of records written per trajectory file.
    pub saves_per_file: usize,
}

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub init: InitConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;
        config.validate().context("failed to validate config")?;
        Ok(config)
    }

    /// Build the vector field described by the model section.
    pub fn system(&self) -> Result<CoupledSystem> {
        let model = &self.model;
        let aggregator = PayoffAggregator::new(model.group_size, model.alert_cost, model.payoff)
            .context("failed to construct payoff aggregator")?;
        let system = CoupledSystem::new(
            aggregator,
            model.predators.clone(),
            model.growth_rate,
            model.mortality_rate,
        )
        .context("failed to construct coupled system")?;
        Ok(system)
    }

    /// Initial state vector `[x0, P_1, ..., P_k]`.
    pub fn initial_state(&self) -> Vec<f64> {
        let mut state = Vec::with_capacity(1 + self.init.populations.len());
        state.push(self.init.alert_freq);
        state.extend_from_slice(&self.init.populations);
        state
    }

    /// Per-variable bounds enforced after every integration step.
    pub fn state_bounds(&self) -> Vec<(f64, f64)> {
        let mut bounds = vec![(0.0, 1.0)];
        bounds.resize(1 + self.model.predators.len(), (0.0, f64::INFINITY));
        bounds
    }

    fn validate(&self) -> Result<()> {
        let model = &self.model;
        check_num(model.group_size, 1..100_000).context("invalid group size")?;
        check_pos(model.alert_cost).context("invalid alert cost")?;
        check_num(model.growth_rate, 0.0..f64::INFINITY).context("invalid growth rate")?;
        check_num(model.mortality_rate, 0.0..f64::INFINITY).context("invalid mortality rate")?;

        let n_pred = model.predators.len();
        // Profiles are validated while they are deserialized.
        check_num(n_pred, 1..100).context("invalid number of predator types")?;

        match model.payoff {
            PayoffRule::Focus => {}
            PayoffRule::Density { decay } => {
                // Effective probabilities must stay non-negative for every type.
                let max = model
                    .predators
                    .iter()
                    .flat_map(|prof| [prof.p, prof.p_prime_base, prof.p_min])
                    .fold(f64::INFINITY, f64::min);
                check_num(decay, 0.0..=max).context("invalid density decay")?;
            }
            PayoffRule::Marginal { responsiveness } => {
                check_num(model.group_size, 2..1_000)
                    .context("marginal payoff requires at least two group members")?;
                check_num(responsiveness, f64::MIN..=f64::MAX)
                    .context("invalid responsiveness")?;
            }
        }

        let init = &self.init;
        check_num(init.alert_freq, 0.0..=1.0).context("invalid initial alert frequency")?;
        let n_pop = init.populations.len();
        if n_pop != n_pred {
            bail!("expected {n_pred} initial populations, but got {n_pop}");
        }
        for (i_pred, &pop) in init.populations.iter().enumerate() {
            check_num(pop, 0.0..f64::INFINITY)
                .with_context(|| format!("invalid initial population {i_pred}"))?;
        }

        let output = &self.output;
        check_pos(output.time_step).context("invalid time step")?;
        check_num(output.steps_per_save, 1..1_000_000).context("invalid number of steps per save")?;
        check_num(output.saves_per_file, 1..1_000_000).context("invalid number of saves per file")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_pos(num: f64) -> Result<()> {
    if !(num.is_finite() && num > 0.0) {
        bail!("number must be positive and finite, but is {num:?}");
    }
    Ok(())
}
