use serde::{Deserialize, Serialize};

/// Snapshot of the integration written to trajectory files.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Record {
    pub time: f64,

    /// Alert frequency `x`.
    pub alert_freq: f64,
    /// Predator populations `P_i`.
    pub populations: Vec<f64>,

    /// Expected payoff of alerting prey.
    pub payoff_alerting: f64,
    /// Expected payoff of silent prey.
    pub payoff_silent: f64,
}

impl Record {
    pub fn is_finite(&self) -> bool {
        self.time.is_finite()
            && self.alert_freq.is_finite()
            && self.populations.iter().all(|pop| pop.is_finite())
            && self.payoff_alerting.is_finite()
            && self.payoff_silent.is_finite()
    }

    pub fn total_population(&self) -> f64 {
        self.populations.iter().sum()
    }
}
