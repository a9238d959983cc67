//! Typed errors raised by the pure model layer.

use thiserror::Error;

/// A computation was requested for a group composition where it is undefined.
#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error(
        "C*(c-1)+N evaluated to 0 in focus_per_alerter with C={n_alert}, c={alert_cost}, N={group_size}"
    )]
    ZeroFocusDenominator {
        n_alert: usize,
        group_size: usize,
        alert_cost: f64,
    },
    #[error("C cannot be 0 in {function} (N={group_size})")]
    NoAlerters {
        function: &'static str,
        group_size: usize,
    },
    #[error("N cannot be equal to C in {function} (N={group_size}, C={n_alert})")]
    NoSilentMember {
        function: &'static str,
        n_alert: usize,
        group_size: usize,
    },
    #[error("state vector must have length {expected}, but has {actual}")]
    StateLength { expected: usize, actual: usize },
}

/// Model constants or profiles that cannot describe a valid model instance.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("group size must be at least {min}, but is {group_size}")]
    GroupSize { group_size: usize, min: usize },
    #[error("alert cost must be positive and finite, but is {0}")]
    AlertCost(f64),
    #[error("predator profile field {field} must be finite, but is {value}")]
    NonFiniteProfile { field: &'static str, value: f64 },
    #[error("saturation rate b must be non-negative, but is {0}")]
    SaturationRate(f64),
    #[error("at least one predator type is required")]
    NoPredators,
    #[error("{field} must be non-negative and finite, but is {value}")]
    Rate { field: &'static str, value: f64 },
    #[error("density decay must be in [0, {max}], but is {value}")]
    DensityDecay { value: f64, max: f64 },
}
