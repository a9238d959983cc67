//! Closed-form success probabilities of a single group member.
//!
//! `n_alert` is the number of alerting members `C`, `group_size` is `N` and
//! `alert_cost` is the multiplier `c` by which an alerter draws more focus
//! than a silent member.

use crate::error::DomainError;

/// Unit share of focus, `1 / (C(c-1) + N)`. A silent member draws one unit,
/// an alerter draws `c` units.
pub fn focus_per_alerter(
    n_alert: usize,
    group_size: usize,
    alert_cost: f64,
) -> Result<f64, DomainError> {
    let denom = n_alert as f64 * (alert_cost - 1.0) + group_size as f64;
    if denom == 0.0 {
        return Err(DomainError::ZeroFocusDenominator {
            n_alert,
            group_size,
            alert_cost,
        });
    }
    Ok(1.0 / denom)
}

/// Focus drawn by a single alerter, `c / (C(c-1) + N)`.
pub fn alerter_focus(
    n_alert: usize,
    group_size: usize,
    alert_cost: f64,
) -> Result<f64, DomainError> {
    Ok(alert_cost * focus_per_alerter(n_alert, group_size, alert_cost)?)
}

/// Success of an alerting member when the predator succeeds with `p_prime`.
pub fn success_given_alerting(
    n_alert: usize,
    group_size: usize,
    p_prime: f64,
    alert_cost: f64,
) -> Result<f64, DomainError> {
    if n_alert == 0 {
        return Err(DomainError::NoAlerters {
            function: "success_given_alerting",
            group_size,
        });
    }
    Ok(1.0 - p_prime * alerter_focus(n_alert, group_size, alert_cost)?)
}

/// Success of a silent member.
///
/// The predator hunts with its baseline `p` only when nobody alerts.
pub fn success_given_silent(
    n_alert: usize,
    group_size: usize,
    p: f64,
    p_prime: f64,
    alert_cost: f64,
) -> Result<f64, DomainError> {
    if n_alert == group_size {
        return Err(DomainError::NoSilentMember {
            function: "success_given_silent",
            n_alert,
            group_size,
        });
    }
    let p_used = if n_alert == 0 { p } else { p_prime };
    Ok(1.0 - p_used * focus_per_alerter(n_alert, group_size, alert_cost)?)
}

fn density_prob(n_alert: usize, group_size: usize, p: f64, decay: f64) -> f64 {
    p - decay * n_alert as f64 / group_size as f64
}

/// Alerting success when predator success drops linearly with density, `p - aC/N`.
pub fn success_given_alerting_density(
    n_alert: usize,
    group_size: usize,
    p: f64,
    alert_cost: f64,
    decay: f64,
) -> Result<f64, DomainError> {
    let prob = density_prob(n_alert, group_size, p, decay);
    Ok(1.0 - prob * alerter_focus(n_alert, group_size, alert_cost)?)
}

/// Silent success when predator success drops linearly with density, `p - aC/N`.
pub fn success_given_silent_density(
    n_alert: usize,
    group_size: usize,
    p: f64,
    alert_cost: f64,
    decay: f64,
) -> Result<f64, DomainError> {
    let prob = density_prob(n_alert, group_size, p, decay);
    Ok(1.0 - prob * focus_per_alerter(n_alert, group_size, alert_cost)?)
}

/// Alerting success plus `r` times the change one extra alerter brings to
/// the `C-1` other alerters and the `N-C` silent members.
pub fn marginal_alerting_value(
    responsiveness: f64,
    n_alert: usize,
    group_size: usize,
    p: f64,
    p_prime: f64,
    alert_cost: f64,
) -> Result<f64, DomainError> {
    if n_alert == 0 {
        return Err(DomainError::NoAlerters {
            function: "marginal_alerting_value",
            group_size,
        });
    }

    let alert_gain = || -> Result<f64, DomainError> {
        let diff = success_given_alerting(n_alert, group_size, p_prime, alert_cost)?
            - success_given_alerting(n_alert - 1, group_size, p_prime, alert_cost)?;
        Ok((n_alert - 1) as f64 * diff)
    };
    let silent_gain = || -> Result<f64, DomainError> {
        let diff = success_given_silent(n_alert, group_size, p, p_prime, alert_cost)?
            - success_given_silent(n_alert - 1, group_size, p, p_prime, alert_cost)?;
        Ok((group_size - n_alert) as f64 * diff)
    };

    // Edges: a lone alerter has no alerting peers, a full group no silent ones.
    let k_a = if n_alert == 1 {
        responsiveness * silent_gain()?
    } else if n_alert == group_size {
        responsiveness * alert_gain()?
    } else {
        responsiveness * (alert_gain()? + silent_gain()?)
    };

    Ok(success_given_alerting(n_alert, group_size, p_prime, alert_cost)? + k_a)
}
