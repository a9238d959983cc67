//! Expected payoffs of alerting and silent prey.
//!
//! A focal individual sits in a group of `N` where each of the other `N-1`
//! members alerts independently with probability `x`. Payoffs are the
//! success probabilities of [`crate::success`] averaged over the binomial
//! distribution of how many of those others alert.

use crate::error::{ConfigurationError, DomainError};
use crate::predator::PredatorProfile;
use crate::success::{
    marginal_alerting_value, success_given_alerting, success_given_alerting_density,
    success_given_silent, success_given_silent_density,
};
use serde::{Deserialize, Serialize};

/// How the success of a group member is evaluated for a given composition.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayoffRule {
    /// Focus dilution with alerting cost.
    #[default]
    Focus,
    /// Focus dilution where predator success drops by `decay * C / N`.
    Density { decay: f64 },
    /// Alerters also earn `responsiveness` times their marginal effect on the group.
    Marginal { responsiveness: f64 },
}

/// Probabilities that exactly `k = 0..=n` of `n` independent trials succeed.
///
/// Terms are built in log space so large `n` neither overflows the
/// coefficient nor underflows the powers. At `x` of 0 or 1 the weights are
/// exact point masses.
pub fn binomial_weights(n: usize, x: f64) -> Vec<f64> {
    let mut weights = vec![0.0; n + 1];
    if x <= 0.0 {
        weights[0] = 1.0;
        return weights;
    }
    if x >= 1.0 {
        weights[n] = 1.0;
        return weights;
    }

    let (ln_x, ln_1mx) = (x.ln(), (-x).ln_1p());
    let mut ln_coef = 0.0;
    for (k, weight) in weights.iter_mut().enumerate() {
        if k > 0 {
            ln_coef += ((n - k + 1) as f64 / k as f64).ln();
        }
        *weight = (ln_coef + k as f64 * ln_x + (n - k) as f64 * ln_1mx).exp();
    }
    weights
}

/// Payoff evaluator bound to the model constants `N` and `c`.
#[derive(Debug, PartialEq, Clone)]
pub struct PayoffAggregator {
    group_size: usize,
    alert_cost: f64,
    rule: PayoffRule,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Payoffs {
    pub alerting: f64,
    pub silent: f64,
}

impl PayoffAggregator {
    pub fn new(
        group_size: usize,
        alert_cost: f64,
        rule: PayoffRule,
    ) -> Result<Self, ConfigurationError> {
        let min = match rule {
            PayoffRule::Marginal { .. } => 2,
            _ => 1,
        };
        if group_size < min {
            return Err(ConfigurationError::GroupSize { group_size, min });
        }
        if !(alert_cost.is_finite() && alert_cost > 0.0) {
            return Err(ConfigurationError::AlertCost(alert_cost));
        }
        match rule {
            PayoffRule::Density { decay } if !(decay.is_finite() && decay >= 0.0) => {
                return Err(ConfigurationError::DensityDecay {
                    value: decay,
                    max: f64::INFINITY,
                });
            }
            PayoffRule::Marginal { responsiveness } if !responsiveness.is_finite() => {
                return Err(ConfigurationError::Rate {
                    field: "responsiveness",
                    value: responsiveness,
                });
            }
            _ => {}
        }
        Ok(Self {
            group_size,
            alert_cost,
            rule,
        })
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Expected success of an individual who alerts.
    pub fn expected_payoff_alerting(
        &self,
        x: f64,
        profile: &PredatorProfile,
    ) -> Result<f64, DomainError> {
        let (n, c) = (self.group_size, self.alert_cost);
        let p_prime = profile.p_prime(x);

        let weights = binomial_weights(n - 1, x);

        let mut total = 0.0;
        for n_alert in 1..=n {
            let weight = weights[n_alert - 1];
            if weight == 0.0 {
                continue;
            }
            let success = match self.rule {
                PayoffRule::Focus => success_given_alerting(n_alert, n, p_prime, c)?,
                PayoffRule::Density { decay } => {
                    success_given_alerting_density(n_alert, n, p_prime, c, decay)?
                }
                PayoffRule::Marginal { responsiveness } => {
                    marginal_alerting_value(responsiveness, n_alert, n, profile.p, p_prime, c)?
                }
            };
            total += weight * success;
        }
        Ok(total)
    }

    /// Expected success of an individual who stays silent.
    ///
    /// `p_avg` is the baseline success of the predators actually present.
    pub fn expected_payoff_silent(
        &self,
        x: f64,
        p_avg: f64,
        profile: &PredatorProfile,
    ) -> Result<f64, DomainError> {
        let (n, c) = (self.group_size, self.alert_cost);
        let p_prime = profile.p_prime(x);

        let weights = binomial_weights(n - 1, x);

        let mut total = 0.0;
        for n_alert in 0..n {
            let weight = weights[n_alert];
            if weight == 0.0 {
                continue;
            }
            let success = match self.rule {
                PayoffRule::Density { decay } => {
                    let p_used = if n_alert == 0 { p_avg } else { p_prime };
                    success_given_silent_density(n_alert, n, p_used, c, decay)?
                }
                PayoffRule::Focus | PayoffRule::Marginal { .. } => {
                    success_given_silent(n_alert, n, p_avg, p_prime, c)?
                }
            };
            total += weight * success;
        }
        Ok(total)
    }

    pub fn payoffs(
        &self,
        x: f64,
        p_avg: f64,
        profile: &PredatorProfile,
    ) -> Result<Payoffs, DomainError> {
        Ok(Payoffs {
            alerting: self.expected_payoff_alerting(x, profile)?,
            silent: self.expected_payoff_silent(x, p_avg, profile)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fast() -> PredatorProfile {
        PredatorProfile::new(0.9, 0.35, 0.26, 1.0).unwrap()
    }

    #[test]
    fn binomial_coefficients() {
        assert_eq!(binomial_weights(0, 0.3), vec![1.0]);
        let w = binomial_weights(4, 0.5);
        assert_eq!(w.len(), 5);
        assert!((w[2] - 6.0 / 16.0).abs() < 1e-14);
        assert!((w[0] - w[4]).abs() < 1e-14);
        let w = binomial_weights(5, 0.2);
        assert!((w[1] - 5.0 * 0.2 * 0.8f64.powi(4)).abs() < 1e-14);
        assert_eq!(binomial_weights(3, 1.0), vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(binomial_weights(3, 0.0), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn large_groups_stay_finite() {
        let prof = fast();
        for n in [999, 1100, 2000, 5000] {
            let agg = PayoffAggregator::new(n, 2.0, PayoffRule::Focus).unwrap();
            for x in [0.01, 0.5, 0.99] {
                let pay = agg.payoffs(x, 0.9, &prof).unwrap();
                for val in [pay.alerting, pay.silent] {
                    assert!(val.is_finite() && (0.0..=1.0).contains(&val), "N={n} x={x}: {pay:?}");
                }
            }
            let sum: f64 = binomial_weights(n - 1, 0.5).iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "N={n}: {sum}");
        }
    }

    #[test]
    fn density_rule_by_hand() {
        let agg = PayoffAggregator::new(2, 2.0, PayoffRule::Density { decay: 0.1 }).unwrap();
        let prof = fast();
        let p_avg = 0.75;

        // x = 0: only the lone alerter (C = 1) and the all-silent group (C = 0).
        let pa = agg.expected_payoff_alerting(0.0, &prof).unwrap();
        assert!((pa - (1.0 - (0.26 - 0.05) * 2.0 / 3.0)).abs() < 1e-12, "{pa}");
        let pna = agg.expected_payoff_silent(0.0, p_avg, &prof).unwrap();
        assert!((pna - (1.0 - 0.75 / 2.0)).abs() < 1e-12, "{pna}");

        // x = 1: only C = 2 for alerters and C = 1 for the silent member.
        let pp = prof.p_prime(1.0);
        let pa = agg.expected_payoff_alerting(1.0, &prof).unwrap();
        assert!((pa - (1.0 - (pp - 0.1) * 2.0 / 4.0)).abs() < 1e-12, "{pa}");
        let pna = agg.expected_payoff_silent(1.0, p_avg, &prof).unwrap();
        assert!((pna - (1.0 - (pp - 0.05) / 3.0)).abs() < 1e-12, "{pna}");
        assert!((pna - 0.9110363832351432).abs() < 1e-12);

        // x = 0.5 mixes both compositions with weight 1/2.
        let pay = agg.payoffs(0.5, p_avg, &prof).unwrap();
        assert!((pay.alerting - 0.8693428596349133).abs() < 1e-12, "{pay:?}");
        assert!((pay.silent - 0.7715979598956895).abs() < 1e-12, "{pay:?}");
    }

    #[test]
    fn pair_alerting_payoff_by_hand() {
        let agg = PayoffAggregator::new(2, 2.0, PayoffRule::Focus).unwrap();
        let got = agg.expected_payoff_alerting(0.5, &fast()).unwrap();
        // p' = 0.26 + 0.09 (1 - e^-0.5); payoff = 1 - p' (1/3 + 1/4)
        assert!((got - 0.827676).abs() < 1e-6, "{got}");
        assert!((got - 0.8276761929682466).abs() < 1e-12, "{got}");
    }

    #[test]
    fn pair_silent_payoff_by_hand() {
        let agg = PayoffAggregator::new(2, 2.0, PayoffRule::Focus).unwrap();
        let got = agg.expected_payoff_silent(0.5, 0.75, &fast()).unwrap();
        assert!((got - 0.7632646265623562).abs() < 1e-12, "{got}");
    }

    #[test]
    fn edges_of_alert_frequency_do_not_fail() {
        let agg = PayoffAggregator::new(4, 2.0, PayoffRule::Focus).unwrap();
        let prof = fast();
        for x in [0.0, 1.0] {
            agg.expected_payoff_alerting(x, &prof).unwrap();
            agg.expected_payoff_silent(x, prof.p, &prof).unwrap();
        }
        let lone = agg.expected_payoff_alerting(0.0, &prof).unwrap();
        assert!((lone - success_given_alerting(1, 4, 0.26, 2.0).unwrap()).abs() < 1e-15);
        let quiet = agg.expected_payoff_silent(0.0, 0.9, &prof).unwrap();
        assert!((quiet - (1.0 - 0.9 / 4.0)).abs() < 1e-15);
    }

    #[test]
    fn single_member_group() {
        let agg = PayoffAggregator::new(1, 3.0, PayoffRule::Focus).unwrap();
        let prof = fast();
        let pa = agg.expected_payoff_alerting(0.4, &prof).unwrap();
        assert!((pa - (1.0 - prof.p_prime(0.4))).abs() < 1e-15);
        let pna = agg.expected_payoff_silent(0.4, 0.9, &prof).unwrap();
        assert!((pna - 0.1).abs() < 1e-15);
    }

    #[test]
    fn density_rule_with_zero_decay_matches_focus() {
        let focus = PayoffAggregator::new(5, 1.5, PayoffRule::Focus).unwrap();
        let density = PayoffAggregator::new(5, 1.5, PayoffRule::Density { decay: 0.0 }).unwrap();
        let prof = fast();
        let a = focus.payoffs(0.3, 0.8, &prof).unwrap();
        let b = density.payoffs(0.3, 0.8, &prof).unwrap();
        assert!((a.alerting - b.alerting).abs() < 1e-14);
        assert!((a.silent - b.silent).abs() < 1e-14);
    }

    #[test]
    fn marginal_rule_with_zero_responsiveness_matches_focus() {
        let focus = PayoffAggregator::new(4, 2.0, PayoffRule::Focus).unwrap();
        let marginal = PayoffAggregator::new(
            4,
            2.0,
            PayoffRule::Marginal {
                responsiveness: 0.0,
            },
        )
        .unwrap();
        let prof = fast();
        let a = focus.expected_payoff_alerting(0.6, &prof).unwrap();
        let b = marginal.expected_payoff_alerting(0.6, &prof).unwrap();
        assert!((a - b).abs() < 1e-14);
    }

    #[test]
    fn invalid_constants_are_rejected() {
        assert_eq!(
            PayoffAggregator::new(0, 2.0, PayoffRule::Focus),
            Err(ConfigurationError::GroupSize {
                group_size: 0,
                min: 1
            })
        );
        assert_eq!(
            PayoffAggregator::new(3, -1.0, PayoffRule::Focus),
            Err(ConfigurationError::AlertCost(-1.0))
        );
        assert!(
            PayoffAggregator::new(
                1,
                2.0,
                PayoffRule::Marginal {
                    responsiveness: 0.2
                }
            )
            .is_err()
        );
        assert!(PayoffAggregator::new(3, 2.0, PayoffRule::Density { decay: -0.1 }).is_err());
    }

    proptest! {
        #[test]
        fn binomial_weights_sum_to_one(
            n in prop_oneof![1usize..40, Just(2000usize)],
            x in 0.0f64..1.0,
        ) {
            let weights = binomial_weights(n - 1, x);
            prop_assert_eq!(weights.len(), n);
            prop_assert!(weights.iter().all(|w| w.is_finite() && *w >= 0.0));
            let sum: f64 = weights.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9, "N={} x={}: {}", n, x, sum);
        }
    }
}
