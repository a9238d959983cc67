use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Success characteristics of one predator type.
///
/// `p_prime(x)` rises from the floor `p_min` at `x = 0` towards the
/// asymptote `p_prime_base` with rate `b`.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "ProfileFields")]
pub struct PredatorProfile {
    /// Success against a group where nobody alerts.
    pub p: f64,
    /// Asymptotic success against an alerted group.
    pub p_prime_base: f64,
    /// Success against an alerted group when `x = 0`.
    pub p_min: f64,
    /// Saturation rate of `p_prime(x)`.
    pub b: f64,
}

#[derive(Deserialize)]
struct ProfileFields {
    p: f64,
    p_prime_base: f64,
    p_min: f64,
    b: f64,
}

impl TryFrom<ProfileFields> for PredatorProfile {
    type Error = ConfigurationError;

    fn try_from(fields: ProfileFields) -> Result<Self, Self::Error> {
        Self::new(fields.p, fields.p_prime_base, fields.p_min, fields.b)
    }
}

impl PredatorProfile {
    pub fn new(p: f64, p_prime_base: f64, p_min: f64, b: f64) -> Result<Self, ConfigurationError> {
        let profile = Self {
            p,
            p_prime_base,
            p_min,
            b,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("p", self.p),
            ("p_prime_base", self.p_prime_base),
            ("p_min", self.p_min),
            ("b", self.b),
        ] {
            if !value.is_finite() {
                return Err(ConfigurationError::NonFiniteProfile { field, value });
            }
        }
        // b = 0 is allowed and pins p_prime(x) to p_min.
        if self.b < 0.0 {
            return Err(ConfigurationError::SaturationRate(self.b));
        }
        Ok(())
    }

    /// Success against an alerted group when the alert frequency is `x`.
    pub fn p_prime(&self, x: f64) -> f64 {
        self.p_min + (self.p_prime_base - self.p_min) * (1.0 - (-self.b * x).exp())
    }

    /// Overall hunting success: baseline when no member of the group alerts
    /// (probability `(1-x)^N`), alerted success otherwise.
    pub fn success_rate(&self, x: f64, group_size: usize) -> f64 {
        let p_silent = (1.0 - x).powi(group_size as i32);
        p_silent * self.p + (1.0 - p_silent) * self.p_prime(x)
    }

    /// Linear combination of profiles with the given weights.
    pub fn blend<'a, I>(weighted: I) -> Self
    where
        I: IntoIterator<Item = (f64, &'a PredatorProfile)>,
    {
        weighted.into_iter().fold(
            Self {
                p: 0.0,
                p_prime_base: 0.0,
                p_min: 0.0,
                b: 0.0,
            },
            |acc, (w, prof)| Self {
                p: acc.p + w * prof.p,
                p_prime_base: acc.p_prime_base + w * prof.p_prime_base,
                p_min: acc.p_min + w * prof.p_min,
                b: acc.b + w * prof.b,
            },
        )
    }
}
