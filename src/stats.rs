use serde::{Deserialize, Serialize};

/// Online mean and standard deviation (Welford).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;
        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;
        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals - 1) as f64).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

/// Trajectory of one observable, analysed after discarding the transient.
pub struct TimeSeries {
    vals: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeSeriesReport {
    pub mean: f64,
    pub std_dev: f64,
    pub sem: f64,
    /// Final value of the series.
    pub last: f64,
    /// Whether a transient shorter than half the series was detected.
    pub is_equil: bool,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self { vals: Vec::new() }
    }

    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    pub fn report(&self) -> TimeSeriesReport {
        let n_vals = self.vals.len();
        let i_equil = equilibration_index(&self.vals);
        let tail = &self.vals[i_equil..];
        TimeSeriesReport {
            mean: mean(tail),
            std_dev: variance(tail).sqrt(),
            sem: blocking_sem(tail),
            last: self.vals.last().copied().unwrap_or(f64::NAN),
            is_equil: n_vals > 0 && i_equil != n_vals / 2,
        }
    }
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn variance(vals: &[f64]) -> f64 {
    let n_vals = vals.len();
    if n_vals < 2 {
        return f64::NAN;
    }
    let mean = mean(vals);
    vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (n_vals - 1) as f64
}

/// Standard error of the mean of a correlated series (Flyvbjerg-Petersen blocking).
fn blocking_sem(vals: &[f64]) -> f64 {
    let mut blocks = vals.to_vec();
    let mut sem2_ests = Vec::new();
    let mut sem2_errs = Vec::new();

    while blocks.len() >= 2 {
        let n_blocks = blocks.len() as f64;
        let sem2 = variance(&blocks) / n_blocks;
        sem2_ests.push(sem2);
        sem2_errs.push(sem2 * (2.0 / (n_blocks - 1.0)).sqrt());
        blocks = blocks
            .chunks_exact(2)
            .map(|pair| 0.5 * (pair[0] + pair[1]))
            .collect();
    }

    // First plateau: an estimate above every later lower error bound.
    for (idx, &sem2) in sem2_ests.iter().enumerate() {
        let max_low = sem2_ests[idx..]
            .iter()
            .zip(&sem2_errs[idx..])
            .map(|(est, err)| est - err)
            .fold(f64::NEG_INFINITY, f64::max);
        if sem2 > max_low {
            return sem2.sqrt();
        }
    }

    sem2_ests.last().copied().unwrap_or(f64::NAN).sqrt()
}

/// Start of the equilibrated tail by the marginal standard error rule.
fn equilibration_index(vals: &[f64]) -> usize {
    let n_vals = vals.len();
    if n_vals == 0 {
        return 0;
    }
    let n_cands = n_vals.ilog2() + 1;
    let mut best = (f64::INFINITY, n_vals / 2);
    for idx in 0..n_cands {
        let i_equil = n_vals / 2usize.pow(n_cands - idx);
        let tail = &vals[i_equil..];
        let n_tail = tail.len();
        let mse = variance(tail) * (n_tail - 1) as f64 / n_tail.pow(2) as f64;
        if mse < best.0 {
            best = (mse, i_equil);
        }
    }
    best.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_moments() {
        let mut acc = Accumulator::new();
        for val in [1.0, 2.0, 3.0, 4.0] {
            acc.add(val);
        }
        let rep = acc.report();
        assert!((rep.mean - 2.5).abs() < 1e-15);
        assert!((rep.std_dev - (5.0f64 / 3.0).sqrt()).abs() < 1e-15);
        assert!(Accumulator::new().report().mean.is_nan());
    }

    #[test]
    fn relaxing_series_discards_transient() {
        let mut ts = TimeSeries::new();
        for i in 0..1024 {
            let i = i as f64;
            ts.push(1.0 + 5.0 * (-i / 20.0).exp() + 0.01 * (i * 0.7).sin());
        }
        let rep = ts.report();
        assert!((rep.mean - 1.0).abs() < 0.01, "{rep:?}");
        assert!(rep.sem < 0.01, "{rep:?}");
        assert!((rep.last - (1.0 + 0.01 * (1023.0f64 * 0.7).sin())).abs() < 1e-9);
    }

    #[test]
    fn empty_series_reports_nan() {
        let rep = TimeSeries::new().report();
        assert!(rep.mean.is_nan() && rep.last.is_nan());
        assert!(!rep.is_equil);
    }

    #[test]
    fn constant_series_is_equilibrated() {
        let mut ts = TimeSeries::new();
        for _ in 0..8 {
            ts.push(0.5);
        }
        let rep = ts.report();
        assert!(rep.is_equil, "{rep:?}");
        assert_eq!(rep.mean, 0.5);
        assert_eq!(rep.std_dev, 0.0);
        assert_eq!(rep.sem, 0.0);
        assert_eq!(rep.last, 0.5);
    }

    #[test]
    fn single_value_is_not_equilibrated() {
        let mut ts = TimeSeries::new();
        ts.push(2.0);
        let rep = ts.report();
        assert!(!rep.is_equil);
        assert_eq!(rep.mean, 2.0);
        assert_eq!(rep.last, 2.0);
        assert!(rep.std_dev.is_nan() && rep.sem.is_nan());
    }

    #[test]
    fn steady_drift_is_not_equilibrated() {
        let mut ts = TimeSeries::new();
        for i in 0..64 {
            ts.push(i as f64);
        }
        let rep = ts.report();
        assert!(!rep.is_equil, "{rep:?}");
        assert_eq!(rep.mean, 47.5);
        assert_eq!(rep.last, 63.0);
    }
}
