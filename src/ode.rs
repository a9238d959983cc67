//! Fixed-step classical Runge-Kutta (RK4) integrator.
//!
//! The right-hand side is fallible: an error from any stage aborts the
//! integration and is returned unchanged.

/// Sampled trajectory of an integration.
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// Time points sampled.
    pub t: Vec<f64>,
    /// `y[i]` is the state vector at `t[i]`.
    pub y: Vec<Vec<f64>>,
    /// State at the last time point.
    pub y_final: Vec<f64>,
    /// Number of RK4 steps taken.
    pub steps: usize,
}

fn axpy(y: &[f64], k: &[f64], h: f64) -> Vec<f64> {
    y.iter().zip(k).map(|(&yi, &ki)| h.mul_add(ki, yi)).collect()
}

/// Advance `y` at time `t` by one step `dt` of `dy/dt = f(y, t)`.
pub fn rk4_step<F, E>(f: &F, y: &[f64], t: f64, dt: f64) -> Result<Vec<f64>, E>
where
    F: Fn(&[f64], f64) -> Result<Vec<f64>, E>,
{
    let half_dt = 0.5 * dt;
    let k1 = f(y, t)?;
    let k2 = f(&axpy(y, &k1, half_dt), t + half_dt)?;
    let k3 = f(&axpy(y, &k2, half_dt), t + half_dt)?;
    let k4 = f(&axpy(y, &k3, dt), t + dt)?;

    let sixth_dt = dt / 6.0;
    Ok(y.iter()
        .enumerate()
        .map(|(i, &yi)| {
            let slope = 2.0f64.mul_add(k2[i] + k3[i], k1[i] + k4[i]);
            sixth_dt.mul_add(slope, yi)
        })
        .collect())
}

/// Integrate from `t_start` to `t_end` with step `dt`.
///
/// `clamp` holds optional per-variable `(min, max)` bounds applied after each step.
/// A step that is not positive and finite takes no steps and returns `y0`.
pub fn rk4_integrate<F, E>(
    f: F,
    y0: &[f64],
    t_start: f64,
    t_end: f64,
    dt: f64,
    clamp: Option<&[(f64, f64)]>,
) -> Result<Trajectory, E>
where
    F: Fn(&[f64], f64) -> Result<Vec<f64>, E>,
{
    let span = t_end - t_start;
    let n_steps = if dt > 0.0 && dt.is_finite() && span.is_finite() {
        (span / dt).ceil().max(0.0) as usize
    } else {
        0
    };

    let mut t_vec = Vec::with_capacity(n_steps + 1);
    let mut y_vec = Vec::with_capacity(n_steps + 1);

    let mut t = t_start;
    let mut y = y0.to_vec();
    t_vec.push(t);
    y_vec.push(y.clone());

    let mut steps = 0;
    for _ in 0..n_steps {
        let actual_dt = dt.min(t_end - t);
        if actual_dt <= 0.0 {
            break;
        }
        y = rk4_step(&f, &y, t, actual_dt)?;

        if let Some(bounds) = clamp {
            for (yi, &(lo, hi)) in y.iter_mut().zip(bounds) {
                *yi = yi.clamp(lo, hi);
            }
        }

        t += actual_dt;
        steps += 1;
        t_vec.push(t);
        y_vec.push(y.clone());
    }

    Ok(Trajectory {
        t: t_vec,
        y: y_vec,
        y_final: y,
        steps,
    })
}
