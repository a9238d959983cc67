use crate::config::Config;
use crate::model::Record;
use crate::ode::rk4_integrate;
use crate::system::{CoupledSystem, EXTINCTION_FLOOR};
use anyhow::{Context, Result, bail};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Holds the configuration, current time and state vector, and provides
/// methods to integrate, save, and load simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    time: f64,
    state: Vec<f64>,
    #[serde(skip)]
    system: Option<CoupledSystem>,
}

impl Engine {
    /// Create a new `Engine` at the configured initial condition.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let system = cfg.system().context("failed to build system")?;
        let state = cfg.initial_state();
        Ok(Self {
            cfg,
            time: 0.0,
            state,
            system: Some(system),
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Integrate the model and save the resulting records to a binary file.
    ///
    /// The first file of a run also starts with the record at `t = 0`.
    pub fn run_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        if self.time == 0.0 {
            let record = self.record().context("failed to evaluate initial record")?;
            encode::write_named(&mut writer, &record).context("failed to serialize record")?;
        }

        let saves_per_file = self.cfg.output.saves_per_file;
        for i_save in 0..saves_per_file {
            self.perform_interval()
                .with_context(|| format!("failed to integrate from t={}", self.time))?;

            let record = self.record().context("failed to evaluate record")?;
            log::debug!("{record:?}");
            encode::write_named(&mut writer, &record).context("failed to serialize record")?;

            let progress = 100.0 * (i_save + 1) as f64 / saves_per_file as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write_named(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let mut engine: Self =
            decode::from_read(&mut reader).context("failed to deserialize engine")?;
        engine.system = Some(engine.cfg.system().context("failed to build system")?);
        Ok(engine)
    }

    fn system(&self) -> Result<&CoupledSystem> {
        self.system.as_ref().context("system is not initialized")
    }

    fn perform_interval(&mut self) -> Result<()> {
        let output = &self.cfg.output;
        let dt = output.time_step;
        let t_end = self.time + dt * output.steps_per_save as f64;
        let bounds = self.cfg.state_bounds();

        let system = self.system()?;
        let traj = rk4_integrate(
            |y, t| system.derivative(y, t),
            &self.state,
            self.time,
            t_end,
            dt,
            Some(&bounds),
        )
        .context("failed to evaluate derivative")?;
        log::debug!(
            "integrated {} steps to t={:?}",
            traj.steps,
            traj.t.last()
        );

        if let Some(row) = traj.y.iter().find(|row| row.iter().any(|val| !val.is_finite())) {
            bail!("state became non-finite: {row:?}");
        }

        let was_alive = self.state[1..].iter().sum::<f64>() >= EXTINCTION_FLOOR;
        let is_alive = traj.y_final[1..].iter().sum::<f64>() >= EXTINCTION_FLOOR;
        if was_alive && !is_alive {
            log::warn!("predator populations collapsed below {EXTINCTION_FLOOR:e} by t={t_end}");
        }

        self.time = t_end;
        self.state = traj.y_final;

        Ok(())
    }

    fn record(&self) -> Result<Record> {
        let payoffs = self.system()?.payoffs(&self.state)?;
        Ok(Record {
            time: self.time,
            alert_freq: self.state[0],
            populations: self.state[1..].to_vec(),
            payoff_alerting: payoffs.alerting,
            payoff_silent: payoffs.silent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    const CONFIG: &str = r#"
[model]
group_size = 3
alert_cost = 2.0
growth_rate = 0.3
mortality_rate = 0.1

[[model.predators]]
p = 0.9
p_prime_base = 0.35
p_min = 0.26
b = 1.0

[[model.predators]]
p = 0.6
p_prime_base = 0.35
p_min = 0.26
b = 1.0

[init]
alert_freq = 0.2
populations = [10.0, 10.0]

[output]
time_step = 0.5
steps_per_save = 10
saves_per_file = 20
"#;

    fn read_records(file: &Path, n: usize) -> Vec<Record> {
        let mut reader = BufReader::new(File::open(file).unwrap());
        (0..n).map(|_| decode::from_read(&mut reader).unwrap()).collect()
    }

    #[test]
    fn checkpoint_resume_matches_continuous_run() {
        let dir = env::temp_dir().join(format!("vigil-engine-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let cfg = Config::from_toml(CONFIG).unwrap();

        let mut split = Engine::generate_initial_condition(cfg.clone()).unwrap();
        split.run_simulation(dir.join("a0.msgpack")).unwrap();
        split.save_checkpoint(dir.join("checkpoint.msgpack")).unwrap();
        let mut resumed = Engine::load_checkpoint(dir.join("checkpoint.msgpack")).unwrap();
        assert_eq!(resumed.cfg(), &cfg);
        resumed.run_simulation(dir.join("a1.msgpack")).unwrap();

        let mut long_cfg = cfg.clone();
        long_cfg.output.saves_per_file *= 2;
        let mut whole = Engine::generate_initial_condition(long_cfg).unwrap();
        whole.run_simulation(dir.join("b.msgpack")).unwrap();

        let first = read_records(&dir.join("a0.msgpack"), 21);
        let second = read_records(&dir.join("a1.msgpack"), 20);
        let both = read_records(&dir.join("b.msgpack"), 41);
        assert_eq!(first.len() + second.len(), both.len());
        for (a, b) in first.iter().chain(&second).zip(&both) {
            assert_eq!(a, b);
        }

        assert_eq!(both[0].time, 0.0);
        assert_eq!(both[0].alert_freq, 0.2);
        assert_eq!(both[0].populations, vec![10.0, 10.0]);
        assert!((second[0].time - 105.0).abs() < 1e-9);
        assert!((both[40].time - 200.0).abs() < 1e-9);
        assert!(both.iter().all(Record::is_finite));
        assert!(both.iter().all(|rec| (0.0..=1.0).contains(&rec.alert_freq)));

        fs::remove_dir_all(&dir).ok();
    }
}
