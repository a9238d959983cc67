use crate::config::Config;
use crate::model::Record;
use crate::stats::{Accumulator, TimeSeries};
use anyhow::{Context, Result, bail};
use rmp_serde::{decode, encode};
use serde_value::Value;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

/// Observable computed over the records of a run.
pub trait Obs {
    fn name(&self) -> &'static str;
    fn update(&mut self, record: &Record) -> Result<()>;
    fn report(&self) -> Result<Value>;
}

fn to_value<T: serde::Serialize>(report: T) -> Result<Value> {
    serde_value::to_value(report).context("failed to serialize report")
}

pub struct AlertFreq {
    time_series: TimeSeries,
}

impl AlertFreq {
    pub fn new() -> Self {
        Self {
            time_series: TimeSeries::new(),
        }
    }
}

impl Obs for AlertFreq {
    fn name(&self) -> &'static str {
        "alert_freq"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        self.time_series.push(record.alert_freq);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        to_value(self.time_series.report())
    }
}

pub struct Populations {
    time_series_vec: Vec<TimeSeries>,
}

impl Populations {
    pub fn new(cfg: &Config) -> Self {
        let mut time_series_vec = Vec::new();
        time_series_vec.resize_with(cfg.model.predators.len(), TimeSeries::new);
        Self { time_series_vec }
    }
}

impl Obs for Populations {
    fn name(&self) -> &'static str {
        "populations"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        let n_pred = self.time_series_vec.len();
        if record.populations.len() != n_pred {
            bail!(
                "record has {} populations, expected {n_pred}",
                record.populations.len()
            );
        }
        for (time_series, &pop) in self.time_series_vec.iter_mut().zip(&record.populations) {
            time_series.push(pop);
        }
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let reports: Vec<_> = self.time_series_vec.iter().map(TimeSeries::report).collect();
        to_value(reports)
    }
}

pub struct PredatorFractions {
    acc_vec: Vec<Accumulator>,
}

impl PredatorFractions {
    pub fn new(cfg: &Config) -> Self {
        let mut acc_vec = Vec::new();
        acc_vec.resize_with(cfg.model.predators.len(), Accumulator::new);
        Self { acc_vec }
    }
}

impl Obs for PredatorFractions {
    fn name(&self) -> &'static str {
        "predator_fractions"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        let total = record.total_population();
        // Fractions are undefined once every type is extinct.
        if total <= 0.0 {
            return Ok(());
        }
        for (acc, &pop) in self.acc_vec.iter_mut().zip(&record.populations) {
            acc.add(pop / total);
        }
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let reports: Vec<_> = self.acc_vec.iter().map(Accumulator::report).collect();
        to_value(reports)
    }
}

/// Advantage of alerting, `pa - pna`.
pub struct PayoffGap {
    time_series: TimeSeries,
}

impl PayoffGap {
    pub fn new() -> Self {
        Self {
            time_series: TimeSeries::new(),
        }
    }
}

impl Obs for PayoffGap {
    fn name(&self) -> &'static str {
        "payoff_gap"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        self.time_series
            .push(record.payoff_alerting - record.payoff_silent);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        to_value(self.time_series.report())
    }
}

pub struct Finite {
    n_records: usize,
    n_non_finite: usize,
}

impl Finite {
    pub fn new() -> Self {
        Self {
            n_records: 0,
            n_non_finite: 0,
        }
    }
}

impl Obs for Finite {
    fn name(&self) -> &'static str {
        "finite"
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        self.n_records += 1;
        if !record.is_finite() {
            self.n_non_finite += 1;
        }
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let mut map = BTreeMap::new();
        map.insert("n_records", self.n_records as u64);
        map.insert("n_non_finite", self.n_non_finite as u64);
        to_value(map)
    }
}

pub struct Analyzer {
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: &Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(AlertFreq::new()),
            Box::new(Populations::new(cfg)),
            Box::new(PredatorFractions::new(cfg)),
            Box::new(PayoffGap::new()),
            Box::new(Finite::new()),
        ];
        Self { obs_ptr_vec }
    }

    /// Feed every record of a trajectory file, up to end of file.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        while !reader.fill_buf().context("failed to read file")?.is_empty() {
            let record: Record = decode::from_read(&mut reader).context("failed to read record")?;
            self.add_record(&record)?;
        }
        Ok(())
    }

    pub fn add_record(&mut self, record: &Record) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(record)
                .with_context(|| format!("failed to update {}", obs.name()))?;
        }
        Ok(())
    }

    pub fn results(&self) -> Result<BTreeMap<&'static str, Value>> {
        let mut results = BTreeMap::new();
        for obs in &self.obs_ptr_vec {
            let report = obs
                .report()
                .with_context(|| format!("failed to report {}", obs.name()))?;
            results.insert(obs.name(), report);
        }
        Ok(results)
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let results = self.results()?;
        encode::write_named(&mut writer, &results).context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
