use crate::config::Config;
use crate::stats::{Accumulator, Histogram};
use crate::types::Record;
use anyhow::{Context, Result, bail};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, record: &Record) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

fn new_acc_vec(n_vals: usize) -> Vec<Accumulator> {
    let mut acc_vec = Vec::new();
    acc_vec.resize_with(n_vals, Accumulator::new);
    acc_vec
}

/// Total population at every step, averaged over trials.
pub struct TotalPop {
    acc_vec: Vec<Accumulator>,
}

impl TotalPop {
    pub fn new(cfg: &Config) -> Self {
        Self {
            acc_vec: new_acc_vec(cfg.output.n_steps + 1),
        }
    }
}

impl Obs for TotalPop {
    fn update(&mut self, record: &Record) -> Result<()> {
        let acc = self
            .acc_vec
            .get_mut(record.step)
            .with_context(|| format!("step {} out of range", record.step))?;
        acc.add(record.total_pop as f64);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let reports: Vec<_> = self.acc_vec.iter().map(|acc| acc.report()).collect();
        serde_json::json!({ "total_pop": reports })
    }
}

/// Resistant populations at every step, averaged over trials.
///
/// Tracks one series per drug plus one for viruses resistant to all drugs.
pub struct ResistPop {
    drugs: Vec<String>,
    acc_mat: Vec<Vec<Accumulator>>,
    all_acc_vec: Vec<Accumulator>,
}

impl ResistPop {
    pub fn new(cfg: &Config) -> Self {
        let drugs = cfg.tracked_drugs();
        let n_records = cfg.output.n_steps + 1;
        let acc_mat = drugs.iter().map(|_| new_acc_vec(n_records)).collect();
        Self {
            drugs,
            acc_mat,
            all_acc_vec: new_acc_vec(n_records),
        }
    }
}

impl Obs for ResistPop {
    fn update(&mut self, record: &Record) -> Result<()> {
        let n_drugs = self.drugs.len();
        let len = record.resist_pop.len();
        if len != n_drugs {
            bail!("record must count {n_drugs} resistant populations, but counts {len}");
        }

        for (acc_vec, &n_resist) in self.acc_mat.iter_mut().zip(&record.resist_pop) {
            let acc = acc_vec
                .get_mut(record.step)
                .with_context(|| format!("step {} out of range", record.step))?;
            acc.add(n_resist as f64);
        }

        let acc = self
            .all_acc_vec
            .get_mut(record.step)
            .with_context(|| format!("step {} out of range", record.step))?;
        acc.add(record.resist_pop_all as f64);

        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let per_drug: serde_json::Map<_, _> = self
            .drugs
            .iter()
            .zip(&self.acc_mat)
            .map(|(drug, acc_vec)| {
                let reports: Vec<_> = acc_vec.iter().map(|acc| acc.report()).collect();
                (drug.clone(), serde_json::json!(reports))
            })
            .collect();
        let all: Vec<_> = self.all_acc_vec.iter().map(|acc| acc.report()).collect();
        serde_json::json!({ "resist_pop": per_drug, "resist_pop_all": all })
    }
}

/// Distribution of the final total population over trials.
pub struct FinalPop {
    n_steps: usize,
    cure_threshold: usize,
    n_trials: usize,
    n_cured: usize,
    acc: Accumulator,
    hist: Histogram,
}

impl FinalPop {
    pub fn new(cfg: &Config) -> Self {
        Self {
            n_steps: cfg.output.n_steps,
            cure_threshold: cfg.output.cure_threshold,
            n_trials: 0,
            n_cured: 0,
            acc: Accumulator::new(),
            hist: Histogram::new(cfg.output.hist_bins),
        }
    }
}

impl Obs for FinalPop {
    fn update(&mut self, record: &Record) -> Result<()> {
        if record.step != self.n_steps {
            return Ok(());
        }
        self.n_trials += 1;
        if record.total_pop <= self.cure_threshold {
            self.n_cured += 1;
        }
        self.acc.add(record.total_pop as f64);
        self.hist.add(record.total_pop as f64);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let n_trials = self.n_trials;
        let cured_frac = if n_trials > 0 {
            self.n_cured as f64 / n_trials as f64
        } else {
            f64::NAN
        };
        serde_json::json!({
            "final_pop": {
                "n_trials": n_trials,
                "stats": self.acc.report(),
                "cured_frac": cured_frac,
                "hist": self.hist.report(),
            }
        })
    }
}

pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs>> = Vec::new();
        obs_ptr_vec.push(Box::new(TotalPop::new(&cfg)));
        obs_ptr_vec.push(Box::new(ResistPop::new(&cfg)));
        obs_ptr_vec.push(Box::new(FinalPop::new(&cfg)));
        Self { cfg, obs_ptr_vec }
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..=self.cfg.output.n_steps {
            let record = decode::from_read(&mut reader).context("failed to read record")?;
            self.add_record(&record)?;
        }
        Ok(())
    }

    pub fn add_record(&mut self, record: &Record) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(record).context("failed to update observable")?;
        }
        Ok(())
    }

    pub fn reports(&self) -> Vec<serde_json::Value> {
        self.obs_ptr_vec.iter().map(|obs| obs.report()).collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, &self.reports())
            .context("failed to serialize results")?;
        Ok(())
    }
}
