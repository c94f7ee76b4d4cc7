use crate::config::{Config, ModelKind};
use crate::engine::{Patient, SimplePatient};
use crate::model::{ResistantVirus, SimpleVirus};
use crate::types::Record;
use anyhow::{Context, Result};
use rand_chacha::ChaCha12Rng;
use rmp_serde::encode;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

enum Host {
    Untreated(SimplePatient),
    Treated(Patient),
}

/// Single trial: one patient followed for the configured number of steps.
pub struct Simulation {
    cfg: Config,
    tracked_drugs: Vec<String>,
    host: Host,
}

impl Simulation {
    /// Create a new `Simulation` whose patient hosts `n_viruses` copies of the configured virus.
    pub fn generate_initial_condition(cfg: Config, rng: ChaCha12Rng) -> Result<Self> {
        let n_viruses = cfg.init.n_viruses;
        let max_pop = cfg.init.max_pop;
        let model = &cfg.model;

        let host = match model.kind {
            ModelKind::Simple => {
                let virus = SimpleVirus::new(model.max_birth_prob, model.clear_prob)
                    .context("failed to construct virus")?;
                let patient = SimplePatient::new(vec![virus; n_viruses], max_pop, rng)
                    .context("failed to construct patient")?;
                Host::Untreated(patient)
            }
            ModelKind::Resistant => {
                let virus = ResistantVirus::new(
                    model.max_birth_prob,
                    model.clear_prob,
                    model.resistances.clone(),
                    model.mut_prob,
                )
                .context("failed to construct virus")?;
                let patient = Patient::new(vec![virus; n_viruses], max_pop, rng)
                    .context("failed to construct patient")?;
                Host::Treated(patient)
            }
        };

        let tracked_drugs = cfg.tracked_drugs();

        Ok(Self {
            cfg,
            tracked_drugs,
            host,
        })
    }

    /// Perform the simulation and save one record per step to a binary file.
    ///
    /// Returns the final total population.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<usize> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let record = self.record(0).context("failed to record initial state")?;
        encode::write(&mut writer, &record).context("failed to serialize record")?;

        for step in 0..self.cfg.output.n_steps {
            self.apply_prescriptions(step);

            self.perform_step()
                .with_context(|| format!("failed to perform step {step}"))?;

            let record = self
                .record(step + 1)
                .with_context(|| format!("failed to record step {}", step + 1))?;
            encode::write(&mut writer, &record).context("failed to serialize record")?;
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(self.total_pop())
    }

    fn apply_prescriptions(&mut self, step: usize) {
        if let Host::Treated(patient) = &mut self.host {
            for drug in self.cfg.prescriptions_at(step) {
                patient.add_prescription(drug);
            }
        }
    }

    fn perform_step(&mut self) -> Result<usize> {
        match &mut self.host {
            Host::Untreated(patient) => Ok(patient.update()),
            Host::Treated(patient) => patient.update(),
        }
    }

    fn total_pop(&self) -> usize {
        match &self.host {
            Host::Untreated(patient) => patient.total_pop(),
            Host::Treated(patient) => patient.total_pop(),
        }
    }

    fn record(&self, step: usize) -> Result<Record> {
        let record = match &self.host {
            Host::Untreated(patient) => Record {
                step,
                total_pop: patient.total_pop(),
                resist_pop: Vec::new(),
                resist_pop_all: patient.total_pop(),
                prescriptions: Vec::new(),
            },
            Host::Treated(patient) => {
                let mut resist_pop = Vec::with_capacity(self.tracked_drugs.len());
                for drug in &self.tracked_drugs {
                    resist_pop.push(patient.resist_pop(&[drug])?);
                }
                Record {
                    step,
                    total_pop: patient.total_pop(),
                    resist_pop,
                    resist_pop_all: patient.resist_pop(&self.tracked_drugs)?,
                    prescriptions: patient.prescriptions().to_vec(),
                }
            }
        };
        Ok(record)
    }
}
