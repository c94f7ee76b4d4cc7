use crate::model::Resistances;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Seed of the random number generator (drawn from the OS if absent).
    pub seed: Option<u64>,

    pub model: ModelConfig,
    pub init: InitConfig,
    #[serde(default)]
    pub treatment: TreatmentConfig,
    pub output: OutputConfig,
}

/// Kind of virus and patient to simulate.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Viruses without resistances in an untreated patient.
    Simple,
    /// Viruses with drug resistances in a treated patient.
    Resistant,
}

/// Virus parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub kind: ModelKind,

    /// Maximum reproduction probability.
    pub max_birth_prob: f64,
    /// Clearance probability.
    pub clear_prob: f64,

    /// Probability of flipping each resistance in an offspring.
    #[serde(default)]
    pub mut_prob: f64,
    /// Initial resistance to each tracked drug.
    #[serde(default)]
    pub resistances: Resistances,
}

/// Initial condition parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitConfig {
    /// Initial number of viruses.
    pub n_viruses: usize,
    /// Population capacity of the patient.
    pub max_pop: usize,
}

/// Drug schedule.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreatmentConfig {
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
}

/// Drug administered from step `step` onwards.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prescription {
    pub drug: String,
    pub step: usize,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Number of steps per trial.
    pub n_steps: usize,
    /// Number of independent patients per run.
    pub n_trials: usize,
    /// Final population at or below which a patient counts as cured.
    pub cure_threshold: usize,
    /// Number of bins of the final population histogram.
    pub hist_bins: usize,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&text)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Names of the tracked drugs, in iteration order.
    pub fn tracked_drugs(&self) -> Vec<String> {
        self.model.resistances.keys().cloned().collect()
    }

    /// Drugs scheduled to start at `step`.
    pub fn prescriptions_at(&self, step: usize) -> impl Iterator<Item = &str> {
        self.treatment
            .prescriptions
            .iter()
            .filter(move |prescription| prescription.step == step)
            .map(|prescription| prescription.drug.as_str())
    }

    fn validate(&self) -> Result<()> {
        check_num(self.model.max_birth_prob, 0.0..=1.0)
            .context("invalid maximum birth probability")?;
        check_num(self.model.clear_prob, 0.0..=1.0).context("invalid clearance probability")?;
        check_num(self.model.mut_prob, 0.0..=1.0).context("invalid mutation probability")?;

        check_num(self.init.n_viruses, 0..100_000).context("invalid initial number of viruses")?;
        check_num(self.init.max_pop, 1..1_000_000).context("invalid maximum population")?;

        check_num(self.output.n_steps, 1..100_000).context("invalid number of steps")?;
        check_num(self.output.n_trials, 1..100_000).context("invalid number of trials")?;
        check_num(self.output.hist_bins, 1..1_000).context("invalid number of histogram bins")?;

        match self.model.kind {
            ModelKind::Simple => {
                if !self.model.resistances.is_empty() {
                    bail!("simple model must not track resistances");
                }
                if !self.treatment.prescriptions.is_empty() {
                    bail!("simple model must not have prescriptions");
                }
            }
            ModelKind::Resistant => {
                for (i_pre, prescription) in self.treatment.prescriptions.iter().enumerate() {
                    check_prescription(prescription, &self.model.resistances, self.output.n_steps)
                        .with_context(|| format!("invalid prescription {i_pre}"))?;
                }
            }
        }

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_prescription(
    prescription: &Prescription,
    resistances: &Resistances,
    n_steps: usize,
) -> Result<()> {
    let drug = &prescription.drug;
    if !resistances.contains_key(drug) {
        bail!("drug {drug:?} is not a tracked resistance");
    }
    check_num(prescription.step, 0..n_steps).context("invalid prescription step")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESISTANT: &str = r#"
seed = 7

[model]
kind = "resistant"
max_birth_prob = 0.1
clear_prob = 0.05
mut_prob = 0.005
resistances = { guttagonol = false, grimpex = false }

[init]
n_viruses = 100
max_pop = 1000

[treatment]
prescriptions = [ { drug = "guttagonol", step = 150 }, { drug = "grimpex", step = 300 } ]

[output]
n_steps = 450
n_trials = 30
cure_threshold = 50
hist_bins = 10
"#;

    const SIMPLE: &str = r#"
[model]
kind = "simple"
max_birth_prob = 0.1
clear_prob = 0.05

[init]
n_viruses = 100
max_pop = 1000

[output]
n_steps = 300
n_trials = 1
cure_threshold = 50
hist_bins = 10
"#;

    #[test]
    fn parses_resistant_config() {
        let cfg = Config::from_toml(RESISTANT).unwrap();
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.model.kind, ModelKind::Resistant);
        assert_eq!(cfg.tracked_drugs(), ["grimpex", "guttagonol"]);
        assert_eq!(cfg.prescriptions_at(150).collect::<Vec<_>>(), ["guttagonol"]);
        assert_eq!(cfg.prescriptions_at(151).count(), 0);
    }

    #[test]
    fn parses_simple_config() {
        let cfg = Config::from_toml(SIMPLE).unwrap();
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.model.kind, ModelKind::Simple);
        assert_eq!(cfg.model.mut_prob, 0.0);
        assert!(cfg.treatment.prescriptions.is_empty());
    }

    #[test]
    fn rejects_untracked_prescription() {
        let text = RESISTANT.replace("drug = \"grimpex\"", "drug = \"imaginol\"");
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn rejects_late_prescription() {
        let text = RESISTANT.replace("step = 300", "step = 450");
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let text = SIMPLE.replace("clear_prob = 0.05", "clear_prob = 1.5");
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn rejects_resistances_in_simple_model() {
        let text = SIMPLE.replace(
            "clear_prob = 0.05",
            "clear_prob = 0.05\nresistances = { a = true }",
        );
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn rejects_zero_capacity() {
        let text = SIMPLE.replace("max_pop = 1000", "max_pop = 0");
        assert!(Config::from_toml(&text).is_err());
    }
}
