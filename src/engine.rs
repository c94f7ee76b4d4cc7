use crate::errors::EngineError;
use crate::model::{ResistantVirus, SimpleVirus, Virus};
use anyhow::Result;
use rand_chacha::ChaCha12Rng;
use std::convert::Infallible;

/// Patient hosting a population of [`SimpleVirus`] particles.
///
/// No drugs can be administered to this patient.
pub struct SimplePatient {
    viruses: Vec<SimpleVirus>,
    max_pop: usize,
    rng: ChaCha12Rng,
}

impl SimplePatient {
    /// Create a new `SimplePatient` owning the initial population.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidParameter`] if `max_pop` is zero.
    pub fn new(viruses: Vec<SimpleVirus>, max_pop: usize, rng: ChaCha12Rng) -> Result<Self> {
        check_max_pop(max_pop)?;
        Ok(Self {
            viruses,
            max_pop,
            rng,
        })
    }

    pub fn total_pop(&self) -> usize {
        self.viruses.len()
    }

    /// Advance the population by one step and return its new size.
    pub fn update(&mut self) -> usize {
        let Ok(total_pop) = perform_step(
            &mut self.viruses,
            self.max_pop,
            &mut self.rng,
            |virus, pop_density, rng| Ok::<_, Infallible>(virus.reproduce(pop_density, rng)),
        );
        total_pop
    }
}

/// Patient hosting a population of [`ResistantVirus`] particles and
/// taking a growing set of drugs.
pub struct Patient {
    viruses: Vec<ResistantVirus>,
    max_pop: usize,
    prescriptions: Vec<String>,
    rng: ChaCha12Rng,
}

impl Patient {
    /// Create a new `Patient` owning the initial population, with no drugs administered.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidParameter`] if `max_pop` is zero.
    pub fn new(viruses: Vec<ResistantVirus>, max_pop: usize, rng: ChaCha12Rng) -> Result<Self> {
        check_max_pop(max_pop)?;
        Ok(Self {
            viruses,
            max_pop,
            prescriptions: Vec::new(),
            rng,
        })
    }

    pub fn total_pop(&self) -> usize {
        self.viruses.len()
    }

    /// Administer `drug` for all subsequent steps.
    ///
    /// Has no effect if `drug` is already administered.
    pub fn add_prescription(&mut self, drug: &str) {
        if self.prescriptions.iter().any(|d| d == drug) {
            return;
        }
        log::debug!("prescribed {drug:?}");
        self.prescriptions.push(drug.to_string());
    }

    /// Drugs currently administered, in the order they were prescribed.
    pub fn prescriptions(&self) -> &[String] {
        &self.prescriptions
    }

    /// Number of particles resistant to every drug in `drugs`.
    ///
    /// An empty `drugs` slice counts the whole population.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownDrug`] if a drug is not tracked by some particle.
    pub fn resist_pop<S: AsRef<str>>(&self, drugs: &[S]) -> Result<usize> {
        let mut n_resist = 0;
        'viruses: for virus in &self.viruses {
            for drug in drugs {
                if !virus.resistance(drug.as_ref())? {
                    continue 'viruses;
                }
            }
            n_resist += 1;
        }
        Ok(n_resist)
    }

    /// Advance the population by one step and return its new size.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownDrug`] if an administered drug is not
    /// tracked by a particle attempting to reproduce. The population is then
    /// left in its post-clearance state, without any offspring of this step.
    pub fn update(&mut self) -> Result<usize> {
        let prescriptions = &self.prescriptions;
        perform_step(
            &mut self.viruses,
            self.max_pop,
            &mut self.rng,
            |virus, pop_density, rng| virus.reproduce(pop_density, prescriptions, rng),
        )
    }
}

/// Single step shared by both patients.
///
/// Clearance is decided for every particle first; the density is then fixed
/// from the survivors and only the survivors attempt to reproduce. Offspring
/// are appended in parent order.
fn perform_step<V, F, E>(
    viruses: &mut Vec<V>,
    max_pop: usize,
    rng: &mut ChaCha12Rng,
    mut reproduce: F,
) -> Result<usize, E>
where
    V: Virus,
    F: FnMut(&V, f64, &mut ChaCha12Rng) -> Result<Option<V>, E>,
{
    viruses.retain(|virus| !virus.does_clear(rng));

    let pop_density = viruses.len() as f64 / max_pop as f64;

    let mut offspring = Vec::new();
    for virus in viruses.iter() {
        if let Some(child) = reproduce(virus, pop_density, rng)? {
            offspring.push(child);
        }
    }
    viruses.extend(offspring);

    Ok(viruses.len())
}

fn check_max_pop(max_pop: usize) -> Result<()> {
    if max_pop == 0 {
        return Err(EngineError::InvalidParameter("max_pop must be positive".to_string()).into());
    }
    Ok(())
}
