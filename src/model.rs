//! Virus particles and their stochastic decisions.

use crate::errors::EngineError;
use anyhow::Result;
use rand::Rng;
use std::collections::BTreeMap;

/// Resistance state of a virus, keyed by drug name.
///
/// Keys are fixed when the virus is created and iterate in sorted order.
pub type Resistances = BTreeMap<String, bool>;

/// Draw a value uniformly from `[0, 1)`.
pub fn draw_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random()
}

/// Capability shared by every kind of virus particle.
pub trait Virus {
    /// Maximum reproduction probability per step.
    fn max_birth_prob(&self) -> f64;

    /// Clearance probability per step.
    fn clear_prob(&self) -> f64;

    /// Decide whether the particle is cleared from the patient this step.
    ///
    /// Consumes exactly one draw.
    fn does_clear<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        draw_unit(rng) < self.clear_prob()
    }

    /// Reproduction probability at the given population density.
    ///
    /// Not clamped: negative once the density exceeds one.
    fn reproduction_prob(&self, pop_density: f64) -> f64 {
        self.max_birth_prob() * (1.0 - pop_density)
    }
}

/// Virus without any drug resistance.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleVirus {
    max_birth_prob: f64,
    clear_prob: f64,
}

impl SimpleVirus {
    pub fn new(max_birth_prob: f64, clear_prob: f64) -> Result<Self> {
        check_prob("max_birth_prob", max_birth_prob)?;
        check_prob("clear_prob", clear_prob)?;
        Ok(Self {
            max_birth_prob,
            clear_prob,
        })
    }

    /// Attempt to produce one offspring.
    ///
    /// Returns `None` when the particle does not reproduce this step.
    pub fn reproduce<R: Rng + ?Sized>(&self, pop_density: f64, rng: &mut R) -> Option<Self> {
        if draw_unit(rng) < self.reproduction_prob(pop_density) {
            Some(self.clone())
        } else {
            None
        }
    }
}

impl Virus for SimpleVirus {
    fn max_birth_prob(&self) -> f64 {
        self.max_birth_prob
    }

    fn clear_prob(&self) -> f64 {
        self.clear_prob
    }
}

/// Virus that may be resistant to drugs and passes its resistances,
/// possibly mutated, on to its offspring.
#[derive(Debug, Clone, PartialEq)]
pub struct ResistantVirus {
    max_birth_prob: f64,
    clear_prob: f64,
    resistances: Resistances,
    mut_prob: f64,
}

impl ResistantVirus {
    pub fn new(
        max_birth_prob: f64,
        clear_prob: f64,
        resistances: Resistances,
        mut_prob: f64,
    ) -> Result<Self> {
        check_prob("max_birth_prob", max_birth_prob)?;
        check_prob("clear_prob", clear_prob)?;
        check_prob("mut_prob", mut_prob)?;
        Ok(Self {
            max_birth_prob,
            clear_prob,
            resistances,
            mut_prob,
        })
    }

    /// Resistance of this particle to `drug`.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownDrug`] if `drug` is not tracked.
    pub fn resistance(&self, drug: &str) -> Result<bool> {
        self.resistances
            .get(drug)
            .copied()
            .ok_or_else(|| EngineError::UnknownDrug(drug.to_string()).into())
    }

    /// Attempt to produce one offspring while `active_drugs` are administered.
    ///
    /// The particle only gets a chance to reproduce if no drug is active or
    /// it is resistant to at least one active drug. A blocked particle consumes
    /// no draws. Each resistance of the offspring is flipped independently with
    /// probability `mut_prob`, one draw per tracked drug.
    ///
    /// Returns `Ok(None)` when the particle does not reproduce this step.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownDrug`] if an active drug is not tracked.
    pub fn reproduce<S, R>(
        &self,
        pop_density: f64,
        active_drugs: &[S],
        rng: &mut R,
    ) -> Result<Option<Self>>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        if !self.passes_gate(active_drugs)? {
            return Ok(None);
        }

        if draw_unit(rng) >= self.reproduction_prob(pop_density) {
            return Ok(None);
        }

        let resistances = self
            .resistances
            .iter()
            .map(|(drug, &resistant)| {
                let inherited = draw_unit(rng) < 1.0 - self.mut_prob;
                (drug.clone(), if inherited { resistant } else { !resistant })
            })
            .collect();

        Ok(Some(Self {
            max_birth_prob: self.max_birth_prob,
            clear_prob: self.clear_prob,
            resistances,
            mut_prob: self.mut_prob,
        }))
    }

    fn passes_gate<S: AsRef<str>>(&self, active_drugs: &[S]) -> Result<bool> {
        if active_drugs.is_empty() {
            return Ok(true);
        }
        for drug in active_drugs {
            if self.resistance(drug.as_ref())? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Virus for ResistantVirus {
    fn max_birth_prob(&self) -> f64 {
        self.max_birth_prob
    }

    fn clear_prob(&self) -> f64 {
        self.clear_prob
    }
}

fn check_prob(name: &str, prob: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&prob) {
        return Err(EngineError::InvalidParameter(format!(
            "{name} must be in the range 0.0..=1.0, but is {prob}"
        ))
        .into());
    }
    Ok(())
}
