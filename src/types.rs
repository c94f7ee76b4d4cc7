//! Simulation data types.

use serde::{Deserialize, Serialize};

/// Record of a trial at a single step.
///
/// Step 0 is the initial population, step `k` the population after `k` updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Current simulation step.
    pub step: usize,

    /// Total number of viruses.
    pub total_pop: usize,

    /// Number of viruses resistant to each tracked drug (in tracked-drug order).
    pub resist_pop: Vec<usize>,

    /// Number of viruses resistant to every tracked drug.
    pub resist_pop_all: usize,

    /// Drugs administered so far, in prescription order.
    pub prescriptions: Vec<String>,
}
