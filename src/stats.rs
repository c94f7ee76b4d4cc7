use serde::{Deserialize, Serialize};

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
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

/// Equal-width histogram over the range spanned by the collected values.
pub struct Histogram {
    n_bins: usize,
    vals: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistogramReport {
    /// Bin edges (`n_bins + 1` values).
    pub edges: Vec<f64>,
    /// Number of values in each bin.
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn new(n_bins: usize) -> Self {
        Self {
            n_bins,
            vals: Vec::new(),
        }
    }

    pub fn add(&mut self, val: f64) {
        self.vals.push(val);
    }

    pub fn report(&self) -> HistogramReport {
        let n_bins = self.n_bins.max(1);
        let mut counts = vec![0; n_bins];
        if self.vals.is_empty() {
            return HistogramReport {
                edges: vec![0.0; n_bins + 1],
                counts,
            };
        }

        let min = self.vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Widen a degenerate range so every value lands in the first bin.
        let width = if max > min { (max - min) / n_bins as f64 } else { 1.0 };

        for &val in &self.vals {
            // The maximum belongs to the last bin.
            let i_bin = (((val - min) / width) as usize).min(n_bins - 1);
            counts[i_bin] += 1;
        }

        let edges = (0..=n_bins).map(|i| min + i as f64 * width).collect();
        HistogramReport { edges, counts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_matches_sample_statistics() {
        let mut acc = Accumulator::new();
        for val in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add(val);
        }
        let report = acc.report();
        assert!((report.mean - 5.0).abs() < 1e-12);
        assert!((report.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn accumulator_needs_two_values_for_std_dev() {
        let mut acc = Accumulator::new();
        assert!(acc.report().mean.is_nan());
        acc.add(3.0);
        let report = acc.report();
        assert_eq!(report.mean, 3.0);
        assert!(report.std_dev.is_nan());
    }

    #[test]
    fn histogram_counts_every_value() {
        let mut hist = Histogram::new(4);
        for val in [0.0, 1.0, 2.0, 3.0, 4.0, 8.0] {
            hist.add(val);
        }
        let report = hist.report();
        assert_eq!(report.edges, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(report.counts, vec![2, 2, 1, 1]);
    }

    #[test]
    fn histogram_handles_identical_values() {
        let mut hist = Histogram::new(3);
        for _ in 0..5 {
            hist.add(12.0);
        }
        let report = hist.report();
        assert_eq!(report.counts, vec![5, 0, 0]);
        assert_eq!(report.edges[0], 12.0);
    }
}
