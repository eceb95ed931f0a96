use std::fmt::{self, Display, Formatter};

use crate::feature::Feature;

/// Per-feature posterior probabilities after both sweeps:
/// `exp(forward + backward - Z)`, with the partition `Z` read off BEGIN's
/// backward score (equal to END's forward score up to rounding). Invalidated
/// features carry negative-infinity scores and naturally come out at zero.
#[must_use]
pub fn posteriors(feats: &[Feature]) -> Vec<f64> {
    let z = feats[0].backward_score;
    debug_assert!(z.is_finite(), "posteriors requested without a completed backward sweep");
    feats
        .iter()
        .map(|f| (f.forward_score + f.backward_score - z).exp())
        .collect()
}

/// One bin of the posterior calibration histogram.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationBin {
    pub lower  : f64,
    pub upper  : f64,
    pub total  : usize,
    pub correct: usize,
}

impl CalibrationBin {
    /// Fraction of features in this bin that lie on the reference path.
    /// Well-calibrated posteriors put this near the bin midpoint.
    #[must_use]
    pub fn proportion(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl Display for CalibrationBin {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:4.3}:{:4.3}\t{:.3}", self.lower, self.upper, self.proportion())
    }
}

/// Bin every feature by posterior probability and report, per bin, the
/// fraction flagged as lying on the reference path.
#[must_use]
pub fn accuracy_histogram(feats: &[Feature], bins: usize) -> Vec<CalibrationBin> {
    let width = 1.0 / bins as f64;
    let mut histogram: Vec<CalibrationBin> = (0..bins)
        .map(|i| CalibrationBin {
            lower: width * i as f64,
            upper: width * (i + 1) as f64,
            total: 0,
            correct: 0,
        })
        .collect();

    for (feat, post) in feats.iter().zip(posteriors(feats)) {
        // a posterior of exactly 1 falls into the last bin
        let index = ((post * bins as f64) as usize).min(bins - 1);
        histogram[index].total += 1;
        if feat.is_correct {
            histogram[index].correct += 1;
        }
    }

    histogram
}
