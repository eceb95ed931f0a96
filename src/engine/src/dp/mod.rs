mod forward;
mod backward;
mod linear;
mod traceback;

pub use linear::{legal_predecessors, PredEdge};
pub use traceback::{max_traceback, sample_traceback};

use grammar::Grammar;

use crate::feature::Feature;
use crate::scorer::SegScratch;
use crate::segment::SegmentIndex;
use crate::EngineConfig;

/// Runs the two sweeps over a prepared feature array. Holds only shared-read
/// references; all sweep state lives in a per-sweep [`DpState`].
pub struct DpRunner<'a> {
    pub(crate) grammar : &'a Grammar,
    pub(crate) segments: &'a SegmentIndex,
    pub(crate) config  : &'a EngineConfig,
}

impl<'a> DpRunner<'a> {
    #[must_use]
    pub fn new(grammar: &'a Grammar, segments: &'a SegmentIndex, config: &'a EngineConfig) -> Self {
        Self { grammar, segments, config }
    }
}

/// State owned by one sweep.
///
/// `feats[type][frame]` are append-only lists of already-processed feature
/// indices; the forward sweep keys frames by adjusted start, the backward
/// sweep by adjusted end. `fringes[a][b][frame]` bound how far the scan for
/// an `a`-typed feature must ever look among `b`-typed partners again; they
/// move only towards the scanning direction, which is what makes the pruning
/// sound.
pub(crate) struct DpState {
    pub feats        : Vec<[Vec<usize>; 3]>,
    pub fringes      : Vec<Vec<[usize; 3]>>,
    pub last_selected: Option<usize>,
}

impl DpState {
    pub fn new(n_types: usize, fringe_init: usize) -> Self {
        Self {
            feats: vec![[Vec::new(), Vec::new(), Vec::new()]; n_types],
            fringes: vec![vec![[fringe_init; 3]; n_types]; n_types],
            last_selected: None,
        }
    }

    /// Track the most recent selected waypoint. Consecutive selected
    /// features sharing one real span are phase copies of a single site and
    /// count as one block: the boundary stays at the first member seen.
    pub fn note_selected(&mut self, feats: &[Feature], idx: usize) {
        if !feats[idx].is_selected {
            return;
        }
        match self.last_selected {
            Some(prev) if feats[prev].real == feats[idx].real => (),
            _ => self.last_selected = Some(idx),
        }
    }
}

/// Shared scan scratch: the per-target (or per-source) score array of the
/// log-sum accumulation, and the segment-scorer scratch.
pub(crate) struct ScanScratch {
    pub scores: Vec<f64>,
    pub seg   : SegScratch,
}

impl ScanScratch {
    pub fn new(seg_count: usize) -> Self {
        Self { scores: Vec::new(), seg: SegScratch::new(seg_count) }
    }
}

/// Stable log-sum-exp over the accumulated scores: subtract the maximum
/// before exponentiating, add it back after the log.
pub(crate) fn log_sum_exp(scores: &[f64], max: f64) -> f64 {
    debug_assert!(
        max.is_finite(),
        "log-sum over contributing sources must have a finite maximum"
    );
    let sum: f64 = scores.iter().map(|&s| (s - max).exp()).sum();
    sum.ln() + max
}
