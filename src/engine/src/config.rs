/// Whether the forward/backward sums examine every legal predecessor or rely
/// on the dominance-pruned fringe scheme. Both produce identical Viterbi
/// paths; the pruned sums are approximate but dominance-safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcMode {
    StandardSum,
    PrunedSum,
}

/// How the final path is recovered from the forward sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracebackMode {
    /// Follow the Viterbi trace pointers.
    Max,
    /// Draw a path proportionally to its posterior probability.
    Sample,
}

/// Per-run engine configuration, passed explicitly to every phase.
/// There is no process-wide options record.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// First residue of the region of interest.
    pub begin_dna           : i64,
    /// Last residue of the region; defaults to the rightmost input feature.
    pub end_dna             : Option<i64>,
    /// Residue number of the first residue in the input files.
    pub offset_dna          : i64,
    /// Global multiplier applied to every local, segment and length score.
    pub sigma               : f64,
    /// Honour the selected-waypoint flag carried by input features.
    pub use_selected        : bool,
    /// Report per-feature posteriors at or above this value.
    pub post_prob_threshold : Option<f64>,
    pub calc_mode           : CalcMode,
    pub traceback           : TracebackMode,
    /// Dominance margin, in natural-log units, below which a source is still
    /// considered a contributor for future targets.
    pub dominance_threshold : f64,
    /// Seed for the sampled traceback.
    pub seed                : Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            begin_dna: 1,
            end_dna: None,
            offset_dna: 1,
            sigma: 1.0,
            use_selected: false,
            post_prob_threshold: None,
            calc_mode: CalcMode::PrunedSum,
            traceback: TracebackMode::Max,
            dominance_threshold: 25.0,
            seed: None,
        }
    }
}

impl From<&parser::Cli> for EngineConfig {
    fn from(cli: &parser::Cli) -> Self {
        Self {
            begin_dna: cli.begin_dna,
            end_dna: cli.end_dna,
            offset_dna: cli.offset_dna,
            sigma: cli.sigma,
            use_selected: cli.selected,
            post_prob_threshold: cli.post_probs,
            calc_mode: if cli.full_calc { CalcMode::StandardSum } else { CalcMode::PrunedSum },
            traceback: if cli.sample_gene { TracebackMode::Sample } else { TracebackMode::Max },
            dominance_threshold: 25.0,
            seed: cli.seed,
        }
    }
}
