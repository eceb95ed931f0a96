use std::fmt::{self, Display, Formatter};

use grammar::Grammar;

use crate::{EngineConfig, EngineError};

/// Inclusive residue span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: i64,
    pub end  : i64,
}

impl Span {
    #[must_use]
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    #[must_use]
    pub fn contains(&self, pos: i64) -> bool {
        self.start <= pos && pos <= self.end
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Residue position modulo 3.
#[inline]
#[must_use]
pub(crate) fn frame_of(pos: i64) -> usize {
    pos.rem_euclid(3) as usize
}

/// A candidate feature: one vertex of the prediction lattice.
///
/// `real` is the span as ingested; `adj` is the span shifted by the feature
/// type's offsets and is what every piece of DP arithmetic uses. The four DP
/// slots are written only by the sweeps.
#[derive(Debug, Clone)]
pub struct Feature {
    pub feat_idx   : usize,
    pub real       : Span,
    pub adj        : Span,
    /// Local score, already multiplied by the type multiplier and sigma.
    pub score      : f64,
    /// Motif carried by this site when it acts as the source of an edge.
    pub src_dna    : Option<usize>,
    /// Motif carried by this site when it acts as the target of an edge.
    pub tgt_dna    : Option<usize>,
    /// Waypoint flag: no legal path may skip a selected feature.
    pub is_selected: bool,
    /// Calibration flag: the feature lies on the reference path.
    pub is_correct : bool,
    /// Set when no legal predecessor (forward) or successor (backward) exists.
    pub invalid    : bool,

    pub forward_score : f64,
    pub backward_score: f64,
    pub path_score    : f64,
    pub trace_pointer : usize,
}

impl Feature {
    #[must_use]
    pub fn new(feat_idx: usize, real: Span) -> Self {
        Self {
            feat_idx,
            real,
            adj: real,
            score: 0.0,
            src_dna: None,
            tgt_dna: None,
            is_selected: false,
            is_correct: false,
            invalid: false,
            forward_score: 0.0,
            backward_score: 0.0,
            path_score: 0.0,
            trace_pointer: 0,
        }
    }

    /// Frame bucket of the adjusted start; keys the forward sweep state.
    #[inline]
    #[must_use]
    pub(crate) fn start_frame(&self) -> usize {
        frame_of(self.adj.start)
    }

    /// Frame bucket of the adjusted end; keys the backward sweep state.
    #[inline]
    #[must_use]
    pub(crate) fn end_frame(&self) -> usize {
        frame_of(self.adj.end)
    }
}

/// Turn raw candidate features into the ordered, deduplicated, scaled array
/// the sweeps run over: scores multiplied by type multiplier and sigma,
/// adjusted spans computed, BEGIN/END anchors appended, duplicates (same
/// type, same real span) coalesced.
pub fn prepare_features(
    mut raw: Vec<Feature>,
    grammar: &Grammar,
    config: &EngineConfig,
) -> Result<Vec<Feature>, EngineError> {
    let begin_dna = config.begin_dna;
    let end_dna = config
        .end_dna
        .unwrap_or_else(|| raw.iter().map(|f| f.real.end).max().unwrap_or(begin_dna) + 1);

    for feat in &mut raw {
        if feat.feat_idx == grammar.begin_idx() || feat.feat_idx == grammar.end_idx() {
            return Err(EngineError::DuplicateAnchor(
                grammar.feature_name(feat.feat_idx).to_string(),
            ));
        }
        if feat.real.start < begin_dna || feat.real.end > end_dna {
            return Err(EngineError::FeatureOutOfRange {
                name: grammar.feature_name(feat.feat_idx).to_string(),
                span: feat.real,
                begin: begin_dna,
                end: end_dna,
            });
        }
        let info = grammar.info(feat.feat_idx);
        feat.score *= info.multiplier * config.sigma;
        feat.adj = Span::new(feat.real.start + info.start_offset, feat.real.end - info.end_offset);
        if !config.use_selected {
            feat.is_selected = false;
        }
    }

    raw.push(Feature::new(grammar.begin_idx(), Span::new(begin_dna, begin_dna)));
    raw.push(Feature::new(grammar.end_idx(), Span::new(end_dna, end_dna)));

    raw.sort_by(|a, b| {
        (a.adj.start, a.adj.end, a.feat_idx).cmp(&(b.adj.start, b.adj.end, b.feat_idx))
    });

    let mut feats: Vec<Feature> = Vec::with_capacity(raw.len());
    for feat in raw {
        let duplicate = feats
            .last()
            .map_or(false, |last| last.feat_idx == feat.feat_idx && last.real == feat.real);
        if duplicate {
            let last = feats.last_mut().expect("just matched against it");
            last.is_selected |= feat.is_selected;
            last.is_correct |= feat.is_correct;
            if feat.score > last.score {
                last.score = feat.score;
            }
        } else {
            feats.push(feat);
        }
    }

    let first = feats.first().expect("anchors were appended");
    if first.feat_idx != grammar.begin_idx() {
        return Err(EngineError::AnchorNotTerminal(
            grammar.feature_name(first.feat_idx).to_string(),
            first.real,
        ));
    }
    let last = feats.last().expect("anchors were appended");
    if last.feat_idx != grammar.end_idx() {
        return Err(EngineError::AnchorNotTerminal(
            grammar.feature_name(last.feat_idx).to_string(),
            last.real,
        ));
    }

    Ok(feats)
}
