//! Shared fixtures: a minimal four-type grammar, feature construction
//! helpers, and an exhaustive reference sweep built on the linear
//! predecessor scan, used as an oracle against the frame-indexed engine.

use engine::{
    legal_predecessors, prepare_features, EngineConfig, Feature, SegScratch, SegmentIndex, Span,
};
use grammar::{FeatureDecl, Grammar, GrammarBuilder, RelationDecl, BEGIN, END};

/// Minimal grammar: BEGIN -> A (free), A -> B (phase 0, min 3, max 9),
/// B -> END (free). Optionally with a length function on A -> B penalising
/// distance 9 by 0.5.
pub fn minimal_grammar(with_length_fun: bool) -> Grammar {
    let mut builder = GrammarBuilder::new();
    for name in [BEGIN, "A", "B", END] {
        builder.add_feature(name, FeatureDecl::default()).unwrap();
    }
    builder.add_motif("m1");
    builder.add_motif("m2");

    if with_length_fun {
        let mut values = vec![0.0; 9];
        values.push(0.5);
        builder.add_length_function("span_pen", values, 1.0).unwrap();
    }

    builder.add_relation("A", BEGIN, RelationDecl::default()).unwrap();
    builder
        .add_relation(
            "B",
            "A",
            RelationDecl {
                phase: Some(0),
                min_dist: Some(3),
                max_dist: Some(9),
                length_function: with_length_fun.then(|| "span_pen".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    builder.add_relation(END, "B", RelationDecl::default()).unwrap();
    builder.finalise(1.0).unwrap()
}

/// A point feature of the named type.
pub fn feat(grammar: &Grammar, name: &str, pos: i64, score: f64) -> Feature {
    let mut f = Feature::new(grammar.feature_id(name).unwrap(), Span::new(pos, pos));
    f.score = score;
    f
}

pub fn config() -> EngineConfig {
    EngineConfig { begin_dna: 1, end_dna: Some(20), use_selected: true, ..Default::default() }
}

/// Prepare the raw features and build an empty segment index.
pub fn lattice(
    grammar: &Grammar,
    cfg: &EngineConfig,
    raw: Vec<Feature>,
) -> (Vec<Feature>, SegmentIndex) {
    let feats = prepare_features(raw, grammar, cfg).unwrap();
    let segments = SegmentIndex::build(Vec::new(), grammar, cfg);
    (feats, segments)
}

/// Render a path as `(type name, start)` pairs for compact assertions.
pub fn names(path: &[usize], feats: &[Feature], grammar: &Grammar) -> Vec<(String, i64)> {
    path.iter()
        .map(|&idx| {
            let f = &feats[idx];
            (grammar.feature_name(f.feat_idx).to_string(), f.real.start)
        })
        .collect()
}

/// Exhaustive forward sweep: every target takes its predecessors from the
/// linear killer-tracking scan, with no frame indexing and no fringes. The
/// engine must agree with this formulation.
pub fn forward_linear(feats: &mut [Feature], grammar: &Grammar, segments: &SegmentIndex) {
    let mut scratch = SegScratch::new(grammar.seg_count());
    for tgt_idx in 1..feats.len() {
        let preds = legal_predecessors(feats, tgt_idx, grammar, segments, &mut scratch);
        let tgt_score = feats[tgt_idx].score;

        let mut best = f64::NEG_INFINITY;
        let mut best_idx = 0;
        let mut forwards = Vec::with_capacity(preds.len());
        for edge in &preds {
            let src = &feats[edge.src_idx];
            let viterbi = src.path_score + edge.trans + tgt_score;
            if viterbi > best {
                best = viterbi;
                best_idx = edge.src_idx;
            }
            forwards.push(src.forward_score + edge.trans + tgt_score);
        }

        let tgt = &mut feats[tgt_idx];
        if forwards.is_empty() {
            tgt.invalid = true;
            tgt.forward_score = f64::NEG_INFINITY;
            tgt.path_score = f64::NEG_INFINITY;
        } else {
            let max = forwards.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let sum: f64 = forwards.iter().map(|&s| (s - max).exp()).sum();
            tgt.forward_score = sum.ln() + max;
            tgt.path_score = best;
            tgt.trace_pointer = best_idx;
        }
    }
}
