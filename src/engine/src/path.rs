use grammar::Grammar;
use thiserror::Error;

use crate::feature::{Feature, Span};
use crate::scorer::{score_edge, SegScratch};
use crate::segment::SegmentIndex;

/// The first illegal consecutive pair found in a candidate path, and why it
/// is illegal. Edge-level violations inside the sweeps are absorbed
/// silently; only explicit path validation produces these.
#[derive(Error, Debug)]
pub enum PathViolation {
    #[error("'{src}' at {src_span} and '{tgt}' at {tgt_span} do not form a known transition")]
    UnknownPair {
        src     : String,
        src_span: Span,
        tgt     : String,
        tgt_span: Span,
    },

    #[error("transition '{src}' -> '{tgt}' violates its phase constraint (distance {distance}, required distance mod 3 = {required})")]
    Phase {
        src     : String,
        tgt     : String,
        distance: i64,
        required: u8,
    },

    #[error("transition '{src}' -> '{tgt}' is shorter than the minimum distance ({distance} < {min})")]
    MinDistance {
        src     : String,
        tgt     : String,
        distance: i64,
        min     : i64,
    },

    #[error("transition '{src}' -> '{tgt}' is longer than the maximum distance ({distance} > {max})")]
    MaxDistance {
        src     : String,
        tgt     : String,
        distance: i64,
        max     : i64,
    },

    #[error("transition '{src}' at {src_span} -> '{tgt}' at {tgt_span} is forbidden by its DNA motif pair")]
    DnaKiller {
        src     : String,
        src_span: Span,
        tgt     : String,
        tgt_span: Span,
    },
}

/// Check that every consecutive pair of `path` (given as indices into
/// `feats`) is a legal edge, and accumulate the path score with exactly the
/// edge weights the sweeps use: segment score minus length penalty plus the
/// target's local score.
///
/// A meaningful total requires the path to start at BEGIN and finish at END;
/// the first feature's local score is not counted, which is consistent
/// because BEGIN scores zero.
pub fn score_path(
    path: &[usize],
    feats: &[Feature],
    grammar: &Grammar,
    segments: &SegmentIndex,
) -> Result<f64, PathViolation> {
    let mut scratch = SegScratch::new(grammar.seg_count());
    let mut total = 0.0;

    for pair in path.windows(2) {
        let src = &feats[pair[0]];
        let tgt = &feats[pair[1]];
        let src_name = || grammar.feature_name(src.feat_idx).to_string();
        let tgt_name = || grammar.feature_name(tgt.feat_idx).to_string();

        let Some(rel) = grammar.relation(tgt.feat_idx, src.feat_idx) else {
            return Err(PathViolation::UnknownPair {
                src: src_name(),
                src_span: src.real,
                tgt: tgt_name(),
                tgt_span: tgt.real,
            });
        };

        let distance = tgt.adj.end - src.adj.start + 1;

        if let Some(phase) = rel.phase {
            if distance.rem_euclid(3) != i64::from(phase) {
                return Err(PathViolation::Phase {
                    src: src_name(),
                    tgt: tgt_name(),
                    distance,
                    required: phase,
                });
            }
        }
        if let Some(min) = rel.min_dist {
            if distance < min {
                return Err(PathViolation::MinDistance {
                    src: src_name(),
                    tgt: tgt_name(),
                    distance,
                    min,
                });
            }
        }
        if let Some(max) = rel.max_dist {
            if distance > max {
                return Err(PathViolation::MaxDistance {
                    src: src_name(),
                    tgt: tgt_name(),
                    distance,
                    max,
                });
            }
        }
        if rel.dna_killed(src.src_dna, tgt.tgt_dna) {
            return Err(PathViolation::DnaKiller {
                src: src_name(),
                src_span: src.real,
                tgt: tgt_name(),
                tgt_span: tgt.real,
            });
        }

        let (seg_score, _) = score_edge(src, tgt, rel, segments, &mut scratch);
        let len_pen = rel
            .len_fun
            .map_or(0.0, |lf| grammar.length_function(lf).penalty(distance));
        total += seg_score - len_pen + tgt.score;
    }

    Ok(total)
}
