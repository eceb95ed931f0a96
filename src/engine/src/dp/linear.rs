use grammar::Grammar;

use crate::feature::{Feature, Span};
use crate::scorer::{score_edge, SegScratch};
use crate::segment::SegmentIndex;

/// A legal edge into a target, with its transition score
/// (segment contribution minus length penalty).
#[derive(Debug, Clone, Copy)]
pub struct PredEdge {
    pub src_idx: usize,
    pub trans  : f64,
}

/// Lowest source index admitted by the selected waypoints below `tgt_idx`.
///
/// Selected features sharing one real span are phase copies of a single
/// waypoint and count as one block; the scan may reach back to the first
/// member of the nearest block, and no further.
fn selected_bound(feats: &[Feature], tgt_idx: usize) -> usize {
    let mut bound = 0;
    let mut block: Option<Span> = None;
    for (idx, feat) in feats[..tgt_idx].iter().enumerate().rev() {
        if !feat.is_selected {
            continue;
        }
        match block {
            Some(span) if span != feat.real => break,
            _ => {
                block = Some(feat.real);
                bound = idx;
            }
        }
    }
    bound
}

/// Enumerate every legal predecessor of `feats[tgt_idx]` by a plain linear
/// scan with killer tracking, in descending source order.
///
/// This is the exhaustive formulation of the per-target scan: no frame
/// bucketing, no fringes, every edge-legality rule applied candidate by
/// candidate. The sampled traceback uses it to obtain the exact predecessor
/// distribution, and the tests use it as an oracle against the frame-indexed
/// sweep, including on grammars whose killers overlap other features, where
/// the two formulations are worth comparing.
pub fn legal_predecessors(
    feats: &[Feature],
    tgt_idx: usize,
    grammar: &Grammar,
    segments: &SegmentIndex,
    scratch: &mut SegScratch,
) -> Vec<PredEdge> {
    let tgt = &feats[tgt_idx];
    let tgt_info = grammar.info(tgt.feat_idx);
    let right_pos = tgt.adj.end;

    let mut edges = Vec::new();
    let mut passed_killers: Vec<usize> = Vec::new();

    for src_idx in (selected_bound(feats, tgt_idx)..tgt_idx).rev() {
        let src = &feats[src_idx];
        let distance = right_pos - src.adj.start + 1;

        if !src.invalid {
            if let Some(rel) = grammar.relation(tgt.feat_idx, src.feat_idx) {
                let legal = rel.phase.map_or(true, |p| distance.rem_euclid(3) == i64::from(p))
                    && rel.min_dist.map_or(true, |min| distance >= min)
                    && rel.max_dist.map_or(true, |max| distance <= max);

                if legal {
                    let mut killed = false;
                    if tgt_info.kill_feat_quals_up.is_none() {
                        if let Some(kills) = &rel.kill_feat_quals {
                            for &k_idx in &passed_killers {
                                let killer = &feats[k_idx];
                                let Some(kq) = kills[killer.feat_idx] else { continue };
                                let kill_dist = killer.adj.end - src.adj.start + 1;
                                if kq.phase.map_or(true, |p| {
                                    kill_dist >= 0 && kill_dist.rem_euclid(3) == i64::from(p)
                                }) {
                                    killed = true;
                                    break;
                                }
                            }
                        }
                    }
                    if !killed && !rel.dna_killed(src.src_dna, tgt.tgt_dna) {
                        let (seg_score, _) = score_edge(src, tgt, rel, segments, scratch);
                        let len_pen = rel
                            .len_fun
                            .map_or(0.0, |lf| grammar.length_function(lf).penalty(distance));
                        edges.push(PredEdge { src_idx, trans: seg_score - len_pen });
                    }
                }
            }
        }

        // Killer tracking covers every feature passed, valid or not.
        if let Some(kills) = &tgt_info.kill_feat_quals_up {
            if let Some(kq) = kills[src.feat_idx] {
                if kq
                    .phase
                    .map_or(true, |p| distance >= 0 && distance.rem_euclid(3) == i64::from(p))
                {
                    break;
                }
            }
        }
        if grammar.info(src.feat_idx).is_killer {
            passed_killers.push(src_idx);
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected_at(positions: &[(i64, bool)]) -> Vec<Feature> {
        positions
            .iter()
            .map(|&(pos, selected)| {
                let mut f = Feature::new(0, Span::new(pos, pos));
                f.is_selected = selected;
                f
            })
            .collect()
    }

    #[test]
    fn bound_is_zero_without_waypoints() {
        let feats = selected_at(&[(1, false), (5, false), (9, false)]);
        assert_eq!(selected_bound(&feats, 3), 0);
    }

    #[test]
    fn bound_sits_on_the_nearest_waypoint() {
        let feats = selected_at(&[(1, false), (5, true), (9, false), (12, true)]);
        assert_eq!(selected_bound(&feats, 4), 3);
        assert_eq!(selected_bound(&feats, 3), 1);
    }

    #[test]
    fn phase_copies_count_as_one_block() {
        // two copies of the waypoint at 5, with a bystander in between
        let feats = selected_at(&[(1, false), (5, true), (5, false), (5, true), (9, false)]);
        assert_eq!(selected_bound(&feats, 5), 1);
    }
}
