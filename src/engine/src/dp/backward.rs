use log::trace;

use crate::config::CalcMode;
use crate::dp::{log_sum_exp, DpRunner, DpState, ScanScratch};
use crate::feature::{frame_of, Feature};
use crate::scorer::score_edge;

impl DpRunner<'_> {
    /// Backward sweep, structurally symmetric to the forward one: walk the
    /// features in descending order, frame buckets keyed by adjusted end,
    /// fringes bounding how far *forward* each scan may look. Computes each
    /// feature's backward log-sum; a feature with no legal successor is
    /// invalidated.
    pub fn backward(&self, feats: &mut [Feature]) {
        let n = feats.len();
        let mut state = DpState::new(self.grammar.feat_count(), n - 1);
        let mut scratch = ScanScratch::new(self.grammar.seg_count());

        for src_idx in (0..n - 1).rev() {
            let prev = &feats[src_idx + 1];
            state.feats[prev.feat_idx][prev.end_frame()].push(src_idx + 1);

            if feats[src_idx].invalid {
                trace!("backward: skipping invalid feature {src_idx}");
                feats[src_idx].backward_score = f64::NEG_INFINITY;
                continue;
            }

            let backward = self.scan_targets(feats, src_idx, &mut state, &mut scratch);
            state.note_selected(feats, src_idx);

            let src = &mut feats[src_idx];
            match backward {
                Some(score) => src.backward_score = score,
                None => {
                    trace!("backward: invalidating feature {src_idx}, no legal target");
                    src.invalid = true;
                    src.backward_score = f64::NEG_INFINITY;
                }
            }
        }
    }

    /// Scan every admissible target of `feats[src_idx]`, bounded above by
    /// global downstream killers, the nearest following selected waypoint,
    /// per-relation killers and the fringe table.
    fn scan_targets(
        &self,
        feats: &[Feature],
        src_idx: usize,
        state: &mut DpState,
        scratch: &mut ScanScratch,
    ) -> Option<f64> {
        let pruned = self.config.calc_mode == CalcMode::PrunedSum;
        let src = &feats[src_idx];
        let src_info = self.grammar.info(src.feat_idx);
        let left_pos = src.adj.start;
        let src_frame = src.end_frame();

        scratch.scores.clear();

        let mut touched = false;
        let mut max_backward = f64::NEG_INFINITY;

        let mut last_necessary_idx = feats.len() - 1;
        if let Some(kills) = &src_info.kill_feat_quals_down {
            for (k_type, kq) in kills.iter().enumerate() {
                let Some(kq) = kq else { continue };
                match kq.phase {
                    Some(p) => {
                        let k_frame = frame_of(left_pos + i64::from(p) - 1);
                        if let Some(&last) = state.feats[k_type][k_frame].last() {
                            last_necessary_idx = last_necessary_idx.min(last);
                        }
                    }
                    None => {
                        for k_frame in 0..3 {
                            if let Some(&last) = state.feats[k_type][k_frame].last() {
                                last_necessary_idx = last_necessary_idx.min(last);
                            }
                        }
                    }
                }
            }
        }
        if let Some(sel) = state.last_selected {
            last_necessary_idx = last_necessary_idx.min(sel);
        }

        for tgt_type in 0..self.grammar.feat_count() {
            let Some(rel) = self.grammar.relation(tgt_type, src.feat_idx) else { continue };

            let mut last_idx_for_frame = [last_necessary_idx; 3];
            for frame in 0..3 {
                if src_info.kill_feat_quals_down.is_none() {
                    if let Some(kills) = &rel.kill_feat_quals {
                        for (k_type, kq) in kills.iter().enumerate() {
                            let Some(kq) = kq else { continue };
                            match kq.phase {
                                // Killers are bucketed by their adjusted
                                // end here; the phase is measured towards
                                // the target, again assuming width-3
                                // killers.
                                Some(p) => {
                                    let k_frame = (frame + 3 - p as usize) % 3;
                                    if let Some(&last) = state.feats[k_type][k_frame].last() {
                                        last_idx_for_frame[frame] =
                                            last_idx_for_frame[frame].min(last);
                                    }
                                }
                                None => {
                                    for k_frame in 0..3 {
                                        if let Some(&last) = state.feats[k_type][k_frame].last() {
                                            last_idx_for_frame[frame] =
                                                last_idx_for_frame[frame].min(last);
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                let fringe = state.fringes[src.feat_idx][tgt_type][src_frame];
                last_idx_for_frame[frame] = last_idx_for_frame[frame].min(fringe);
            }

            let lists = &state.feats[tgt_type];
            // Lists grow towards smaller indices during this sweep, so the
            // tail of each list is the nearest following feature.
            let mut cursor = [
                lists[0].len() as isize - 1,
                lists[1].len() as isize - 1,
                lists[2].len() as isize - 1,
            ];
            let phase_frame = rel.phase.map(|p| frame_of(left_pos + i64::from(p) - 1));
            let mut frame = phase_frame.unwrap_or(0);
            if let Some(only) = phase_frame {
                for (k, cur) in cursor.iter_mut().enumerate() {
                    if k != only {
                        *cur = -1;
                    }
                }
            }

            let mut max_backpluslen = f64::NEG_INFINITY;
            let mut touched_local = false;
            let mut local_fringe = src_idx;

            loop {
                if phase_frame.is_none() {
                    // ascending three-way merge
                    let mut got = false;
                    for k in 0..3 {
                        if cursor[k] < 0 {
                            continue;
                        }
                        if !got {
                            frame = k;
                            got = true;
                        } else if lists[k][cursor[k] as usize] < lists[frame][cursor[frame] as usize]
                        {
                            frame = k;
                        }
                    }
                }
                if cursor[frame] < 0 {
                    break;
                }
                let tgt_idx = lists[frame][cursor[frame] as usize];
                cursor[frame] -= 1;

                if tgt_idx > last_idx_for_frame[frame] {
                    cursor[frame] = -1;
                    continue;
                }

                let tgt = &feats[tgt_idx];
                if tgt.invalid {
                    continue;
                }
                let distance = tgt.adj.end - left_pos + 1;

                if rel.max_dist.map_or(false, |max| distance > max) {
                    break;
                }
                if rel.min_dist.map_or(false, |min| distance < min) {
                    if pruned {
                        local_fringe = tgt_idx;
                    }
                    continue;
                }
                if rel.dna_killed(src.src_dna, tgt.tgt_dna) {
                    if pruned {
                        local_fringe = tgt_idx;
                    }
                    continue;
                }

                let (seg_score, _) = score_edge(src, tgt, rel, self.segments, &mut scratch.seg);
                let len_pen = rel
                    .len_fun
                    .map_or(0.0, |lf| self.grammar.length_function(lf).penalty(distance));
                let trans = seg_score - len_pen;

                let backward = tgt.backward_score + trans + tgt.score;
                scratch.scores.push(backward);
                if !touched || backward > max_backward {
                    max_backward = backward;
                }

                if pruned {
                    let backpluslen = backward + len_pen;
                    if !touched_local {
                        max_backpluslen = backpluslen;
                        local_fringe = tgt_idx;
                        touched_local = true;
                    } else {
                        if backpluslen > max_backpluslen {
                            max_backpluslen = backpluslen;
                        }
                        if max_backpluslen - backpluslen < self.config.dominance_threshold {
                            local_fringe = tgt_idx;
                        }
                    }
                }

                touched = true;
                trace!(
                    "backward: edge {src_idx}->{tgt_idx} dist={distance} b={backward:.6} (seg={seg_score:.3} len={len_pen:.3})"
                );
            }

            if pruned {
                if rel.phase.is_some() || rel.has_feature_killers() {
                    state.fringes[src.feat_idx][tgt_type][src_frame] = local_fringe;
                } else {
                    state.fringes[src.feat_idx][tgt_type] = [local_fringe; 3];
                }
            }
        }

        touched.then(|| log_sum_exp(&scratch.scores, max_backward))
    }
}
