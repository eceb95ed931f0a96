use log::trace;

use crate::config::CalcMode;
use crate::dp::{log_sum_exp, DpRunner, DpState, ScanScratch};
use crate::feature::{frame_of, Feature};
use crate::scorer::score_edge;

pub(crate) struct ScanOutcome {
    pub touched: bool,
    pub viterbi: f64,
    pub trace  : usize,
    pub forward: f64,
}

impl DpRunner<'_> {
    /// Forward sweep: walk the features in ascending order, computing each
    /// target's Viterbi score, trace pointer and forward log-sum from its
    /// legal predecessors. A target with no legal predecessor is invalidated
    /// with both scores at negative infinity.
    pub fn forward(&self, feats: &mut [Feature]) {
        let mut state = DpState::new(self.grammar.feat_count(), 0);
        let mut scratch = ScanScratch::new(self.grammar.seg_count());

        for tgt_idx in 1..feats.len() {
            let prev = &feats[tgt_idx - 1];
            state.feats[prev.feat_idx][prev.start_frame()].push(tgt_idx - 1);

            let outcome = self.scan_sources(feats, tgt_idx, &mut state, &mut scratch);
            state.note_selected(feats, tgt_idx);

            let tgt = &mut feats[tgt_idx];
            if outcome.touched {
                tgt.forward_score = outcome.forward;
                tgt.path_score = outcome.viterbi;
                tgt.trace_pointer = outcome.trace;
            } else {
                trace!("forward: invalidating feature {tgt_idx}, no legal source");
                tgt.invalid = true;
                tgt.forward_score = f64::NEG_INFINITY;
                tgt.path_score = f64::NEG_INFINITY;
            }
        }
    }

    /// Scan every admissible source of `feats[tgt_idx]`, bounded below by
    /// global upstream killers, the last selected waypoint, per-relation
    /// killers and the fringe table.
    fn scan_sources(
        &self,
        feats: &[Feature],
        tgt_idx: usize,
        state: &mut DpState,
        scratch: &mut ScanScratch,
    ) -> ScanOutcome {
        let pruned = self.config.calc_mode == CalcMode::PrunedSum;
        let tgt = &feats[tgt_idx];
        let tgt_info = self.grammar.info(tgt.feat_idx);
        let right_pos = tgt.adj.end;
        let tgt_frame = tgt.start_frame();

        scratch.scores.clear();

        let mut touched = false;
        let mut max_score = f64::NEG_INFINITY;
        let mut max_index = 0usize;
        let mut max_forward = f64::NEG_INFINITY;

        // The scan must not step past a killer that applies to every source
        // of this target, nor past the last selected waypoint.
        let mut last_necessary_idx = 0usize;
        if let Some(kills) = &tgt_info.kill_feat_quals_up {
            for (k_type, kq) in kills.iter().enumerate() {
                let Some(kq) = kq else { continue };
                match kq.phase {
                    Some(p) => {
                        let k_frame = frame_of(right_pos - i64::from(p) + 1);
                        if let Some(&last) = state.feats[k_type][k_frame].last() {
                            last_necessary_idx = last_necessary_idx.max(last);
                        }
                    }
                    None => {
                        for k_frame in 0..3 {
                            if let Some(&last) = state.feats[k_type][k_frame].last() {
                                last_necessary_idx = last_necessary_idx.max(last);
                            }
                        }
                    }
                }
            }
        }
        if let Some(sel) = state.last_selected {
            last_necessary_idx = last_necessary_idx.max(sel);
        }

        for src_type in 0..self.grammar.feat_count() {
            let Some(rel) = self.grammar.relation(tgt.feat_idx, src_type) else { continue };

            // Per-frame lower bounds: per-relation killers apply only when
            // the target type carries no global table, then the fringe caps
            // whatever remains.
            let mut last_idx_for_frame = [last_necessary_idx; 3];
            for frame in 0..3 {
                if tgt_info.kill_feat_quals_up.is_none() {
                    if let Some(kills) = &rel.kill_feat_quals {
                        for (k_type, kq) in kills.iter().enumerate() {
                            let Some(kq) = kq else { continue };
                            match kq.phase {
                                // Killers are bucketed by their adjusted
                                // start; the phase is measured from the
                                // source, which assumes width-3 killers.
                                Some(p) => {
                                    let k_frame = (frame + p as usize) % 3;
                                    if let Some(&last) = state.feats[k_type][k_frame].last() {
                                        last_idx_for_frame[frame] =
                                            last_idx_for_frame[frame].max(last);
                                    }
                                }
                                None => {
                                    for k_frame in 0..3 {
                                        if let Some(&last) = state.feats[k_type][k_frame].last() {
                                            last_idx_for_frame[frame] =
                                                last_idx_for_frame[frame].max(last);
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                let fringe = state.fringes[tgt.feat_idx][src_type][tgt_frame];
                last_idx_for_frame[frame] = last_idx_for_frame[frame].max(fringe);
            }

            let lists = &state.feats[src_type];
            let mut cursor = [
                lists[0].len() as isize - 1,
                lists[1].len() as isize - 1,
                lists[2].len() as isize - 1,
            ];
            let phase_frame = rel.phase.map(|p| frame_of(right_pos - i64::from(p) + 1));
            let mut frame = phase_frame.unwrap_or(0);
            if let Some(only) = phase_frame {
                for (k, cur) in cursor.iter_mut().enumerate() {
                    if k != only {
                        *cur = -1;
                    }
                }
            }

            let mut max_forpluslen = f64::NEG_INFINITY;
            let mut touched_local = false;
            // If this target finds no usable source, future targets of its
            // type need not look back past the target itself.
            let mut local_fringe = tgt_idx;

            loop {
                if phase_frame.is_none() {
                    // Phaseless relations examine all three frames, but the
                    // dominance pruner is only valid if sources arrive in
                    // strict descending index order: a three-way merge, not
                    // three passes.
                    let mut got = false;
                    for k in 0..3 {
                        if cursor[k] < 0 {
                            continue;
                        }
                        if !got {
                            frame = k;
                            got = true;
                        } else if lists[k][cursor[k] as usize] > lists[frame][cursor[frame] as usize]
                        {
                            frame = k;
                        }
                    }
                }
                if cursor[frame] < 0 {
                    break;
                }
                let src_idx = lists[frame][cursor[frame] as usize];
                cursor[frame] -= 1;

                if src_idx < last_idx_for_frame[frame] {
                    // Other frames may still hold closer sources; only this
                    // frame is exhausted.
                    cursor[frame] = -1;
                    continue;
                }

                let src = &feats[src_idx];
                if src.invalid {
                    continue;
                }
                let distance = right_pos - src.adj.start + 1;

                if rel.max_dist.map_or(false, |max| distance > max) {
                    // every remaining source is even more distant
                    break;
                }
                if rel.min_dist.map_or(false, |min| distance < min) {
                    // too close now, but not for future targets
                    if pruned {
                        local_fringe = src_idx;
                    }
                    continue;
                }
                if rel.dna_killed(src.src_dna, tgt.tgt_dna) {
                    if pruned {
                        local_fringe = src_idx;
                    }
                    continue;
                }

                let (seg_score, _) = score_edge(src, tgt, rel, self.segments, &mut scratch.seg);
                let len_pen = rel
                    .len_fun
                    .map_or(0.0, |lf| self.grammar.length_function(lf).penalty(distance));
                let trans = seg_score - len_pen;

                let viterbi = src.path_score + trans + tgt.score;
                if !touched || viterbi > max_score {
                    max_score = viterbi;
                    max_index = src_idx;
                }

                let forward = src.forward_score + trans + tgt.score;
                scratch.scores.push(forward);
                if !touched || forward > max_forward {
                    max_forward = forward;
                }

                if pruned {
                    // Judge dominance with the length penalty added back:
                    // future targets will charge their own.
                    let forpluslen = forward + len_pen;
                    if !touched_local {
                        max_forpluslen = forpluslen;
                        local_fringe = src_idx;
                        touched_local = true;
                    } else {
                        if forpluslen > max_forpluslen {
                            max_forpluslen = forpluslen;
                        }
                        if max_forpluslen - forpluslen < self.config.dominance_threshold {
                            local_fringe = src_idx;
                        }
                    }
                }

                touched = true;
                trace!(
                    "forward: edge {src_idx}->{tgt_idx} dist={distance} v={viterbi:.3} f={forward:.6} (seg={seg_score:.3} len={len_pen:.3})"
                );
            }

            if pruned {
                // With a phase constraint or potential killers in play, only
                // the target's own frame is provably safe to prune.
                if rel.phase.is_some() || rel.has_feature_killers() {
                    state.fringes[tgt.feat_idx][src_type][tgt_frame] = local_fringe;
                } else {
                    state.fringes[tgt.feat_idx][src_type] = [local_fringe; 3];
                }
            }
        }

        if touched {
            ScanOutcome {
                touched,
                viterbi: max_score,
                trace: max_index,
                forward: log_sum_exp(&scratch.scores, max_forward),
            }
        } else {
            ScanOutcome { touched, viterbi: f64::NEG_INFINITY, trace: 0, forward: f64::NEG_INFINITY }
        }
    }
}
