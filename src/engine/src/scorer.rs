use grammar::{Relation, SegmentPhase};

use crate::feature::{frame_of, Feature};
use crate::segment::{rightmost_at_or_before, SegmentIndex, FRAMELESS};

/// Exact-boundary information gathered while scoring an edge. The flags
/// describe whether a segment was anchored exactly at either endpoint and
/// whether that anchored segment extends past the opposite endpoint; callers
/// use them for pruning heuristics, never for the score itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundaryFlags {
    pub has_exact_at_src       : bool,
    pub exact_extends_beyond_tgt: bool,
    pub has_exact_at_tgt       : bool,
    pub exact_extends_beyond_src: bool,
}

/// Per-segment-type scratch reused across edge scorings, so that a single
/// scoring call performs no allocation.
#[derive(Debug)]
pub struct SegScratch {
    raw_scores: Vec<f64>,
    has_score : Vec<bool>,
}

impl SegScratch {
    #[must_use]
    pub fn new(seg_count: usize) -> Self {
        Self { raw_scores: vec![0.0; seg_count], has_score: vec![false; seg_count] }
    }

    fn reset(&mut self) {
        self.raw_scores.fill(0.0);
        self.has_score.fill(false);
    }
}

/// Summed segment contribution for the edge `src -> tgt` under the target's
/// relation.
///
/// For each qualifier: pick the frame bucket (from the target's adjusted end,
/// the source's adjusted start, or the frameless bucket), binary-search the
/// rightmost segment starting at or before the target, then walk leftwards
/// until `max_end_up` proves that no earlier segment can still overlap the
/// edge. Overlaps are clipped to the edge span; exactness and containment
/// gates apply before a segment may contribute. Within one segment type the
/// qualifier decides between summing and keeping the maximum; across types
/// the contributions always sum.
pub fn score_edge(
    src: &Feature,
    tgt: &Feature,
    rel: &Relation,
    segments: &SegmentIndex,
    scratch: &mut SegScratch,
) -> (f64, BoundaryFlags) {
    let src_pos = src.adj.start;
    let tgt_pos = tgt.adj.end;

    scratch.reset();
    let mut flags = BoundaryFlags::default();

    for qual in &rel.seg_quals {
        let bucket = match qual.phase {
            SegmentPhase::Target(p) => frame_of(tgt_pos - i64::from(p) + 1),
            SegmentPhase::Source(p) => frame_of(src_pos + i64::from(p)),
            SegmentPhase::None => FRAMELESS,
        };
        let lists = segments.lists(qual.seg_idx);
        let list = if qual.use_projected { &lists.proj[bucket] } else { &lists.orig[bucket] };

        let Some(start) = rightmost_at_or_before(list, tgt_pos) else { continue };
        for seg in list[..=start].iter().rev() {
            if seg.max_end_up < src_pos {
                break;
            }
            if seg.span.end < src_pos {
                continue;
            }
            let low = seg.span.start.max(src_pos);
            let high = seg.span.end.min(tgt_pos);

            if qual.is_exact_src && seg.span.start == src_pos {
                flags.has_exact_at_src = true;
                if seg.span.end > tgt_pos {
                    flags.exact_extends_beyond_tgt = true;
                }
            }
            if qual.is_exact_tgt && seg.span.end == tgt_pos {
                flags.has_exact_at_tgt = true;
                if seg.span.start < src_pos {
                    flags.exact_extends_beyond_src = true;
                }
            }

            if (qual.is_exact_src && seg.span.start != src_pos)
                || (qual.is_exact_tgt && seg.span.end != tgt_pos)
            {
                continue;
            }
            if !qual.partial && (seg.span.start < src_pos || seg.span.end > tgt_pos) {
                continue;
            }

            let score = seg.score * (high - low + 1) as f64;
            if !scratch.has_score[qual.seg_idx] {
                scratch.raw_scores[qual.seg_idx] = score;
                scratch.has_score[qual.seg_idx] = true;
            } else if qual.score_sum {
                scratch.raw_scores[qual.seg_idx] += score;
            } else if score > scratch.raw_scores[qual.seg_idx] {
                scratch.raw_scores[qual.seg_idx] = score;
            }
        }
    }

    let total = scratch
        .raw_scores
        .iter()
        .zip(&scratch.has_score)
        .filter_map(|(&score, &has)| has.then_some(score))
        .sum();

    (total, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Span;
    use crate::segment::SegmentRecord;
    use crate::EngineConfig;
    use float_cmp::assert_approx_eq;
    use grammar::{FeatureDecl, Grammar, GrammarBuilder, RelationDecl, SegmentQualifierDecl, BEGIN, END};

    fn grammar_with_qualifier(build: impl FnOnce(&mut SegmentQualifierDecl)) -> Grammar {
        let mut builder = GrammarBuilder::new();
        for name in [BEGIN, "a", "b", END] {
            builder.add_feature(name, FeatureDecl::default()).unwrap();
        }
        builder.add_segment("coding", 1.0).unwrap();
        let mut qual = SegmentQualifierDecl::new("coding");
        build(&mut qual);
        builder
            .add_relation("b", "a", RelationDecl { segments: vec![qual], ..Default::default() })
            .unwrap();
        builder.finalise(1.0).unwrap()
    }

    fn index(grammar: &Grammar, records: Vec<SegmentRecord>) -> SegmentIndex {
        SegmentIndex::build(records, grammar, &EngineConfig::default())
    }

    fn record(start: i64, end: i64, score: f64) -> SegmentRecord {
        SegmentRecord { seg_idx: 0, span: Span::new(start, end), score, frame: None }
    }

    fn edge(grammar: &Grammar, src_start: i64, tgt_end: i64) -> (Feature, Feature) {
        let src = Feature::new(grammar.feature_id("a").unwrap(), Span::new(src_start, src_start));
        let tgt = Feature::new(grammar.feature_id("b").unwrap(), Span::new(tgt_end, tgt_end));
        (src, tgt)
    }

    #[test]
    fn overlaps_are_clipped_and_summed() {
        let grammar = grammar_with_qualifier(|q| q.use_projected = false);
        let segments = index(&grammar, vec![record(1, 10, 1.0), record(15, 30, 0.5)]);
        let (src, tgt) = edge(&grammar, 5, 20);
        let rel = grammar.relation(tgt.feat_idx, src.feat_idx).unwrap();
        let mut scratch = SegScratch::new(grammar.seg_count());

        // 5..=10 at 1.0 plus 15..=20 at 0.5
        let (score, _) = score_edge(&src, &tgt, rel, &segments, &mut scratch);
        assert_approx_eq!(f64, score, 6.0 + 3.0);
    }

    #[test]
    fn max_aggregation_keeps_the_best_contribution() {
        let grammar = grammar_with_qualifier(|q| {
            q.use_projected = false;
            q.score_sum = false;
        });
        let segments = index(&grammar, vec![record(1, 10, 1.0), record(15, 30, 0.5)]);
        let (src, tgt) = edge(&grammar, 5, 20);
        let rel = grammar.relation(tgt.feat_idx, src.feat_idx).unwrap();
        let mut scratch = SegScratch::new(grammar.seg_count());

        let (score, _) = score_edge(&src, &tgt, rel, &segments, &mut scratch);
        assert_approx_eq!(f64, score, 6.0);
    }

    #[test]
    fn exact_source_gate_and_flags() {
        let grammar = grammar_with_qualifier(|q| {
            q.use_projected = false;
            q.is_exact_src = true;
        });
        let segments = index(&grammar, vec![record(5, 25, 1.0), record(7, 12, 1.0)]);
        let (src, tgt) = edge(&grammar, 5, 20);
        let rel = grammar.relation(tgt.feat_idx, src.feat_idx).unwrap();
        let mut scratch = SegScratch::new(grammar.seg_count());

        let (score, flags) = score_edge(&src, &tgt, rel, &segments, &mut scratch);
        // only the segment anchored at 5 counts, clipped to 5..=20
        assert_approx_eq!(f64, score, 16.0);
        assert!(flags.has_exact_at_src);
        assert!(flags.exact_extends_beyond_tgt);
        assert!(!flags.has_exact_at_tgt);
    }

    #[test]
    fn containment_gate_when_partial_is_off() {
        let grammar = grammar_with_qualifier(|q| {
            q.use_projected = false;
            q.partial = false;
        });
        let segments = index(&grammar, vec![record(1, 10, 1.0), record(6, 12, 1.0)]);
        let (src, tgt) = edge(&grammar, 5, 20);
        let rel = grammar.relation(tgt.feat_idx, src.feat_idx).unwrap();
        let mut scratch = SegScratch::new(grammar.seg_count());

        // 1..=10 straddles the source boundary and is discarded
        let (score, _) = score_edge(&src, &tgt, rel, &segments, &mut scratch);
        assert_approx_eq!(f64, score, 7.0);
    }

    #[test]
    fn frame_bucket_selection_from_target_phase() {
        let grammar = {
            let mut builder = GrammarBuilder::new();
            for name in [BEGIN, "a", "b", END] {
                builder.add_feature(name, FeatureDecl::default()).unwrap();
            }
            builder.add_segment("coding", 1.0).unwrap();
            let mut qual = SegmentQualifierDecl::new("coding");
            qual.phase = grammar::SegmentPhase::Target(0);
            qual.use_projected = false;
            builder
                .add_relation("b", "a", RelationDecl { segments: vec![qual], ..Default::default() })
                .unwrap();
            builder.finalise(1.0).unwrap()
        };
        // tgt end 20 => bucket (20 - 0 + 1) % 3 == 0
        let mut records = vec![record(5, 20, 1.0)];
        records[0].frame = Some(0);
        let in_frame = index(&grammar, records);
        let mut records = vec![record(5, 20, 1.0)];
        records[0].frame = Some(1);
        let off_frame = index(&grammar, records);

        let (src, tgt) = edge(&grammar, 5, 20);
        let rel = grammar.relation(tgt.feat_idx, src.feat_idx).unwrap();
        let mut scratch = SegScratch::new(grammar.seg_count());

        let (hit, _) = score_edge(&src, &tgt, rel, &in_frame, &mut scratch);
        let (miss, _) = score_edge(&src, &tgt, rel, &off_frame, &mut scratch);
        assert_approx_eq!(f64, hit, 16.0);
        assert_approx_eq!(f64, miss, 0.0);
    }
}
