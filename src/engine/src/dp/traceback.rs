use grammar::Grammar;

use crate::dp::legal_predecessors;
use crate::feature::Feature;
use crate::scorer::SegScratch;
use crate::segment::SegmentIndex;
use crate::EngineError;

/// Follow the Viterbi trace pointers from END back to BEGIN and return the
/// path as ascending feature indices.
pub fn max_traceback(feats: &[Feature]) -> Result<Vec<usize>, EngineError> {
    let end = feats.len() - 1;
    if feats[end].invalid {
        return Err(EngineError::NoLegalPath);
    }

    let mut stack = vec![end];
    let mut pos = end;
    while pos > 0 {
        pos = feats[pos].trace_pointer;
        stack.push(pos);
    }
    stack.reverse();
    Ok(stack)
}

/// Draw a path with probability proportional to its posterior.
///
/// Walks backwards from END; at each step the predecessor S of the current
/// feature C is drawn from `p(S) = exp(S.forward + trans(S,C) + C.score -
/// C.forward)`, which sums to one over the legal predecessors. Only the
/// forward scores are needed; no state survives from the forward sweep.
pub fn sample_traceback(
    feats: &[Feature],
    grammar: &Grammar,
    segments: &SegmentIndex,
    rng: &mut fastrand::Rng,
) -> Result<Vec<usize>, EngineError> {
    let end = feats.len() - 1;
    if feats[end].invalid {
        return Err(EngineError::NoLegalPath);
    }

    let mut scratch = SegScratch::new(grammar.seg_count());
    let mut stack = vec![end];
    let mut pos = end;

    while pos > 0 {
        let cur = &feats[pos];
        let preds = legal_predecessors(feats, pos, grammar, segments, &mut scratch);
        if preds.is_empty() {
            // cannot happen for a feature the forward sweep left valid
            return Err(EngineError::NoLegalPath);
        }

        let draw = rng.f64();
        let mut cumulative = 0.0;
        let mut chosen = preds[preds.len() - 1].src_idx;
        for edge in &preds {
            let prob =
                (feats[edge.src_idx].forward_score + edge.trans + cur.score - cur.forward_score)
                    .exp();
            cumulative += prob;
            if cumulative >= draw {
                chosen = edge.src_idx;
                break;
            }
        }

        stack.push(chosen);
        pos = chosen;
    }

    stack.reverse();
    Ok(stack)
}
