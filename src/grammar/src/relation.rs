use crate::{DnaKillerQualifier, KillerFeatureQualifier, SegmentQualifier};

/// An admissible transition between a source feature type and a target
/// feature type, together with every constraint and scoring directive that
/// applies to edges of this kind.
///
/// Relations live in the dense `sources` table of the *target* type's
/// [`crate::FeatureInfo`], indexed by source type id.
#[derive(Debug, Clone)]
pub struct Relation {
    pub src_idx  : usize,
    pub tgt_idx  : usize,
    /// Required value of `distance mod 3`, if constrained.
    pub phase    : Option<u8>,
    pub min_dist : Option<i64>,
    pub max_dist : Option<i64>,
    /// Index into the grammar's length function table.
    pub len_fun  : Option<usize>,
    pub seg_quals: Vec<SegmentQualifier>,
    /// Per-edge intervening-feature killers, dense over killer type id.
    /// Only honoured when the target type carries no global upstream table
    /// (forward) or the source type no global downstream table (backward).
    pub kill_feat_quals: Option<Vec<Option<KillerFeatureQualifier>>>,
    pub kill_dna_quals : Vec<DnaKillerQualifier>,
}

impl Relation {
    /// True when any intervening-feature killer is configured on the edge
    /// itself. Decides whether fringe updates stay confined to one frame.
    #[must_use]
    pub fn has_feature_killers(&self) -> bool {
        self.kill_feat_quals.is_some()
    }

    /// True iff the motif pair carried by a candidate edge is declared fatal.
    #[must_use]
    pub fn dna_killed(&self, src_dna: Option<usize>, tgt_dna: Option<usize>) -> bool {
        let (Some(src), Some(tgt)) = (src_dna, tgt_dna) else {
            return false;
        };
        self.kill_dna_quals
            .iter()
            .any(|kdq| kdq.src_dna == src && kdq.tgt_dna == tgt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(kill_dna_quals: Vec<DnaKillerQualifier>) -> Relation {
        Relation {
            src_idx: 0,
            tgt_idx: 1,
            phase: None,
            min_dist: None,
            max_dist: None,
            len_fun: None,
            seg_quals: vec![],
            kill_feat_quals: None,
            kill_dna_quals,
        }
    }

    #[test]
    fn dna_killer_requires_both_motifs() {
        let rel = relation(vec![DnaKillerQualifier { src_dna: 1, tgt_dna: 1 }]);
        assert!(rel.dna_killed(Some(1), Some(1)));
        assert!(!rel.dna_killed(Some(1), None));
        assert!(!rel.dna_killed(None, Some(1)));
        assert!(!rel.dna_killed(Some(2), Some(1)));
    }
}
