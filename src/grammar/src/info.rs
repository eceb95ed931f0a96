use crate::{KillerFeatureQualifier, Relation};

/// Everything the engine knows about one feature type.
///
/// `sources` is dense over source type id; absence of a relation is the
/// common case and is an explicit `None`, never a sentinel. The two global
/// killer tables, when present, take precedence over any per-relation killer
/// list (see the sweep bound computation in the engine).
#[derive(Debug, Clone)]
pub struct FeatureInfo {
    pub start_offset: i64,
    pub end_offset  : i64,
    pub multiplier  : f64,
    /// Whether features of this type can act as intervening killers.
    pub is_killer   : bool,
    pub sources     : Vec<Option<Relation>>,
    /// Killers measured against targets of this type, dense over killer type.
    pub kill_feat_quals_up  : Option<Vec<Option<KillerFeatureQualifier>>>,
    /// Killers measured against sources of this type, dense over killer type.
    pub kill_feat_quals_down: Option<Vec<Option<KillerFeatureQualifier>>>,
}

impl FeatureInfo {
    #[must_use]
    pub fn relation(&self, src_idx: usize) -> Option<&Relation> {
        self.sources.get(src_idx).and_then(Option::as_ref)
    }
}

/// Per segment-type information.
#[derive(Debug, Clone, Copy)]
pub struct SegmentInfo {
    pub multiplier: f64,
}
