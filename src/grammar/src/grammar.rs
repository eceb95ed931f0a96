use log::debug;

use crate::{
    Dictionary, DnaKillerQualifier, FeatureInfo, GrammarError, KillerFeatureQualifier,
    LengthFunction, Relation, SegmentInfo, SegmentPhase, SegmentQualifier,
};

/// Name of the mandatory anchor type preceding every feature.
pub const BEGIN: &str = "BEGIN";
/// Name of the mandatory anchor type following every feature.
pub const END: &str = "END";

/// The read-only catalogue driving the whole prediction: feature and segment
/// types, motifs, length functions, and the dense relation tables.
///
/// A `Grammar` is built once, either programmatically through
/// [`GrammarBuilder`] or from a YAML document, and is immutable afterwards.
/// The global sigma is folded into every length-function table during
/// [`GrammarBuilder::finalise`]; feature and segment score scaling happens in
/// the engine, which owns those values.
#[derive(Debug)]
pub struct Grammar {
    feat_dict    : Dictionary,
    seg_dict     : Dictionary,
    motif_dict   : Dictionary,
    len_fun_dict : Dictionary,
    feat_info    : Vec<FeatureInfo>,
    seg_info     : Vec<SegmentInfo>,
    length_funcs : Vec<LengthFunction>,
    begin_idx    : usize,
    end_idx      : usize,
}

impl Grammar {
    #[must_use]
    pub fn feat_count(&self) -> usize {
        self.feat_dict.len()
    }

    #[must_use]
    pub fn seg_count(&self) -> usize {
        self.seg_dict.len()
    }

    #[must_use]
    pub fn begin_idx(&self) -> usize {
        self.begin_idx
    }

    #[must_use]
    pub fn end_idx(&self) -> usize {
        self.end_idx
    }

    #[must_use]
    pub fn feature_id(&self, name: &str) -> Option<usize> {
        self.feat_dict.id(name)
    }

    #[must_use]
    pub fn feature_name(&self, id: usize) -> &str {
        self.feat_dict.name(id)
    }

    #[must_use]
    pub fn segment_id(&self, name: &str) -> Option<usize> {
        self.seg_dict.id(name)
    }

    #[must_use]
    pub fn segment_name(&self, id: usize) -> &str {
        self.seg_dict.name(id)
    }

    #[must_use]
    pub fn motif_id(&self, name: &str) -> Option<usize> {
        self.motif_dict.id(name)
    }

    #[must_use]
    pub fn info(&self, feat_idx: usize) -> &FeatureInfo {
        &self.feat_info[feat_idx]
    }

    #[must_use]
    pub fn segment_info(&self, seg_idx: usize) -> &SegmentInfo {
        &self.seg_info[seg_idx]
    }

    /// The relation admitting edges from `src_idx` features to `tgt_idx`
    /// features, if any.
    #[must_use]
    pub fn relation(&self, tgt_idx: usize, src_idx: usize) -> Option<&Relation> {
        self.feat_info[tgt_idx].relation(src_idx)
    }

    #[must_use]
    pub fn length_function_id(&self, name: &str) -> Option<usize> {
        self.len_fun_dict.id(name)
    }

    #[must_use]
    pub fn length_function(&self, id: usize) -> &LengthFunction {
        &self.length_funcs[id]
    }
}

/// Declaration of one feature type. Offsets translate a feature's real span
/// into the adjusted span used by all DP arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct FeatureDecl {
    pub start_offset: i64,
    pub end_offset  : i64,
    pub multiplier  : f64,
    pub is_killer   : bool,
}

impl Default for FeatureDecl {
    fn default() -> Self {
        Self { start_offset: 0, end_offset: 0, multiplier: 1.0, is_killer: false }
    }
}

/// Declaration of one segment qualifier on a relation, by segment name.
#[derive(Debug, Clone)]
pub struct SegmentQualifierDecl {
    pub segment       : String,
    pub phase         : SegmentPhase,
    pub is_exact_src  : bool,
    pub is_exact_tgt  : bool,
    pub partial       : bool,
    pub score_sum     : bool,
    pub use_projected : bool,
}

impl SegmentQualifierDecl {
    #[must_use]
    pub fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            phase: SegmentPhase::None,
            is_exact_src: false,
            is_exact_tgt: false,
            partial: true,
            score_sum: true,
            use_projected: true,
        }
    }
}

/// Declaration of one relation, by name. Every field is optional; the empty
/// declaration admits the edge unconditionally with no scoring directives.
#[derive(Debug, Clone, Default)]
pub struct RelationDecl {
    pub phase           : Option<u8>,
    pub min_dist        : Option<i64>,
    pub max_dist        : Option<i64>,
    pub length_function : Option<String>,
    pub segments        : Vec<SegmentQualifierDecl>,
    /// (killer feature name, optional phase)
    pub feature_killers : Vec<(String, Option<u8>)>,
    /// (source motif name, target motif name)
    pub dna_killers     : Vec<(String, String)>,
}

struct RelationEntry {
    tgt_idx : usize,
    src_idx : usize,
    relation: Relation,
    /// Sparse per-edge killers, densified over the final type count later.
    killers : Vec<(usize, KillerFeatureQualifier)>,
}

struct KillerEntry {
    owner_idx : usize,
    killer_idx: usize,
    qual      : KillerFeatureQualifier,
}

/// Incremental [`Grammar`] construction. Names must be declared before they
/// are referenced, so that every cross-reference resolves eagerly to a dense
/// id and errors point at the offending declaration.
#[derive(Default)]
pub struct GrammarBuilder {
    feat_dict    : Dictionary,
    seg_dict     : Dictionary,
    motif_dict   : Dictionary,
    len_fun_dict : Dictionary,
    feat_decls   : Vec<FeatureDecl>,
    seg_info     : Vec<SegmentInfo>,
    length_funcs : Vec<LengthFunction>,
    relations    : Vec<RelationEntry>,
    killers_up   : Vec<KillerEntry>,
    killers_down : Vec<KillerEntry>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feature(&mut self, name: &str, decl: FeatureDecl) -> Result<usize, GrammarError> {
        let id = self
            .feat_dict
            .insert(name)
            .ok_or_else(|| GrammarError::DuplicateFeature(name.to_string()))?;
        self.feat_decls.push(decl);
        Ok(id)
    }

    pub fn add_segment(&mut self, name: &str, multiplier: f64) -> Result<usize, GrammarError> {
        let id = self
            .seg_dict
            .insert(name)
            .ok_or_else(|| GrammarError::DuplicateSegment(name.to_string()))?;
        self.seg_info.push(SegmentInfo { multiplier });
        Ok(id)
    }

    pub fn add_motif(&mut self, name: &str) -> usize {
        self.motif_dict.insert_or_get(name)
    }

    pub fn add_length_function(
        &mut self,
        name: &str,
        values: Vec<f64>,
        multiplier: f64,
    ) -> Result<usize, GrammarError> {
        if values.is_empty() {
            return Err(GrammarError::EmptyLengthFunction(name.to_string()));
        }
        let id = self
            .len_fun_dict
            .insert(name)
            .ok_or_else(|| GrammarError::DuplicateLengthFunction(name.to_string()))?;
        self.length_funcs.push(LengthFunction::new(values, multiplier));
        Ok(id)
    }

    fn feature_id(&self, name: &str) -> Result<usize, GrammarError> {
        self.feat_dict
            .id(name)
            .ok_or_else(|| GrammarError::UnknownFeature(name.to_string()))
    }

    fn check_phase(phase: Option<u8>) -> Result<(), GrammarError> {
        match phase {
            Some(p) if p > 2 => Err(GrammarError::InvalidPhase(p)),
            _ => Ok(()),
        }
    }

    /// Declare that `src` features may transition to `tgt` features.
    pub fn add_relation(
        &mut self,
        tgt: &str,
        src: &str,
        decl: RelationDecl,
    ) -> Result<(), GrammarError> {
        let tgt_idx = self.feature_id(tgt)?;
        let src_idx = self.feature_id(src)?;
        if self
            .relations
            .iter()
            .any(|r| r.tgt_idx == tgt_idx && r.src_idx == src_idx)
        {
            return Err(GrammarError::DuplicateRelation {
                target: tgt.to_string(),
                src: src.to_string(),
            });
        }
        Self::check_phase(decl.phase)?;

        let len_fun = decl
            .length_function
            .as_deref()
            .map(|name| {
                self.len_fun_dict
                    .id(name)
                    .ok_or_else(|| GrammarError::UnknownLengthFunction(name.to_string()))
            })
            .transpose()?;

        let mut seg_quals = Vec::with_capacity(decl.segments.len());
        for sq in &decl.segments {
            let seg_idx = self
                .seg_dict
                .id(&sq.segment)
                .ok_or_else(|| GrammarError::UnknownSegment(sq.segment.clone()))?;
            match sq.phase {
                SegmentPhase::Source(p) | SegmentPhase::Target(p) => Self::check_phase(Some(p))?,
                SegmentPhase::None => (),
            }
            seg_quals.push(SegmentQualifier {
                seg_idx,
                phase: sq.phase,
                is_exact_src: sq.is_exact_src,
                is_exact_tgt: sq.is_exact_tgt,
                partial: sq.partial,
                score_sum: sq.score_sum,
                use_projected: sq.use_projected,
            });
        }

        let mut killers = Vec::with_capacity(decl.feature_killers.len());
        for (name, phase) in &decl.feature_killers {
            Self::check_phase(*phase)?;
            killers.push((self.feature_id(name)?, KillerFeatureQualifier { phase: *phase }));
        }

        let mut kill_dna_quals = Vec::with_capacity(decl.dna_killers.len());
        for (src_motif, tgt_motif) in &decl.dna_killers {
            let src_dna = self
                .motif_dict
                .id(src_motif)
                .ok_or_else(|| GrammarError::UnknownMotif(src_motif.clone()))?;
            let tgt_dna = self
                .motif_dict
                .id(tgt_motif)
                .ok_or_else(|| GrammarError::UnknownMotif(tgt_motif.clone()))?;
            kill_dna_quals.push(DnaKillerQualifier { src_dna, tgt_dna });
        }

        self.relations.push(RelationEntry {
            tgt_idx,
            src_idx,
            relation: Relation {
                src_idx,
                tgt_idx,
                phase: decl.phase,
                min_dist: decl.min_dist,
                max_dist: decl.max_dist,
                len_fun,
                seg_quals,
                kill_feat_quals: None,
                kill_dna_quals,
            },
            killers,
        });
        Ok(())
    }

    /// Global killer table entry: features of type `killer` invalidate every
    /// edge ending at a `tgt` feature they precede.
    pub fn add_upstream_killer(
        &mut self,
        tgt: &str,
        killer: &str,
        phase: Option<u8>,
    ) -> Result<(), GrammarError> {
        Self::check_phase(phase)?;
        let entry = KillerEntry {
            owner_idx: self.feature_id(tgt)?,
            killer_idx: self.feature_id(killer)?,
            qual: KillerFeatureQualifier { phase },
        };
        self.killers_up.push(entry);
        Ok(())
    }

    /// Global killer table entry: features of type `killer` invalidate every
    /// edge starting at a `src` feature they follow.
    pub fn add_downstream_killer(
        &mut self,
        src: &str,
        killer: &str,
        phase: Option<u8>,
    ) -> Result<(), GrammarError> {
        Self::check_phase(phase)?;
        let entry = KillerEntry {
            owner_idx: self.feature_id(src)?,
            killer_idx: self.feature_id(killer)?,
            qual: KillerFeatureQualifier { phase },
        };
        self.killers_down.push(entry);
        Ok(())
    }

    /// Resolve every declaration into dense per-type tables, fold
    /// `multiplier * sigma` into the length functions and freeze the grammar.
    pub fn finalise(self, sigma: f64) -> Result<Grammar, GrammarError> {
        let begin_idx = self.feat_dict.id(BEGIN).ok_or(GrammarError::MissingAnchor)?;
        let end_idx = self.feat_dict.id(END).ok_or(GrammarError::MissingAnchor)?;

        let n_types = self.feat_dict.len();
        let mut feat_info: Vec<FeatureInfo> = self
            .feat_decls
            .iter()
            .map(|decl| FeatureInfo {
                start_offset: decl.start_offset,
                end_offset: decl.end_offset,
                multiplier: decl.multiplier,
                is_killer: decl.is_killer,
                sources: vec![None; n_types],
                kill_feat_quals_up: None,
                kill_feat_quals_down: None,
            })
            .collect();

        for entry in self.relations {
            let mut relation = entry.relation;
            if !entry.killers.is_empty() {
                let mut dense = vec![None; n_types];
                for (idx, qual) in entry.killers {
                    dense[idx] = Some(qual);
                }
                relation.kill_feat_quals = Some(dense);
            }
            feat_info[entry.tgt_idx].sources[entry.src_idx] = Some(relation);
        }

        for entry in self.killers_up {
            let table = feat_info[entry.owner_idx]
                .kill_feat_quals_up
                .get_or_insert_with(|| vec![None; n_types]);
            table[entry.killer_idx] = Some(entry.qual);
        }
        for entry in self.killers_down {
            let table = feat_info[entry.owner_idx]
                .kill_feat_quals_down
                .get_or_insert_with(|| vec![None; n_types]);
            table[entry.killer_idx] = Some(entry.qual);
        }

        let mut length_funcs = self.length_funcs;
        for lf in &mut length_funcs {
            lf.scale(sigma);
        }

        debug!(
            "Grammar finalised: {} feature types, {} segment types, {} motifs, {} length functions",
            n_types,
            self.seg_dict.len(),
            self.motif_dict.len(),
            length_funcs.len()
        );

        Ok(Grammar {
            feat_dict: self.feat_dict,
            seg_dict: self.seg_dict,
            motif_dict: self.motif_dict,
            len_fun_dict: self.len_fun_dict,
            feat_info,
            seg_info: self.seg_info,
            length_funcs,
            begin_idx,
            end_idx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_builder() -> GrammarBuilder {
        let mut builder = GrammarBuilder::new();
        for name in [BEGIN, "exon", END] {
            builder.add_feature(name, FeatureDecl::default()).unwrap();
        }
        builder
    }

    #[test]
    fn finalise_requires_anchors() {
        let mut builder = GrammarBuilder::new();
        builder.add_feature("exon", FeatureDecl::default()).unwrap();
        assert!(matches!(builder.finalise(1.0), Err(GrammarError::MissingAnchor)));
    }

    #[test]
    fn relations_land_in_dense_tables() {
        let mut builder = minimal_builder();
        builder
            .add_relation("exon", BEGIN, RelationDecl { phase: Some(0), ..Default::default() })
            .unwrap();
        builder.add_relation(END, "exon", RelationDecl::default()).unwrap();

        let grammar = builder.finalise(1.0).unwrap();
        let exon = grammar.feature_id("exon").unwrap();

        assert_eq!(grammar.relation(exon, grammar.begin_idx()).unwrap().phase, Some(0));
        assert!(grammar.relation(grammar.end_idx(), exon).is_some());
        assert!(grammar.relation(grammar.begin_idx(), exon).is_none());
        assert!(grammar.relation(exon, grammar.end_idx()).is_none());
    }

    #[test]
    fn duplicate_relation_is_rejected() {
        let mut builder = minimal_builder();
        builder.add_relation("exon", BEGIN, RelationDecl::default()).unwrap();
        let err = builder.add_relation("exon", BEGIN, RelationDecl::default());
        assert!(matches!(err, Err(GrammarError::DuplicateRelation { .. })));
    }

    #[test]
    fn per_edge_killers_are_densified() {
        let mut builder = minimal_builder();
        builder
            .add_feature("stop", FeatureDecl { is_killer: true, ..Default::default() })
            .unwrap();
        builder
            .add_relation(
                END,
                "exon",
                RelationDecl {
                    feature_killers: vec![("stop".to_string(), Some(1))],
                    ..Default::default()
                },
            )
            .unwrap();

        let grammar = builder.finalise(1.0).unwrap();
        let exon = grammar.feature_id("exon").unwrap();
        let stop = grammar.feature_id("stop").unwrap();
        let rel = grammar.relation(grammar.end_idx(), exon).unwrap();

        let table = rel.kill_feat_quals.as_ref().unwrap();
        assert_eq!(table.len(), grammar.feat_count());
        assert_eq!(table[stop].unwrap().phase, Some(1));
        assert!(table[exon].is_none());
    }

    #[test]
    fn global_killers_take_their_own_table() {
        let mut builder = minimal_builder();
        builder
            .add_feature("stop", FeatureDecl { is_killer: true, ..Default::default() })
            .unwrap();
        builder.add_upstream_killer(END, "stop", None).unwrap();
        builder.add_downstream_killer("exon", "stop", Some(2)).unwrap();

        let grammar = builder.finalise(1.0).unwrap();
        let exon = grammar.feature_id("exon").unwrap();
        let stop = grammar.feature_id("stop").unwrap();

        let up = grammar.info(grammar.end_idx()).kill_feat_quals_up.as_ref().unwrap();
        assert!(up[stop].unwrap().phase.is_none());
        let down = grammar.info(exon).kill_feat_quals_down.as_ref().unwrap();
        assert_eq!(down[stop].unwrap().phase, Some(2));
    }

    #[test]
    fn unknown_names_are_reported() {
        let mut builder = minimal_builder();
        let err = builder.add_relation("exon", "intron", RelationDecl::default());
        assert!(matches!(err, Err(GrammarError::UnknownFeature(name)) if name == "intron"));
    }
}
