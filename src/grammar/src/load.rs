use std::fs::File;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::{
    FeatureDecl, Grammar, GrammarBuilder, GrammarError, RelationDecl, SegmentPhase,
    SegmentQualifierDecl,
};

/// On-disk grammar document. The schema mirrors the builder vocabulary
/// one-to-one; every cross reference is by name and resolved during
/// [`GrammarBuilder::finalise`].
#[derive(Debug, Deserialize)]
struct GrammarDoc {
    #[serde(default)]
    features: Vec<FeatureDoc>,
    #[serde(default)]
    segments: Vec<SegmentDoc>,
    #[serde(default)]
    motifs: Vec<String>,
    #[serde(default)]
    length_functions: Vec<LengthFunctionDoc>,
    #[serde(default)]
    relations: Vec<RelationDoc>,
    #[serde(default)]
    upstream_killers: Vec<UpstreamKillerDoc>,
    #[serde(default)]
    downstream_killers: Vec<DownstreamKillerDoc>,
}

#[derive(Debug, Deserialize)]
struct FeatureDoc {
    name: String,
    #[serde(default)]
    start_offset: i64,
    #[serde(default)]
    end_offset: i64,
    #[serde(default = "default_multiplier")]
    multiplier: f64,
    #[serde(default)]
    killer: bool,
}

#[derive(Debug, Deserialize)]
struct SegmentDoc {
    name: String,
    #[serde(default = "default_multiplier")]
    multiplier: f64,
}

#[derive(Debug, Deserialize)]
struct LengthFunctionDoc {
    name: String,
    #[serde(default = "default_multiplier")]
    multiplier: f64,
    values: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct RelationDoc {
    target: String,
    source: String,
    #[serde(default)]
    phase: Option<u8>,
    #[serde(default)]
    min_dist: Option<i64>,
    #[serde(default)]
    max_dist: Option<i64>,
    #[serde(default)]
    length_function: Option<String>,
    #[serde(default)]
    segments: Vec<SegmentQualifierDoc>,
    #[serde(default)]
    feature_killers: Vec<FeatureKillerDoc>,
    #[serde(default)]
    dna_killers: Vec<DnaKillerDoc>,
}

#[derive(Debug, Deserialize)]
struct SegmentQualifierDoc {
    segment: String,
    /// "source" or "target"; absent means the frameless bucket.
    #[serde(default)]
    phase_anchor: Option<String>,
    #[serde(default)]
    phase: Option<u8>,
    #[serde(default)]
    exact_source: bool,
    #[serde(default)]
    exact_target: bool,
    #[serde(default = "default_true")]
    partial: bool,
    #[serde(default = "default_true")]
    sum: bool,
    #[serde(default = "default_true")]
    projected: bool,
}

#[derive(Debug, Deserialize)]
struct FeatureKillerDoc {
    feature: String,
    #[serde(default)]
    phase: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct DnaKillerDoc {
    source_motif: String,
    target_motif: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamKillerDoc {
    target: String,
    killer: String,
    #[serde(default)]
    phase: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct DownstreamKillerDoc {
    source: String,
    killer: String,
    #[serde(default)]
    phase: Option<u8>,
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl SegmentQualifierDoc {
    fn phase(&self) -> Result<SegmentPhase, GrammarError> {
        let phase = self.phase.unwrap_or(0);
        match self.phase_anchor.as_deref() {
            Some("source") => Ok(SegmentPhase::Source(phase)),
            Some("target") => Ok(SegmentPhase::Target(phase)),
            None => Ok(SegmentPhase::None),
            Some(other) => Err(GrammarError::InvalidPhaseAnchor(other.to_string())),
        }
    }
}

impl Grammar {
    /// Load a grammar document and finalise it under the given sigma.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P, sigma: f64) -> Result<Self, GrammarError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| GrammarError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        let doc: GrammarDoc =
            serde_yaml::from_reader(file).map_err(|source| GrammarError::Unparseable {
                path: path.display().to_string(),
                source,
            })?;
        info!("Loaded grammar document '{}'", path.display());
        doc.into_grammar(sigma)
    }
}

impl GrammarDoc {
    fn into_grammar(self, sigma: f64) -> Result<Grammar, GrammarError> {
        let mut builder = GrammarBuilder::new();

        for feat in &self.features {
            builder.add_feature(
                &feat.name,
                FeatureDecl {
                    start_offset: feat.start_offset,
                    end_offset: feat.end_offset,
                    multiplier: feat.multiplier,
                    is_killer: feat.killer,
                },
            )?;
        }
        for seg in &self.segments {
            builder.add_segment(&seg.name, seg.multiplier)?;
        }
        for motif in &self.motifs {
            builder.add_motif(motif);
        }
        for lf in self.length_functions {
            builder.add_length_function(&lf.name, lf.values, lf.multiplier)?;
        }

        for rel in &self.relations {
            let mut segments = Vec::with_capacity(rel.segments.len());
            for sq in &rel.segments {
                segments.push(SegmentQualifierDecl {
                    segment: sq.segment.clone(),
                    phase: sq.phase()?,
                    is_exact_src: sq.exact_source,
                    is_exact_tgt: sq.exact_target,
                    partial: sq.partial,
                    score_sum: sq.sum,
                    use_projected: sq.projected,
                });
            }
            builder.add_relation(
                &rel.target,
                &rel.source,
                RelationDecl {
                    phase: rel.phase,
                    min_dist: rel.min_dist,
                    max_dist: rel.max_dist,
                    length_function: rel.length_function.clone(),
                    segments,
                    feature_killers: rel
                        .feature_killers
                        .iter()
                        .map(|k| (k.feature.clone(), k.phase))
                        .collect(),
                    dna_killers: rel
                        .dna_killers
                        .iter()
                        .map(|k| (k.source_motif.clone(), k.target_motif.clone()))
                        .collect(),
                },
            )?;
        }

        for killer in &self.upstream_killers {
            builder.add_upstream_killer(&killer.target, &killer.killer, killer.phase)?;
        }
        for killer in &self.downstream_killers {
            builder.add_downstream_killer(&killer.source, &killer.killer, killer.phase)?;
        }

        builder.finalise(sigma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOC: &str = "\
features:
  - name: BEGIN
  - name: exon
    multiplier: 2.0
  - name: stop
    killer: true
  - name: END
segments:
  - name: coding
    multiplier: 0.5
motifs: [GT, AG]
length_functions:
  - name: intron_pen
    multiplier: 1.0
    values: [0.0, 0.25, 0.5]
relations:
  - target: exon
    source: BEGIN
  - target: END
    source: exon
    phase: 0
    min_dist: 3
    length_function: intron_pen
    segments:
      - segment: coding
        phase_anchor: target
        phase: 0
        sum: true
    feature_killers:
      - feature: stop
        phase: 0
    dna_killers:
      - source_motif: GT
        target_motif: AG
upstream_killers:
  - target: END
    killer: stop
";

    #[test]
    fn loads_a_complete_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOC.as_bytes()).unwrap();

        let grammar = Grammar::from_yaml_file(file.path(), 2.0).unwrap();
        assert_eq!(grammar.feat_count(), 4);
        assert_eq!(grammar.seg_count(), 1);

        let exon = grammar.feature_id("exon").unwrap();
        let stop = grammar.feature_id("stop").unwrap();
        assert!(grammar.info(stop).is_killer);
        assert!((grammar.info(exon).multiplier - 2.0).abs() < f64::EPSILON);

        let rel = grammar.relation(grammar.end_idx(), exon).unwrap();
        assert_eq!(rel.phase, Some(0));
        assert_eq!(rel.min_dist, Some(3));
        assert_eq!(rel.seg_quals.len(), 1);
        assert_eq!(rel.seg_quals[0].phase, SegmentPhase::Target(0));
        assert_eq!(rel.kill_dna_quals.len(), 1);

        // sigma folded into the tables at load time
        let lf = grammar.length_function(rel.len_fun.unwrap());
        assert!((lf.penalty(1) - 0.5).abs() < 1e-12);
        assert!((lf.penalty(100) - 1.0).abs() < 1e-12);

        // global upstream table wins over the per-relation list
        assert!(grammar.info(grammar.end_idx()).kill_feat_quals_up.is_some());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Grammar::from_yaml_file("/nonexistent/grammar.yaml", 1.0);
        assert!(matches!(err, Err(GrammarError::Unreadable { .. })));
    }
}
