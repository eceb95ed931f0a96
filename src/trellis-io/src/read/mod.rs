use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use grammar::Grammar;
use log::{debug, warn};

mod error;
pub use error::FeatureFileError;

/// A candidate feature as ingested: grammar ids resolved, coordinates made
/// absolute, score still unscaled.
#[derive(Debug, Clone, Copy)]
pub struct FeatureRecord {
    pub feat_idx: usize,
    pub start   : i64,
    pub end     : i64,
    pub score   : f64,
    pub src_dna : Option<usize>,
    pub tgt_dna : Option<usize>,
    pub selected: bool,
    pub correct : bool,
}

/// A scoring segment as ingested; `score` is per residue and unscaled.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRecord {
    pub seg_idx: usize,
    pub start  : i64,
    pub end    : i64,
    pub score  : f64,
    pub frame  : Option<u8>,
}

/// One step of a reference path, matched later against prepared features by
/// type and real span.
#[derive(Debug, Clone, Copy)]
pub struct PathRecord {
    pub feat_idx: usize,
    pub start   : i64,
    pub end     : i64,
}

/// Everything read from the feature files.
#[derive(Debug, Default)]
pub struct SequenceData {
    pub seq_name: Option<String>,
    pub features: Vec<FeatureRecord>,
    pub segments: Vec<SegmentRecord>,
}

/// Region of interest and coordinate convention for ingestion.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub begin_dna : i64,
    /// Use `i64::MAX` to keep everything to the right of `begin_dna`.
    pub end_dna   : i64,
    /// Residue number of the first residue in the input files; positions are
    /// shifted by `offset_dna - 1` to absolute coordinates.
    pub offset_dna: i64,
}

impl Region {
    fn absolute(&self, pos: i64) -> i64 {
        pos + self.offset_dna - 1
    }

    fn keeps(&self, start: i64, end: i64) -> bool {
        start >= self.begin_dna && end <= self.end_dna
    }
}

struct GffLine<'a> {
    seqname: &'a str,
    feature: &'a str,
    start  : i64,
    end    : i64,
    score  : f64,
    frame  : Option<u8>,
    group  : &'a str,
}

/// Parse one tab-separated GFF record:
/// `seqname source feature start end score strand frame [group]`.
fn parse_gff_line<'a>(
    line: &'a str,
    path: &str,
    line_no: usize,
) -> Result<GffLine<'a>, FeatureFileError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 8 {
        return Err(FeatureFileError::TruncatedLine {
            path: path.to_string(),
            line: line_no,
            expected: 8,
            found: fields.len(),
        });
    }

    let parse_i64 = |value: &str, what: &'static str| {
        value.trim().parse::<i64>().map_err(|_| FeatureFileError::BadNumber {
            path: path.to_string(),
            line: line_no,
            value: value.to_string(),
            what,
        })
    };

    let start = parse_i64(fields[3], "a start coordinate")?;
    let end = parse_i64(fields[4], "an end coordinate")?;
    if start > end {
        return Err(FeatureFileError::ReversedSpan {
            path: path.to_string(),
            line: line_no,
            start,
            end,
        });
    }

    let score = match fields[5].trim() {
        "." | "" => 0.0,
        value => value.parse::<f64>().map_err(|_| FeatureFileError::BadNumber {
            path: path.to_string(),
            line: line_no,
            value: value.to_string(),
            what: "a score",
        })?,
    };

    let frame = match fields[7].trim() {
        "." | "" => None,
        value => Some(parse_i64(value, "a frame")? as u8 % 3),
    };

    Ok(GffLine {
        seqname: fields[0],
        feature: fields[2],
        start,
        end,
        score,
        frame,
        group: fields.get(8).copied().unwrap_or(""),
    })
}

/// Read candidate features and scoring segments from GFF-style files.
///
/// A record whose feature name is a grammar feature type becomes a
/// [`FeatureRecord`]; a grammar segment type becomes a [`SegmentRecord`];
/// anything else is warned about once and skipped. The group column may
/// carry `selected`, `correct`, `src_dna=<motif>` and `tgt_dna=<motif>`
/// attributes. Records outside the region of interest are dropped.
pub fn read_feature_files(
    paths: &[PathBuf],
    grammar: &Grammar,
    region: Region,
) -> Result<SequenceData, FeatureFileError> {
    let mut data = SequenceData::default();

    for path in paths {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|source| FeatureFileError::Unreadable {
            path: display.clone(),
            source,
        })?;

        let mut kept = 0usize;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| FeatureFileError::Unreadable {
                path: display.clone(),
                source,
            })?;
            let line_no = line_no + 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let gff = parse_gff_line(&line, &display, line_no)?;
            let (start, end) = (region.absolute(gff.start), region.absolute(gff.end));
            if !region.keeps(start, end) {
                continue;
            }

            if let Some(name) = &data.seq_name {
                if name.as_str() != gff.seqname {
                    warn!("{display}:{line_no}: sequence name '{}' differs from '{name}'", gff.seqname);
                }
            } else {
                data.seq_name = Some(gff.seqname.to_string());
            }

            if let Some(feat_idx) = grammar.feature_id(gff.feature) {
                let mut record = FeatureRecord {
                    feat_idx,
                    start,
                    end,
                    score: gff.score,
                    src_dna: None,
                    tgt_dna: None,
                    selected: false,
                    correct: false,
                };
                for attr in gff.group.split(';').map(str::trim).filter(|a| !a.is_empty()) {
                    match attr.split_once('=') {
                        None if attr == "selected" => record.selected = true,
                        None if attr == "correct" => record.correct = true,
                        Some(("src_dna", motif)) => {
                            record.src_dna =
                                Some(grammar.motif_id(motif).ok_or_else(|| {
                                    FeatureFileError::UnknownMotif {
                                        path: display.clone(),
                                        line: line_no,
                                        motif: motif.to_string(),
                                    }
                                })?);
                        }
                        Some(("tgt_dna", motif)) => {
                            record.tgt_dna =
                                Some(grammar.motif_id(motif).ok_or_else(|| {
                                    FeatureFileError::UnknownMotif {
                                        path: display.clone(),
                                        line: line_no,
                                        motif: motif.to_string(),
                                    }
                                })?);
                        }
                        _ => debug!("{display}:{line_no}: ignoring attribute '{attr}'"),
                    }
                }
                data.features.push(record);
                kept += 1;
            } else if let Some(seg_idx) = grammar.segment_id(gff.feature) {
                data.segments.push(SegmentRecord {
                    seg_idx,
                    start,
                    end,
                    score: gff.score,
                    frame: gff.frame,
                });
                kept += 1;
            } else {
                warn!("{display}:{line_no}: '{}' is neither a feature nor a segment type, skipping", gff.feature);
            }
        }
        debug!("Read {kept} records from '{display}'");
    }

    Ok(data)
}

/// Read a reference path: feature records only, in file order.
pub fn read_path_file(
    path: &Path,
    grammar: &Grammar,
    region: Region,
) -> Result<Vec<PathRecord>, FeatureFileError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| FeatureFileError::Unreadable {
        path: display.clone(),
        source,
    })?;

    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| FeatureFileError::Unreadable {
            path: display.clone(),
            source,
        })?;
        let line_no = line_no + 1;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let gff = parse_gff_line(&line, &display, line_no)?;
        let Some(feat_idx) = grammar.feature_id(gff.feature) else {
            warn!("{display}:{line_no}: '{}' is not a feature type, skipping", gff.feature);
            continue;
        };
        records.push(PathRecord {
            feat_idx,
            start: region.absolute(gff.start),
            end: region.absolute(gff.end),
        });
    }

    if records.is_empty() {
        return Err(FeatureFileError::EmptyPath { path: display });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grammar::{FeatureDecl, GrammarBuilder, RelationDecl, BEGIN, END};
    use std::io::Write;

    fn test_grammar() -> Grammar {
        let mut builder = GrammarBuilder::new();
        for name in [BEGIN, "splice5", END] {
            builder.add_feature(name, FeatureDecl::default()).unwrap();
        }
        builder.add_segment("coding", 1.0).unwrap();
        builder.add_motif("GT");
        builder.add_relation("splice5", BEGIN, RelationDecl::default()).unwrap();
        builder.add_relation(END, "splice5", RelationDecl::default()).unwrap();
        builder.finalise(1.0).unwrap()
    }

    fn region() -> Region {
        Region { begin_dna: 1, end_dna: i64::MAX, offset_dna: 1 }
    }

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn features_and_segments_are_dispatched() {
        let grammar = test_grammar();
        let file = write_file(
            "# comment\n\
             chr1\ttest\tsplice5\t10\t11\t1.5\t+\t.\tselected;src_dna=GT\n\
             chr1\ttest\tcoding\t5\t50\t0.25\t+\t0\t\n\
             chr1\ttest\tnoise\t5\t50\t0.25\t+\t.\t\n",
        );

        let data =
            read_feature_files(&[file.path().to_path_buf()], &grammar, region()).unwrap();
        assert_eq!(data.seq_name.as_deref(), Some("chr1"));
        assert_eq!(data.features.len(), 1);
        assert_eq!(data.segments.len(), 1);

        let feat = data.features[0];
        assert!(feat.selected);
        assert_eq!(feat.src_dna, grammar.motif_id("GT"));
        assert!(feat.tgt_dna.is_none());
        assert_eq!((feat.start, feat.end), (10, 11));

        let seg = data.segments[0];
        assert_eq!(seg.frame, Some(0));
        assert!((seg.score - 0.25).abs() < 1e-12);
    }

    #[test]
    fn region_filter_and_offset() {
        let grammar = test_grammar();
        let file = write_file(
            "chr1\ttest\tsplice5\t10\t11\t1.0\t+\t.\t\n\
             chr1\ttest\tsplice5\t200\t201\t1.0\t+\t.\t\n",
        );

        let region = Region { begin_dna: 100, end_dna: 150, offset_dna: 100 };
        let data = read_feature_files(&[file.path().to_path_buf()], &grammar, region).unwrap();
        // 10..=11 shifts to 109..=110 and stays; 200..=201 shifts out of range
        assert_eq!(data.features.len(), 1);
        assert_eq!(data.features[0].start, 109);
    }

    #[test]
    fn truncated_lines_are_rejected() {
        let grammar = test_grammar();
        let file = write_file("chr1\ttest\tsplice5\t10\t11\n");
        let err = read_feature_files(&[file.path().to_path_buf()], &grammar, region());
        assert!(matches!(err, Err(FeatureFileError::TruncatedLine { .. })));
    }

    #[test]
    fn path_files_keep_order() {
        let grammar = test_grammar();
        let file = write_file(
            "chr1\ttest\tBEGIN\t1\t1\t.\t+\t.\t\n\
             chr1\ttest\tsplice5\t10\t11\t.\t+\t.\t\n\
             chr1\ttest\tEND\t100\t100\t.\t+\t.\t\n",
        );
        let records = read_path_file(file.path(), &grammar, region()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].start, 10);
    }
}
