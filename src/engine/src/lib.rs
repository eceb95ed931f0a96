pub mod config;
pub use config::{CalcMode, EngineConfig, TracebackMode};

pub mod feature;
pub use feature::{prepare_features, Feature, Span};

pub mod segment;
pub use segment::{Segment, SegmentIndex, SegmentLists, SegmentRecord, FRAMELESS};

pub mod scorer;
pub use scorer::{score_edge, BoundaryFlags, SegScratch};

pub mod dp;
pub use dp::{legal_predecessors, max_traceback, sample_traceback, DpRunner, PredEdge};

pub mod path;
pub use path::{score_path, PathViolation};

pub mod posterior;
pub use posterior::{accuracy_histogram, posteriors, CalibrationBin};

mod error;
pub use error::EngineError;

use std::io::Write as _;

use ahash::AHashMap;
use anyhow::{Context, Result};
use grammar::Grammar;
use itertools::Itertools;
use log::{debug, info};

/// Bins of the posterior calibration histogram emitted with the report.
const CALIBRATION_BINS: usize = 20;

/// Top-level pipeline: load the grammar, ingest, prepare, sweep, then either
/// validate a supplied path or trace one back, with optional posteriors.
pub fn run(cli: &parser::Cli) -> Result<()> {
    cli.validate()?;
    let config = EngineConfig::from(cli);

    info!("Parsing grammar document...");
    let grammar = Grammar::from_yaml_file(&cli.grammar_file, config.sigma)
        .with_context(|| format!("while loading '{}'", cli.grammar_file.display()))?;

    info!("Reading the feature files...");
    let region = trellis_io::Region {
        begin_dna: config.begin_dna,
        end_dna: config.end_dna.unwrap_or(i64::MAX),
        offset_dna: config.offset_dna,
    };
    let data = trellis_io::read_feature_files(&cli.feature_file, &grammar, region)?;
    let seq_name = data.seq_name.clone().unwrap_or_else(|| "seq".to_string());

    info!(
        "Features: scaling, sorting and deduplicating {} candidates...",
        data.features.len()
    );
    let raw: Vec<Feature> = data
        .features
        .iter()
        .map(|record| {
            let mut feat = Feature::new(record.feat_idx, Span::new(record.start, record.end));
            feat.score = record.score;
            feat.src_dna = record.src_dna;
            feat.tgt_dna = record.tgt_dna;
            feat.is_selected = record.selected;
            feat.is_correct = record.correct;
            feat
        })
        .collect();
    let mut feats = prepare_features(raw, &grammar, &config)?;

    info!(
        "Segments: scaling, sorting, projecting and indexing {} segments...",
        data.segments.len()
    );
    let records: Vec<SegmentRecord> = data
        .segments
        .iter()
        .map(|record| SegmentRecord {
            seg_idx: record.seg_idx,
            span: Span::new(record.start, record.end),
            score: record.score,
            frame: record.frame,
        })
        .collect();
    let segments = SegmentIndex::build(records, &grammar, &config);

    let runner = DpRunner::new(&grammar, &segments, &config);
    info!(
        "Doing forward calculation over {} features and {} segments...",
        feats.len(),
        segments.total_segments()
    );
    runner.forward(&mut feats);

    let mut writer = trellis_io::output_writer(cli.output_file.as_deref())?;

    if let Some(path_file) = &cli.path {
        info!("Reading the reference path...");
        let records = trellis_io::read_path_file(path_file, &grammar, region)?;
        let reference = match_path(&records, &feats, &grammar)?;
        for &idx in &reference {
            feats[idx].is_correct = true;
        }

        let score =
            score_path(&reference, &feats, &grammar, &segments).map_err(EngineError::from)?;
        info!("The supplied path is legal, score {score:.6}");
        if !cli.no_path {
            write_path_rows(&mut writer, &seq_name, &reference, &feats, &grammar, score)?;
        }

        if let Some(threshold) = config.post_prob_threshold {
            info!("Doing backward calculation over {} features...", feats.len());
            runner.backward(&mut feats);
            report_posteriors(&mut writer, &seq_name, &feats, &grammar, threshold)?;
            writeln!(writer, "## posterior accuracy plot - sigma = {:.3}", config.sigma)?;
            for bin in accuracy_histogram(&feats, CALIBRATION_BINS) {
                writeln!(writer, "## {bin}")?;
            }
        }
        writer.flush()?;
        return Ok(());
    }

    let path = match config.traceback {
        TracebackMode::Max => max_traceback(&feats)?,
        TracebackMode::Sample => {
            let mut rng = match config.seed {
                Some(seed) => fastrand::Rng::with_seed(seed),
                None => fastrand::Rng::new(),
            };
            sample_traceback(&feats, &grammar, &segments, &mut rng)?
        }
    };
    // Sampled paths are not optimal; recompute the score either way, it also
    // cross-checks the sweep.
    let score = score_path(&path, &feats, &grammar, &segments).map_err(EngineError::from)?;
    debug!(
        "path: {} (score {score:.6})",
        path.iter().map(|&idx| grammar.feature_name(feats[idx].feat_idx)).join(" -> ")
    );

    if let Some(threshold) = config.post_prob_threshold {
        info!("Doing backward calculation over {} features...", feats.len());
        runner.backward(&mut feats);
        report_posteriors(&mut writer, &seq_name, &feats, &grammar, threshold)?;
    }

    if !cli.no_path {
        write_path_rows(&mut writer, &seq_name, &path, &feats, &grammar, score)?;
    }
    writer.flush()?;

    Ok(())
}

/// Resolve reference-path records onto prepared features by type and real
/// span. Every step must match a candidate, anchors included.
fn match_path(
    records: &[trellis_io::PathRecord],
    feats: &[Feature],
    grammar: &Grammar,
) -> Result<Vec<usize>, EngineError> {
    let by_site: AHashMap<(usize, Span), usize> = feats
        .iter()
        .enumerate()
        .map(|(idx, f)| ((f.feat_idx, f.real), idx))
        .collect();

    records
        .iter()
        .map(|record| {
            let span = Span::new(record.start, record.end);
            by_site.get(&(record.feat_idx, span)).copied().ok_or_else(|| {
                EngineError::UnmatchedPathEntry {
                    name: grammar.feature_name(record.feat_idx).to_string(),
                    span,
                }
            })
        })
        .collect()
}

fn write_path_rows<W: std::io::Write>(
    writer: &mut W,
    seq_name: &str,
    path: &[usize],
    feats: &[Feature],
    grammar: &Grammar,
    score: f64,
) -> Result<()> {
    let rows: Vec<trellis_io::PathRow> = path
        .iter()
        .map(|&idx| {
            let feat = &feats[idx];
            trellis_io::PathRow {
                feature: grammar.feature_name(feat.feat_idx).to_string(),
                start: feat.real.start,
                end: feat.real.end,
                score: feat.score,
            }
        })
        .collect();
    trellis_io::write_path(writer, seq_name, &rows, score)?;
    Ok(())
}

fn report_posteriors<W: std::io::Write>(
    writer: &mut W,
    seq_name: &str,
    feats: &[Feature],
    grammar: &Grammar,
    threshold: f64,
) -> Result<()> {
    let posts = posteriors(feats);
    let rows: Vec<trellis_io::PosteriorRow> = feats
        .iter()
        .zip(&posts)
        .filter(|(_, &post)| post >= threshold)
        .map(|(feat, &post)| trellis_io::PosteriorRow {
            feature: grammar.feature_name(feat.feat_idx).to_string(),
            start: feat.real.start,
            end: feat.real.end,
            score: feat.score,
            posterior: post,
        })
        .collect();
    trellis_io::write_posteriors(writer, seq_name, &rows, threshold)?;
    Ok(())
}
