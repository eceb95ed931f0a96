use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::debug;
use serde::{Deserialize, Serialize};

mod error;
pub use error::ParserError;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[clap(name="trellis-rs", author, version, about, long_about = None)]
/// TRELLIS-rs: gene structure prediction through constrained Viterbi decoding
pub struct Cli {
    /// YAML grammar document describing feature types, relations, segments,
    /// killers and length functions.
    #[clap(short, long)]
    pub grammar_file: PathBuf,

    /// GFF-style file of candidate features and scoring segments.
    ///
    /// May be given multiple times; the records of every file are pooled.
    #[clap(short, long, required = true)]
    pub feature_file: Vec<PathBuf>,

    /// Residue number at which to start looking for genes.
    #[clap(long, default_value_t = 1)]
    pub begin_dna: i64,

    /// Residue number at which to stop looking for genes.
    ///
    /// Defaults to just past the rightmost input feature.
    #[clap(long)]
    pub end_dna: Option<i64>,

    /// Residue number of the first residue in the input files.
    #[clap(long, default_value_t = 1)]
    pub offset_dna: i64,

    /// Global multiplier applied to every local, segment and length score.
    #[clap(long, default_value_t = 1.0)]
    pub sigma: f64,

    /// Honour Selected features in the input: no predicted path may skip one.
    #[clap(long)]
    pub selected: bool,

    /// Calculate posterior probabilities, and show every feature scoring at
    /// or above the given threshold.
    #[clap(long)]
    pub post_probs: Option<f64>,

    /// Do not print the best path (usually combined with --post-probs).
    #[clap(long)]
    pub no_path: bool,

    /// Perform the full dynamic programming, as opposed to the faster
    /// dominance-pruned method.
    #[clap(long)]
    pub full_calc: bool,

    /// Sample a gene proportionally to its posterior probability instead of
    /// reporting the maximum-scoring one.
    #[clap(long)]
    pub sample_gene: bool,

    /// Validate and score the given path instead of predicting one.
    #[clap(short, long)]
    pub path: Option<PathBuf>,

    /// Seed for the sampled traceback. Random when omitted.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Write the prediction to the given file instead of stdout.
    #[clap(short, long)]
    pub output_file: Option<PathBuf>,

    /// Directory receiving the serialized command line arguments.
    #[clap(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// Note that the program will still output warnings by default, even
    /// when this flag is off. Use --quiet/-q to disable them.
    #[clap(short='v', long, parse(from_occurrences), global=true)]
    pub verbose: u8,

    /// Disable warnings. Only errors will be displayed.
    #[clap(short='q', long, global=true)]
    pub quiet: bool,
}

impl Cli {
    /// Sanity-check argument combinations that clap cannot express.
    pub fn validate(&self) -> Result<(), ParserError> {
        if let Some(end) = self.end_dna {
            if self.begin_dna > end {
                return Err(ParserError::InvalidDnaRange(self.begin_dna, end));
            }
        }
        if self.sigma <= 0.0 {
            return Err(ParserError::InvalidSigma(self.sigma));
        }
        if let Some(threshold) = self.post_probs {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ParserError::InvalidThreshold(threshold));
            }
        }
        let mut seen = HashSet::new();
        for file in &self.feature_file {
            if !seen.insert(file) {
                return Err(ParserError::DuplicateFeatureFile(file.display().to_string()));
            }
        }
        Ok(())
    }

    /// Serialize the command line arguments within a `.yaml` file, for
    /// provenance. File naming follows '{current time}-trellis.yaml', under
    /// the user-provided `--output-dir` folder.
    pub fn serialize(&self) -> Result<()> {
        let serialized = serde_yaml::to_string(&self)?;
        debug!("\n---- Command line args ----\n{serialized}\n---");

        let current_time = chrono::offset::Local::now().format("%Y-%m-%dT%H%M%S").to_string();
        let output_file = self.output_dir.join(format!("{current_time}-trellis.yaml"));
        std::fs::write(&output_file, serialized).map_err(|e| {
            anyhow::anyhow!("Unable to serialize arguments into {}: [{e}]", output_file.display())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec!["trellis-rs", "--grammar-file", "model.yaml", "--feature-file", "feats.gff"]
    }

    #[test]
    fn minimal_invocation_parses() {
        let cli = Cli::parse_from(base_args());
        assert_eq!(cli.begin_dna, 1);
        assert_eq!(cli.offset_dna, 1);
        assert!(cli.end_dna.is_none());
        assert!((cli.sigma - 1.0).abs() < f64::EPSILON);
        assert!(!cli.full_calc);
        cli.validate().unwrap();
    }

    #[test]
    fn feature_files_accumulate() {
        let mut args = base_args();
        args.extend(["--feature-file", "more.gff"]);
        let cli = Cli::parse_from(args);
        assert_eq!(cli.feature_file.len(), 2);
        cli.validate().unwrap();
    }

    #[test]
    fn reversed_region_is_rejected() {
        let mut args = base_args();
        args.extend(["--begin-dna", "100", "--end-dna", "10"]);
        let cli = Cli::parse_from(args);
        assert!(matches!(cli.validate(), Err(ParserError::InvalidDnaRange(100, 10))));
    }

    #[test]
    fn duplicate_feature_file_is_rejected() {
        let mut args = base_args();
        args.extend(["--feature-file", "feats.gff"]);
        let cli = Cli::parse_from(args);
        assert!(matches!(cli.validate(), Err(ParserError::DuplicateFeatureFile(_))));
    }

    #[test]
    fn verbosity_accumulates() {
        let mut args = base_args();
        args.extend(["-v", "-v"]);
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 2);
    }
}
