use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

mod error;
pub use error::WriterError;

/// The program writing GFF output lines.
const SOURCE_TAG: &str = "trellis";

/// One step of a predicted or validated path, ready for output.
#[derive(Debug, Clone)]
pub struct PathRow {
    pub feature: String,
    pub start  : i64,
    pub end    : i64,
    pub score  : f64,
}

/// One feature whose posterior cleared the reporting threshold.
#[derive(Debug, Clone)]
pub struct PosteriorRow {
    pub feature  : String,
    pub start    : i64,
    pub end      : i64,
    pub score    : f64,
    pub posterior: f64,
}

/// A buffered writer over the requested output file, or stdout.
pub fn output_writer(path: Option<&Path>) -> Result<Box<dyn Write>, WriterError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|source| WriterError::Uncreatable {
                path: path.display().to_string(),
                source,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Write a path as GFF records, preceded by its total score.
pub fn write_path<W: Write>(
    writer: &mut W,
    seq_name: &str,
    rows: &[PathRow],
    total_score: f64,
) -> io::Result<()> {
    writeln!(writer, "## path ({} features), total score {total_score:.6}", rows.len())?;
    for row in rows {
        writeln!(
            writer,
            "{seq_name}\t{SOURCE_TAG}\t{}\t{}\t{}\t{:.6}\t+\t.",
            row.feature, row.start, row.end, row.score
        )?;
    }
    Ok(())
}

/// Write per-feature posterior probabilities at or above `threshold`.
pub fn write_posteriors<W: Write>(
    writer: &mut W,
    seq_name: &str,
    rows: &[PosteriorRow],
    threshold: f64,
) -> io::Result<()> {
    writeln!(writer, "## posterior probabilities >= {threshold:.3}")?;
    for row in rows {
        writeln!(
            writer,
            "{seq_name}\t{SOURCE_TAG}\t{}\t{}\t{}\t{:.6}\t+\t.\tposterior={:.6}",
            row.feature, row.start, row.end, row.score, row.posterior
        )?;
    }
    Ok(())
}
