use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureFileError {
    #[error("Failed to open feature file '{path}'")]
    Unreadable { path: String, #[source] source: std::io::Error },

    #[error("{path}:{line}: expected at least {expected} tab-separated fields, found {found}")]
    TruncatedLine { path: String, line: usize, expected: usize, found: usize },

    #[error("{path}:{line}: could not parse '{value}' as {what}")]
    BadNumber { path: String, line: usize, value: String, what: &'static str },

    #[error("{path}:{line}: start {start} exceeds end {end}")]
    ReversedSpan { path: String, line: usize, start: i64, end: i64 },

    #[error("{path}:{line}: unknown DNA motif '{motif}'")]
    UnknownMotif { path: String, line: usize, motif: String },

    #[error("Path file '{path}' contains no usable feature records")]
    EmptyPath { path: String },
}
