use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("--begin-dna ({0}) must not exceed --end-dna ({1})")]
    InvalidDnaRange(i64, i64),

    #[error("--sigma must be strictly positive, got {0}")]
    InvalidSigma(f64),

    #[error("--post-probs expects a probability between 0 and 1, got {0}")]
    InvalidThreshold(f64),

    #[error("Feature file '{0}' was given more than once")]
    DuplicateFeatureFile(String),
}
