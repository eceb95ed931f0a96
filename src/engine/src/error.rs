use thiserror::Error;

use crate::feature::Span;
use crate::path::PathViolation;

#[derive(Error, Debug)]
pub enum EngineError {
    /// END is unreachable after the forward sweep: the input has no legal
    /// parse under the grammar. Distinct from an empty path.
    #[error("No legal path joins the sequence anchors under this grammar")]
    NoLegalPath,

    #[error(transparent)]
    InvalidPath(#[from] PathViolation),

    #[error("Input may not contain '{0}' features; the anchors are generated internally")]
    DuplicateAnchor(String),

    #[error("Feature '{name}' at {span} lies outside the requested region {begin}..={end}")]
    FeatureOutOfRange {
        name : String,
        span : Span,
        begin: i64,
        end  : i64,
    },

    #[error("After offset adjustment, feature '{0}' at {1} falls outside the anchors; widen the region or revisit the type offsets")]
    AnchorNotTerminal(String, Span),

    #[error("Path entry '{name}' at {span} matches no prepared candidate feature")]
    UnmatchedPathEntry { name: String, span: Span },
}
