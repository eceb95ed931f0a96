use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("Unknown feature type '{0}'. Every feature referenced by a relation, killer or offset table must be declared first")]
    UnknownFeature(String),

    #[error("Unknown segment type '{0}'")]
    UnknownSegment(String),

    #[error("Unknown DNA motif '{0}'")]
    UnknownMotif(String),

    #[error("Unknown length function '{0}'")]
    UnknownLengthFunction(String),

    #[error("Duplicate declaration of feature type '{0}'")]
    DuplicateFeature(String),

    #[error("Duplicate declaration of segment type '{0}'")]
    DuplicateSegment(String),

    #[error("Duplicate declaration of length function '{0}'")]
    DuplicateLengthFunction(String),

    #[error("A relation between target '{target}' and source '{src}' was declared more than once")]
    DuplicateRelation { target: String, src: String },

    #[error("The grammar must declare both 'BEGIN' and 'END' anchor feature types")]
    MissingAnchor,

    #[error("Length function '{0}' has an empty value table")]
    EmptyLengthFunction(String),

    #[error("Phase qualifiers must lie within 0..=2, got {0}")]
    InvalidPhase(u8),

    #[error("Segment phase anchor must be 'source' or 'target', got '{0}'")]
    InvalidPhaseAnchor(String),

    #[error("Failed to open grammar file '{path}'")]
    Unreadable { path: String, #[source] source: std::io::Error },

    #[error("Failed to parse grammar file '{path}'")]
    Unparseable { path: String, #[source] source: serde_yaml::Error },
}
