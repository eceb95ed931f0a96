mod dict;
pub use dict::Dictionary;

mod length;
pub use length::LengthFunction;

mod qualifiers;
pub use qualifiers::{DnaKillerQualifier, KillerFeatureQualifier, SegmentPhase, SegmentQualifier};

mod relation;
pub use relation::Relation;

mod info;
pub use info::{FeatureInfo, SegmentInfo};

mod grammar;
pub use crate::grammar::{
    FeatureDecl, Grammar, GrammarBuilder, RelationDecl, SegmentQualifierDecl, BEGIN, END,
};

mod load;

mod error;
pub use error::GrammarError;
