pub mod read;
pub use read::{
    read_feature_files, read_path_file, FeatureFileError, FeatureRecord, PathRecord, Region,
    SegmentRecord, SequenceData,
};

pub mod write;
pub use write::{output_writer, write_path, write_posteriors, PathRow, PosteriorRow, WriterError};
