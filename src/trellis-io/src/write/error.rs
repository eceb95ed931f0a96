use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to create output file '{path}'")]
    Uncreatable { path: String, #[source] source: std::io::Error },

    #[error("Failed to write output")]
    Io(#[from] std::io::Error),
}
