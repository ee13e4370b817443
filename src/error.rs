use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An IDX file had an unexpected header or was truncated.
    #[error("invalid idx file {path:?}: {reason}")]
    InvalidIdx { path: PathBuf, reason: String },

    /// A loss log line is not `epoch;loss`.
    #[error("invalid loss log {path:?} at line {line}")]
    InvalidLossLog { path: PathBuf, line: usize },

    #[error("failed to load config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("recorder error: {0}")]
    Recorder(#[from] burn::record::RecorderError),

    /// Tensor data could not be read back into host memory.
    #[error("tensor data error: {0}")]
    TensorData(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid arguments: {0}")]
    Args(#[from] pico_args::Error),

    #[error("unused arguments: {0:?}")]
    UnusedArgs(Vec<std::ffi::OsString>),

    #[error("{0} dataset is empty")]
    EmptyDataset(&'static str),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_idx(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidIdx {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<burn::tensor::DataError> for Error {
    fn from(err: burn::tensor::DataError) -> Self {
        Error::TensorData(format!("{err:?}"))
    }
}
