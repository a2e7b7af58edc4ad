use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ClipError {
    #[error("probe failed for '{path}': {message}")]
    Probe { path: PathBuf, message: String },

    #[error("decoder failed for '{path}': {message}")]
    Decode { path: PathBuf, message: String },

    #[error("clip #{0} is already on deck")]
    InUse(usize),

    #[error("clip #{0} failed to preload and is out of rotation")]
    Unavailable(usize),

    #[error("clip index {index} out of range ({len} clips)")]
    OutOfRange { index: usize, len: usize },
}

impl ClipError {
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("failed to list '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no clips found in '{0}'")]
    Empty(PathBuf),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SelectError {
    #[error("clip provider is empty")]
    Empty,

    #[error("every clip is shorter than {min_secs:.2}s")]
    AllTooShort { min_secs: f32 },

    #[error("no clip available besides the ones on deck")]
    NothingAvailable,
}
