use std::path::PathBuf;

use thiserror::Error;

use crate::series::SeriesId;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("unknown series '{0}' (expected latency, throughput or requests)")]
    UnknownSeries(String),

    #[error("{sample} sample cannot be appended to the {series} series")]
    SeriesMismatch {
        series: SeriesId,
        sample: SeriesId,
    },

    #[error("failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl ConsoleError {
    /// Both series errors are the InvalidArgument kind: the caller named
    /// something outside the closed set.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::UnknownSeries(_) | Self::SeriesMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
