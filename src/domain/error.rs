//! Domain error types.

/// Top-level error type for trendedge.
#[derive(Debug, thiserror::Error)]
pub enum TrendEdgeError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid parameters: {}", messages.join("; "))]
    InvalidParameters { messages: Vec<String> },

    #[error("no data for {symbol}: {reason}")]
    NoData { symbol: String, reason: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("invalid series: {reason}")]
    InvalidSeries { reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TrendEdgeError> for std::process::ExitCode {
    fn from(err: &TrendEdgeError) -> Self {
        let code: u8 = match err {
            TrendEdgeError::Io(_) => 1,
            TrendEdgeError::ConfigParse { .. } | TrendEdgeError::ConfigInvalid { .. } => 2,
            TrendEdgeError::DataSource { .. } => 3,
            TrendEdgeError::InvalidParameters { .. }
            | TrendEdgeError::Shape { .. }
            | TrendEdgeError::InvalidSeries { .. } => 4,
            TrendEdgeError::NoData { .. } | TrendEdgeError::InsufficientData { .. } => 5,
            TrendEdgeError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
