//! Domain error types.

/// Top-level error type for rankfolio.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RankfolioError {
    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("no usable composite score in the signal window for {instrument}")]
    EmptySignalWindow { instrument: String },

    #[error("no candidate strategy passed evaluation ({evaluated} evaluated)")]
    NoCandidates { evaluated: usize },

    #[error("candidate pool mixes instruments: {first} and {other}")]
    MixedCandidatePool { first: String, other: String },

    #[error("portfolio optimization infeasible: {reason}")]
    OptimizationInfeasible { reason: String },

    #[error("invalid return series for {instrument}: {reason}")]
    InvalidReturns { instrument: String, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("io error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for RankfolioError {
    fn from(err: std::io::Error) -> Self {
        RankfolioError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<&RankfolioError> for std::process::ExitCode {
    fn from(err: &RankfolioError) -> Self {
        let code: u8 = match err {
            RankfolioError::Io { .. } => 1,
            RankfolioError::ConfigParse { .. }
            | RankfolioError::ConfigMissing { .. }
            | RankfolioError::ConfigInvalid { .. } => 2,
            RankfolioError::Data { .. } | RankfolioError::NoData { .. } => 3,
            RankfolioError::InsufficientData { .. }
            | RankfolioError::EmptySignalWindow { .. }
            | RankfolioError::InvalidReturns { .. } => 4,
            RankfolioError::NoCandidates { .. }
            | RankfolioError::MixedCandidatePool { .. }
            | RankfolioError::OptimizationInfeasible { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

pub type Result<T> = std::result::Result<T, RankfolioError>;
