use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Express which stage of a run the problem belongs to.  There are no
/// transient problems in a batch run; every error aborts the run.
#[derive(Debug, PartialEq)]
pub enum ErrorLayer {
    /// The invocation itself is unusable: a bad regex, an output path whose
    /// extension we can't render to, an unreadable config file.  These are
    /// detected before any log data is looked at.
    BadInput,
    /// The access log contents are malformed, like a field without a `:`
    /// separator or a record missing the identifier field.
    DataLayer,
    /// Converting the finished graph into bytes failed, which usually means
    /// graphviz is missing or choked on the DOT we produced.
    RenderLayer,
    /// Something we believe can't happen did.
    InvariantViolation,
}

/// Details about what went wrong for investigation purposes.
#[derive(Debug, Error)]
#[error("{layer:?}: {message}")]
pub struct ErrorDetails {
    pub layer: ErrorLayer,
    /// Stringified version of the lower level error.
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// An error that will reproduce on every run with the same inputs.
    #[error("{0}")]
    StickyProblem(ErrorDetails),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn bad_input(message: impl Into<String>) -> Self {
        AnalysisError::StickyProblem(ErrorDetails {
            layer: ErrorLayer::BadInput,
            message: message.into(),
        })
    }

    pub fn data(message: impl Into<String>) -> Self {
        AnalysisError::StickyProblem(ErrorDetails {
            layer: ErrorLayer::DataLayer,
            message: message.into(),
        })
    }

    pub fn render(message: impl Into<String>) -> Self {
        AnalysisError::StickyProblem(ErrorDetails {
            layer: ErrorLayer::RenderLayer,
            message: message.into(),
        })
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        AnalysisError::StickyProblem(ErrorDetails {
            layer: ErrorLayer::InvariantViolation,
            message: message.into(),
        })
    }

    pub fn layer(&self) -> Option<&ErrorLayer> {
        match self {
            AnalysisError::StickyProblem(details) => Some(&details.layer),
            AnalysisError::Io(_) => None,
        }
    }
}

// Regexes only come from the invocation, so a bad one is bad input.
impl From<regex::Error> for AnalysisError {
    fn from(err: regex::Error) -> AnalysisError {
        AnalysisError::bad_input(err.to_string())
    }
}

impl From<toml::de::Error> for AnalysisError {
    fn from(err: toml::de::Error) -> AnalysisError {
        AnalysisError::bad_input(err.to_string())
    }
}

// We only produce JSON, so a failure here is on us.
impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> AnalysisError {
        AnalysisError::render(err.to_string())
    }
}
