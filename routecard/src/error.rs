use thiserror::Error;

/// Errors raised while loading configuration or evaluating a route card
#[derive(Debug, Error)]
pub enum RouteCardError {
    /// Catalogue or script-control table unreadable or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// The subject input holds no usable feature
    #[error("nothing selected: no subject feature to evaluate")]
    NoSubject,

    /// The subject does not fall inside any legal area
    #[error("subject '{0}' does not fall within any legal area")]
    NoLegalLocation(String),

    /// The geometry provider could not answer a query
    #[error("provider error on layer '{layer}': {message}")]
    Provider { layer: String, message: String },

    /// A geometry operation or conversion failed
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A single check failed; the whole subject is aborted
    #[error("Processing Failed: {label}: {layer}")]
    CheckFailed {
        label: String,
        layer: String,
        #[source]
        source: Box<RouteCardError>,
    },

    /// A report sink could not write its output
    #[error("report error: {0}")]
    Report(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RouteCardError {
    pub fn config(message: impl Into<String>) -> Self {
        RouteCardError::Config(message.into())
    }

    pub fn provider(layer: impl Into<String>, message: impl Into<String>) -> Self {
        RouteCardError::Provider {
            layer: layer.into(),
            message: message.into(),
        }
    }

    /// Configuration problems abort the whole batch before evaluation starts
    pub fn is_config(&self) -> bool {
        matches!(self, RouteCardError::Config(_) | RouteCardError::NoSubject)
    }
}

impl From<geos::Error> for RouteCardError {
    fn from(err: geos::Error) -> Self {
        RouteCardError::Geometry(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RouteCardError>;
