//! Overlay error and outcome types
//!
//! Two kinds of failure exist. Data inconsistencies between the search
//! controller and the page text are non-fatal: the overlay renders what it
//! can and reports the anomalies. Losing the annotation data is fatal for
//! that layer and the caller is expected to fall back to a plain page view.

use thiserror::Error;

/// Fatal overlay errors
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The page's annotation descriptors could not be fetched
    #[error("failed to fetch annotations for page {page_index}: {source}")]
    AnnotationFetch {
        page_index: usize,
        #[source]
        source: SourceError,
    },

    /// The builder was disposed together with its page view
    #[error("overlay builder for page {0} has been disposed")]
    Disposed(usize),
}

/// Error reported by an external page data source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type alias for overlay operations
pub type OverlayResult<T> = std::result::Result<T, OverlayError>;

/// Inconsistency between search offsets and the page text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// A match begins or ends past the end of the page text
    OffsetOutOfRange { match_index: usize, offset: usize, text_len: usize },

    /// A match starts before the previous one ended
    OutOfOrder { match_index: usize },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::OffsetOutOfRange { match_index, offset, text_len } => write!(
                f,
                "match {match_index} offset {offset} is outside the page text (length {text_len})"
            ),
            Anomaly::OutOfOrder { match_index } => {
                write!(f, "match {match_index} starts before the previous match ended")
            }
        }
    }
}

/// Non-fatal result of a render step
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RenderOutcome {
    /// Everything rendered as requested
    #[default]
    Complete,

    /// Rendered best-effort; the listed anomalies were logged
    Partial { anomalies: Vec<Anomaly> },
}

impl RenderOutcome {
    pub fn from_anomalies(anomalies: Vec<Anomaly>) -> Self {
        if anomalies.is_empty() {
            RenderOutcome::Complete
        } else {
            RenderOutcome::Partial { anomalies }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, RenderOutcome::Complete)
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        match self {
            RenderOutcome::Complete => &[],
            RenderOutcome::Partial { anomalies } => anomalies,
        }
    }
}
