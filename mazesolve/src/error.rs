use serde::Serialize;

use crate::grid::Point;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    /// The corners do not enclose any area
    #[error("degenerate corner selection: {0}")]
    DegenerateSelection(String),

    /// Contour refinement found nothing usable; the segmenter recovers from this itself
    #[error("no usable maze contour found")]
    SegmentationAmbiguous,

    #[error("entrance or exit at row {}, col {} is not an open cell", .0.row, .0.col)]
    EndpointUnresolved(Point),

    #[error("could not solve maze with current selection")]
    Unsolvable,

    #[error("solve was cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    Unsolvable,
    DegenerateSelection,
    Cancelled,
    Internal,
}

/// What a caller gets back when a solve does not produce an overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolveFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<SolveError> for SolveFailure {
    fn from(err: SolveError) -> Self {
        let kind = match &err {
            SolveError::DegenerateSelection(_) => FailureKind::DegenerateSelection,
            SolveError::Unsolvable
            | SolveError::EndpointUnresolved(_)
            | SolveError::SegmentationAmbiguous => FailureKind::Unsolvable,
            SolveError::Cancelled => FailureKind::Cancelled,
            SolveError::InvalidConfig(_) | SolveError::InternalInvariant(_) => {
                FailureKind::Internal
            }
        };

        SolveFailure {
            kind,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        let failure = SolveFailure::from(SolveError::EndpointUnresolved(Point::new(3, 0)));
        assert_eq!(failure.kind, FailureKind::Unsolvable);
        assert_eq!(
            failure.message,
            "entrance or exit at row 3, col 0 is not an open cell"
        );

        let failure = SolveFailure::from(SolveError::DegenerateSelection("collinear".into()));
        assert_eq!(failure.kind, FailureKind::DegenerateSelection);

        let failure = SolveFailure::from(SolveError::InternalInvariant("size".into()));
        assert_eq!(failure.kind, FailureKind::Internal);
        assert_eq!(
            serde_json::to_string(&failure.kind).unwrap(),
            "\"INTERNAL\""
        );
    }
}
