use thiserror::Error;

/// Crate-wide error type for the superposed-epoch pipeline.
///
/// Configuration problems are raised eagerly at pipeline start and abort the
/// run; everything else is a per-unit condition that the drivers catch,
/// record, and skip (see the propagation policy in [`crate::pipeline`]).
#[derive(Error, Debug)]
pub enum SdconvError {
    #[error("Invalid pipeline parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown coordinate system: {0}")]
    UnknownCoordinateSystem(String),

    #[error("Event catalog parsing failed: {0}")]
    EventCatalogParsing(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Coordinate conversion failed: {0}")]
    CoordConversion(String),

    #[error("Cosine fit is underdetermined: {0} distinct azimuths")]
    UnderdeterminedFit(usize),

    #[error("Cosine fit did not converge within {0} iterations")]
    FitDidNotConverge(usize),

    #[error("Normal matrix is singular (degenerate azimuth geometry)")]
    SingularNormalMatrix,

    #[error("Store schema version {found} is newer than supported version {supported}")]
    SchemaVersionTooNew { found: u32, supported: u32 },
}

impl PartialEq for SdconvError {
    fn eq(&self, other: &Self) -> bool {
        use SdconvError::*;
        match (self, other) {
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (UnknownCoordinateSystem(a), UnknownCoordinateSystem(b)) => a == b,
            (EventCatalogParsing(a), EventCatalogParsing(b)) => a == b,
            (CoordConversion(a), CoordConversion(b)) => a == b,
            (UnderdeterminedFit(a), UnderdeterminedFit(b)) => a == b,
            (FitDidNotConverge(a), FitDidNotConverge(b)) => a == b,
            (
                SchemaVersionTooNew {
                    found: a,
                    supported: b,
                },
                SchemaVersionTooNew {
                    found: c,
                    supported: d,
                },
            ) => a == c && b == d,

            // Wrapped foreign errors compare by variant only
            (CsvError(_), CsvError(_)) => true,
            (IoError(_), IoError(_)) => true,

            // Unit variants
            (SingularNormalMatrix, SingularNormalMatrix) => true,

            _ => false,
        }
    }
}
