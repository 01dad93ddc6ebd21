// THEORY:
// Every failure in this crate is local and deterministic: a malformed input, an
// undefined geometric quantity, or a configuration that could never produce a
// meaningful answer. None of them are transient, so nothing is retried and
// nothing is silently replaced by a default label. A garment whose color could
// not be determined must never be reported as "preto".

use thiserror::Error;

/// The single error type returned by the color engine and the posture classifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Empty or malformed pixel region, missing joint, unsupported channel layout.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An angle was requested for a joint triple where a limb vector has zero length.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A palette or engine configuration that is unusable. Raised at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
