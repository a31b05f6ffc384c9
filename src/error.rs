//! Error types for the duel simulator.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Everything that can go wrong before a fight starts.
///
/// Fights themselves are infallible once both fighters are built.
#[derive(Debug, Error)]
pub enum SimError {
    /// Class identifier that maps to none of the nine fighter models.
    #[error("unknown class identifier: {0}")]
    UnknownClass(String),

    /// Descriptor without any class at all.
    #[error("fighter {index} has no class")]
    MissingClass {
        /// Index of the offending fighter.
        index: usize,
    },

    /// Override tree or descriptor with a field of the wrong shape.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// YAML matchup or override file that failed to parse.
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Matchup file that does not describe exactly two fighters.
    #[error("a matchup needs exactly two fighters, found {0}")]
    FighterCount(usize),
}
