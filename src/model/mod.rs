//! Model artifacts: decoding, validation and scoring.

mod artifact;
pub mod estimator;
pub mod loader;

pub use artifact::{sigmoid, ArtifactMetadata, Calibration, ModelArtifact, Score};
pub use estimator::{
    DecisionFunction, DecisionScoreScorer, Estimator, ProbabilisticClassifier, ProbabilityScorer,
    Scorer,
};
pub use loader::{load, parse_artifact, resolve_path};
