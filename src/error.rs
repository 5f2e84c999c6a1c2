// Errors raised while simulating or scoring a rollout
// A failing rollout is contained by the search loop and never aborts a decision

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RolloutError {
    #[error("rollout policy '{policy}' failed: {reason}")]
    Policy { policy: &'static str, reason: String },

    #[error("evaluator '{evaluator}' failed: {reason}")]
    Evaluation {
        evaluator: &'static str,
        reason: String,
    },

    #[error("evaluation produced a non-finite score ({0})")]
    NonFiniteScore(f32),

    #[error("rollout panicked: {0}")]
    Panicked(String),
}
