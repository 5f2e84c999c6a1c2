// Seams between the search and the simulated world
//
// The search only needs a cloneable world that accepts joint actions and
// advances in ticks, a scoring function, and a policy that plays out the
// remainder of a rollout. World implements ForwardModel; evaluators and
// policies are plugged in by the engine.

use crate::error::RolloutError;
use crate::types::Side;
use rand::rngs::StdRng;

/// Result of advancing the world by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// The game reached a terminal state during this tick
    pub ended: bool,
    /// Winner when the game ended by elimination
    pub winner: Option<Side>,
}

pub trait ForwardModel: Clone + Send + Sync {
    type Joint: Send + Sync;

    /// Issues a joint action. Illegal or conflicting parts are ignored.
    fn apply(&mut self, joint: &Self::Joint);

    fn advance_one_tick(&mut self) -> TickOutcome;

    fn current_tick(&self) -> u32;

    /// True when the side has at least one unit without an assignment
    fn can_act(&self, side: Side) -> bool;

    fn is_over(&self) -> bool;

    /// Joint action that issues nothing
    fn idle_joint(&self) -> Self::Joint;
}

/// Scores a world from the perspective of `side` against `other`.
/// Failures go through `Err`; a panic is caught and fails only the current rollout.
pub trait Evaluator<M: ForwardModel>: Send + Sync {
    fn evaluate(&self, side: Side, other: Side, world: &M) -> Result<f32, RolloutError>;

    fn name(&self) -> &'static str;
}

/// Chooses the joint action for a side during rollout playout.
/// Same failure contract as `Evaluator`.
pub trait RolloutPolicy<M: ForwardModel>: Send + Sync {
    fn decide(&self, side: Side, world: &M, rng: &mut StdRng) -> Result<M::Joint, RolloutError>;

    fn name(&self) -> &'static str;
}
