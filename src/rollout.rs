// Rollout simulation: play a cloned world forward with stand-in policies
// and score the resulting state

use crate::error::RolloutError;
use crate::model::{Evaluator, ForwardModel, RolloutPolicy};
use crate::profiler::{Profiler, Section};
use crate::types::Side;
use rand::rngs::StdRng;

/// Lookahead and discounting parameters of one rollout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutParams {
    pub horizon: u32,
    pub discount: f64,
    pub discount_period: f64,
}

impl Default for RolloutParams {
    fn default() -> Self {
        RolloutParams {
            horizon: 100,
            discount: 0.99,
            discount_period: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutResult {
    /// Discounted score
    pub value: f64,
    /// Evaluator output before discounting
    pub raw: f32,
    pub elapsed: u32,
}

/// Advances `world` until the game ends or `horizon` ticks have elapsed.
/// Each tick every side that can act receives its policy's joint action
/// before the clock moves. Returns the number of ticks simulated.
pub fn simulate<M: ForwardModel>(
    world: &mut M,
    side: Side,
    horizon: u32,
    own: &dyn RolloutPolicy<M>,
    other: &dyn RolloutPolicy<M>,
    rng: &mut StdRng,
) -> Result<u32, RolloutError> {
    let start = world.current_tick();
    let opponent = side.opponent();

    while !world.is_over() && world.current_tick() - start < horizon {
        if world.can_act(side) {
            let joint = own.decide(side, world, rng)?;
            world.apply(&joint);
        }
        if world.can_act(opponent) {
            let joint = other.decide(opponent, world, rng)?;
            world.apply(&joint);
        }
        if world.advance_one_tick().ended {
            break;
        }
    }
    Ok(world.current_tick() - start)
}

/// Scores decay geometrically with the simulated time: raw * discount^(elapsed / period)
pub fn score(raw: f32, elapsed: u32, discount: f64, period: f64) -> f64 {
    let period = if period > 0.0 { period } else { 1.0 };
    raw as f64 * discount.powf(elapsed as f64 / period)
}

/// Clones `start`, issues `joint`, simulates and scores. The caller's world is never touched.
#[allow(clippy::too_many_arguments)]
pub fn run_rollout<M: ForwardModel>(
    start: &M,
    joint: &M::Joint,
    side: Side,
    params: &RolloutParams,
    own: &dyn RolloutPolicy<M>,
    other: &dyn RolloutPolicy<M>,
    evaluator: &dyn Evaluator<M>,
    rng: &mut StdRng,
    profiler: &Profiler,
) -> Result<RolloutResult, RolloutError> {
    let (world, elapsed) = profiler.track(Section::Rollout, || {
        let mut world = start.clone();
        world.apply(joint);
        simulate(&mut world, side, params.horizon, own, other, rng).map(|elapsed| (world, elapsed))
    })?;

    let raw = profiler.track(Section::Evaluation, || evaluator.evaluate(side, side.opponent(), &world))?;
    if !raw.is_finite() {
        return Err(RolloutError::NonFiniteScore(raw));
    }
    Ok(RolloutResult {
        value: score(raw, elapsed, params.discount, params.discount_period),
        raw,
        elapsed,
    })
}
