// State evaluation functions used to score rollouts

use crate::error::RolloutError;
use crate::model::Evaluator;
use crate::types::{Side, UnitKind};
use crate::world::{Unit, World};

/// Relative material score in [-1, 1]: each side's currency, carried
/// resources and health-weighted unit value, compared as a ratio
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleSqrtEvaluation;

impl SimpleSqrtEvaluation {
    pub const RESOURCE: f32 = 20.0;
    pub const RESOURCE_IN_WORKER: f32 = 10.0;
    pub const UNIT_BONUS_MULTIPLIER: f32 = 40.0;

    pub fn base_score(side: Side, world: &World) -> f32 {
        let mut score = world.currency(side) as f32 * Self::RESOURCE;
        for unit in world.units_of(side) {
            let stats = unit.kind.stats();
            score += unit.resources as f32 * Self::RESOURCE_IN_WORKER;
            score += Self::UNIT_BONUS_MULTIPLIER * stats.cost as f32 * (unit.hp as f32 / stats.hp as f32).sqrt();
        }
        score
    }
}

impl Evaluator<World> for SimpleSqrtEvaluation {
    fn evaluate(&self, side: Side, other: Side, world: &World) -> Result<f32, RolloutError> {
        let s1 = Self::base_score(side, world);
        let s2 = Self::base_score(other, world);
        if s1 + s2 == 0.0 {
            return Ok(0.5);
        }
        Ok((2.0 * s1 / (s1 + s2)) - 1.0)
    }

    fn name(&self) -> &'static str {
        "simple_sqrt"
    }
}

/// Absolute economy and positioning score for one side: banked and carried
/// resources, unit value, workers near resource fields, fighters near enemies,
/// and a penalty for duplicate buildings
#[derive(Debug, Clone, Copy, Default)]
pub struct EconomyEvaluation;

impl EconomyEvaluation {
    pub const RESOURCE: f32 = 10.0;
    pub const RESOURCE_IN_WORKER: f32 = 5.0;
    pub const UNIT_BONUS_MULTIPLIER: f32 = 20.0;
    pub const DISTANCE_TO_RESOURCE: f32 = -2.0;
    pub const DISTANCE_TO_BASE: f32 = 1.0;
    pub const DISTANCE_TO_ENEMY: f32 = -5.0;
    pub const EXTRA_BUILDING: f32 = -50.0;

    fn nearest_distance<'a, I>(unit: &Unit, candidates: I) -> Option<i32>
    where
        I: Iterator<Item = &'a Unit>,
    {
        candidates.map(|other| unit.pos.distance(&other.pos)).min()
    }
}

impl Evaluator<World> for EconomyEvaluation {
    fn evaluate(&self, side: Side, _other: Side, world: &World) -> Result<f32, RolloutError> {
        let mut score = world.currency(side) as f32 * Self::RESOURCE;
        let mut bases = 0;
        let mut barracks = 0;

        for unit in world.units_of(side) {
            let stats = unit.kind.stats();
            score += unit.resources as f32 * Self::RESOURCE_IN_WORKER;
            score += Self::UNIT_BONUS_MULTIPLIER * (stats.cost * unit.hp) as f32 / stats.hp as f32;

            if unit.kind.can_harvest() {
                let fields = world.units().iter().filter(|u| u.kind == UnitKind::Resource);
                if let Some(d) = Self::nearest_distance(unit, fields) {
                    score += d as f32 * Self::DISTANCE_TO_RESOURCE;
                }
            } else if unit.kind.can_attack() {
                let stockpiles = world.units().iter().filter(|u| u.kind.is_stockpile());
                if let Some(d) = Self::nearest_distance(unit, stockpiles) {
                    score += d as f32 * Self::DISTANCE_TO_BASE;
                }
                let enemies = world.units().iter().filter(|u| u.is_enemy_of(side));
                if let Some(d) = Self::nearest_distance(unit, enemies) {
                    score += d as f32 * Self::DISTANCE_TO_ENEMY;
                }
            }

            match unit.kind {
                UnitKind::Base => {
                    bases += 1;
                    if bases > 1 {
                        score += Self::EXTRA_BUILDING;
                    }
                }
                UnitKind::Barracks => {
                    barracks += 1;
                    if barracks > 1 {
                        score += Self::EXTRA_BUILDING;
                    }
                }
                _ => {}
            }
        }
        Ok(score)
    }

    fn name(&self) -> &'static str {
        "economy"
    }
}
