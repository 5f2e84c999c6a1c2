// Breadth-first first-step search over free cells
// Cells claimed by the given usage are treated as blocked.

use crate::action::ResourceUsage;
use crate::types::{Coord, Direction};
use crate::world::World;
use std::collections::VecDeque;

/// First step of a shortest path from `from` to any free cell satisfying `is_goal`.
/// Returns None when `from` already satisfies the goal or no such cell is reachable.
pub fn first_step_towards<F>(world: &World, from: Coord, blocked: &ResourceUsage, is_goal: F) -> Option<Direction>
where
    F: Fn(&Coord) -> bool,
{
    if !world.in_bounds(&from) || is_goal(&from) {
        return None;
    }
    let cells = (world.width() * world.height()) as usize;
    // For every visited cell, the direction of the first step taken from `from`
    let mut first_step: Vec<Option<Direction>> = vec![None; cells];
    let mut visited = vec![false; cells];
    let mut queue = VecDeque::new();

    visited[world.index_of(&from)] = true;
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        for dir in Direction::all() {
            let next = dir.apply(&current);
            if !world.in_bounds(&next) {
                continue;
            }
            let idx = world.index_of(&next);
            if visited[idx] || !world.is_free(&next) || blocked.claims_cell(idx) {
                continue;
            }
            visited[idx] = true;
            let step = if current == from {
                Some(dir)
            } else {
                first_step[world.index_of(&current)]
            };
            if is_goal(&next) {
                return step;
            }
            first_step[idx] = step;
            queue.push_back(next);
        }
    }
    None
}

pub fn step_to(world: &World, from: Coord, target: Coord, blocked: &ResourceUsage) -> Option<Direction> {
    first_step_towards(world, from, blocked, |pos| *pos == target)
}

/// Step towards any cell orthogonally adjacent to `target`
pub fn step_next_to(world: &World, from: Coord, target: Coord, blocked: &ResourceUsage) -> Option<Direction> {
    first_step_towards(world, from, blocked, |pos| pos.distance(&target) == 1)
}

/// Step towards any cell within Manhattan `range` of `target`
pub fn step_within_range(
    world: &World,
    from: Coord,
    target: Coord,
    range: i32,
    blocked: &ResourceUsage,
) -> Option<Direction> {
    first_step_towards(world, from, blocked, |pos| pos.distance(&target) <= range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_around_wall() {
        let world = World::from_ascii(
            "\
            ...
            .#.
            ...",
            1,
        )
        .unwrap();
        let step = step_to(&world, Coord::new(1, 0), Coord::new(1, 2), &ResourceUsage::new());
        // Both detours are the same length; the scan order prefers going right
        assert_eq!(step, Some(Direction::Right));
    }

    #[test]
    fn test_blocked_cells_are_avoided() {
        let world = World::new(3, 1);
        let blocked = ResourceUsage::new().with_cell(1);
        assert_eq!(step_to(&world, Coord::new(0, 0), Coord::new(2, 0), &blocked), None);
        assert_eq!(
            step_to(&world, Coord::new(0, 0), Coord::new(2, 0), &ResourceUsage::new()),
            Some(Direction::Right)
        );
    }

    #[test]
    fn test_already_at_goal_returns_none() {
        let world = World::new(3, 3);
        assert_eq!(
            step_next_to(&world, Coord::new(1, 1), Coord::new(1, 2), &ResourceUsage::new()),
            None
        );
        assert_eq!(
            step_within_range(&world, Coord::new(0, 0), Coord::new(2, 2), 4, &ResourceUsage::new()),
            None
        );
    }

    #[test]
    fn test_occupied_target_reached_via_neighbour() {
        let world = World::from_ascii("W..R", 1).unwrap();
        assert_eq!(
            step_next_to(&world, Coord::new(0, 0), Coord::new(3, 0), &ResourceUsage::new()),
            Some(Direction::Right)
        );
    }
}
