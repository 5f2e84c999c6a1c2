// Grid and unit vocabulary shared by the world model and the search
// Coordinates are screen-style: x grows to the right, y grows downward

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a unit. Ids are never reused within a world.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the two players
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Side(pub u8);

impl Side {
    pub const COUNT: usize = 2;

    /// Returns both sides in index order
    pub fn both() -> [Side; 2] {
        [Side(0), Side(1)]
    }

    pub fn is_valid(self) -> bool {
        (self.0 as usize) < Side::COUNT
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The other player. Only meaningful for valid sides.
    pub fn opponent(self) -> Side {
        Side(1 - self.0.min(1))
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "side{}", self.0)
    }
}

/// 2D coordinate on the grid
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Coord { x, y }
    }

    /// Manhattan distance between two coordinates
    pub fn distance(&self, other: &Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The four grid directions
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Returns all directions in the fixed scan order used for placement and neighbours
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Right, Direction::Down, Direction::Left]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        }
    }

    /// Calculates the neighbouring coordinate in this direction
    pub fn apply(&self, coord: &Coord) -> Coord {
        match self {
            Direction::Up => Coord { x: coord.x, y: coord.y - 1 },
            Direction::Right => Coord { x: coord.x + 1, y: coord.y },
            Direction::Down => Coord { x: coord.x, y: coord.y + 1 },
            Direction::Left => Coord { x: coord.x - 1, y: coord.y },
        }
    }

    /// Direction leading from `from` to an orthogonally adjacent `to`
    pub fn between(from: &Coord, to: &Coord) -> Option<Direction> {
        Direction::all()
            .into_iter()
            .find(|dir| dir.apply(from) == *to)
    }
}

/// Static per-kind unit parameters. Durations are in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    pub cost: i32,
    pub hp: i32,
    pub damage: i32,
    pub range: i32,
    pub move_time: u32,
    pub attack_time: u32,
    pub produce_time: u32,
    pub harvest_time: u32,
    pub return_time: u32,
}

const fn stats(cost: i32, hp: i32, damage: i32, range: i32, move_time: u32, produce_time: u32) -> UnitStats {
    UnitStats {
        cost,
        hp,
        damage,
        range,
        move_time,
        attack_time: 5,
        produce_time,
        harvest_time: 20,
        return_time: 10,
    }
}

/// Role a unit plays for candidate generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Gathers resources and may place buildings
    Harvester,
    /// Stockpile building that trains harvesters
    Producer,
    /// Building that trains fighters
    Barracks,
    /// Mobile fighter
    Combat,
    /// Never acts (resource fields)
    Passive,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Resource,
    Base,
    Barracks,
    Worker,
    Light,
    Heavy,
    Ranged,
}

impl UnitKind {
    pub fn stats(self) -> UnitStats {
        match self {
            UnitKind::Resource => stats(1, 1, 0, 0, 0, 0),
            UnitKind::Base => stats(10, 10, 0, 0, 0, 250),
            UnitKind::Barracks => stats(5, 4, 0, 0, 0, 200),
            UnitKind::Worker => stats(1, 1, 1, 1, 10, 50),
            UnitKind::Light => stats(2, 4, 2, 1, 8, 80),
            UnitKind::Heavy => stats(2, 4, 4, 1, 12, 120),
            UnitKind::Ranged => stats(2, 1, 1, 3, 10, 100),
        }
    }

    pub fn role(self) -> Role {
        match self {
            UnitKind::Resource => Role::Passive,
            UnitKind::Base => Role::Producer,
            UnitKind::Barracks => Role::Barracks,
            UnitKind::Worker => Role::Harvester,
            UnitKind::Light | UnitKind::Heavy | UnitKind::Ranged => Role::Combat,
        }
    }

    /// Kinds this unit can produce, in candidate order
    pub fn produces(self) -> &'static [UnitKind] {
        match self {
            UnitKind::Base => &[UnitKind::Worker],
            UnitKind::Barracks => &[UnitKind::Light, UnitKind::Heavy, UnitKind::Ranged],
            UnitKind::Worker => &[UnitKind::Barracks],
            _ => &[],
        }
    }

    pub fn can_move(self) -> bool {
        self.stats().move_time > 0
    }

    pub fn can_attack(self) -> bool {
        self.stats().damage > 0
    }

    pub fn can_harvest(self) -> bool {
        self == UnitKind::Worker
    }

    /// Buildings that accept returned resources
    pub fn is_stockpile(self) -> bool {
        self == UnitKind::Base
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Resource => "resource",
            UnitKind::Base => "base",
            UnitKind::Barracks => "barracks",
            UnitKind::Worker => "worker",
            UnitKind::Light => "light",
            UnitKind::Heavy => "heavy",
            UnitKind::Ranged => "ranged",
        }
    }
}
