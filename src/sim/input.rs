//! Directional Input
//!
//! A polled snapshot of four held directional signals, sampled once per tick.
//! Opposite signals cancel additively.

use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;

/// One of the four directional signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward smaller y
    Up,
    /// Toward larger y
    Down,
    /// Toward smaller x
    Left,
    /// Toward larger x
    Right,
}

impl Direction {
    /// Unit step on the world grid for this direction.
    #[inline]
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::DOWN,
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::RIGHT,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "w" => Ok(Direction::Up),
            "down" | "s" => Ok(Direction::Down),
            "left" | "a" => Ok(Direction::Left),
            "right" | "d" => Ok(Direction::Right),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// Held state of the four directional signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionalInput {
    /// Up held
    pub up: bool,
    /// Down held
    pub down: bool,
    /// Left held
    pub left: bool,
    /// Right held
    pub right: bool,
}

impl DirectionalInput {
    /// Nothing held.
    pub const IDLE: Self = Self {
        up: false,
        down: false,
        left: false,
        right: false,
    };

    /// Input with exactly one direction held.
    pub fn held(direction: Direction) -> Self {
        let mut input = Self::IDLE;
        input.set(direction, true);
        input
    }

    /// Set one direction.
    pub fn set(&mut self, direction: Direction, held: bool) {
        match direction {
            Direction::Up => self.up = held,
            Direction::Down => self.down = held,
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
        }
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, direction: Direction) -> Self {
        self.set(direction, true);
        self
    }

    /// Flip one direction.
    pub fn toggle(&mut self, direction: Direction) {
        let held = self.is_held(direction);
        self.set(direction, !held);
    }

    /// Check one direction.
    pub fn is_held(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    /// Check if nothing is held.
    #[inline]
    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }

    /// Velocity change for this tick: `magnitude` per held direction, summed.
    pub fn impulse(&self, magnitude: f64) -> Vec2 {
        let mut dv = Vec2::ZERO;
        for direction in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            if self.is_held(direction) {
                dv += direction.unit().scale(magnitude);
            }
        }
        dv
    }
}
