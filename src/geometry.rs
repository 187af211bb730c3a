//! Discrete rotations of directions and cell offsets.
//!
//! A block is rotated by a triple of quarter-turn angles, one per axis,
//! applied in the fixed order x, then y, then z. Sequential composition
//! does not enumerate the 24-element cube rotation group evenly; some
//! orientations are reached by several triples.

use std::fmt;

use rand::Rng;

use crate::grid::{Coord, Direction};

/// A rotation axis, named by the directions it leaves fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// East-west axis.
    X,
    /// Above-below axis.
    Y,
    /// North-south axis.
    Z,
}

impl Axis {
    /// Application order for a rotation triple.
    pub const ORDER: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// Right-handed quarter turns about each axis, indexed like [`Axis::ORDER`].
///
/// Ordering note: the index mapping must stay in sync with [`INVERSE_QUARTER_TURNS`].
const QUARTER_TURNS: [fn(Coord) -> Coord; 3] = [
    |(x, y, z)| (x, -z, y), // about x
    |(x, y, z)| (z, y, -x), // about y
    |(x, y, z)| (-y, x, z), // about z
];

/// Inverse quarter turns (the 270 degree case).
const INVERSE_QUARTER_TURNS: [fn(Coord) -> Coord; 3] = [
    |(x, y, z)| (x, z, -y),
    |(x, y, z)| (-z, y, x),
    |(x, y, z)| (y, -x, z),
];

/// A rotation angle about one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Angle {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Angle {
    pub const ALL: [Angle; 4] = [Angle::Deg0, Angle::Deg90, Angle::Deg180, Angle::Deg270];

    pub const fn degrees(self) -> u32 {
        match self {
            Angle::Deg0 => 0,
            Angle::Deg90 => 90,
            Angle::Deg180 => 180,
            Angle::Deg270 => 270,
        }
    }

    pub fn from_degrees(degrees: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|angle| angle.degrees() == degrees)
    }

    /// The angle that undoes this one about the same axis.
    pub const fn inverse(self) -> Self {
        match self {
            Angle::Deg0 => Angle::Deg0,
            Angle::Deg90 => Angle::Deg270,
            Angle::Deg180 => Angle::Deg180,
            Angle::Deg270 => Angle::Deg90,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Rotates an offset about `axis` by `angle`.
///
/// 180 degrees is the quarter turn applied twice; 270 is the inverse quarter turn.
pub fn rotate_offset_about(offset: Coord, axis: Axis, angle: Angle) -> Coord {
    let index = axis as usize;
    let quarter = QUARTER_TURNS[index];
    match angle {
        Angle::Deg0 => offset,
        Angle::Deg90 => quarter(offset),
        Angle::Deg180 => quarter(quarter(offset)),
        Angle::Deg270 => INVERSE_QUARTER_TURNS[index](offset),
    }
}

/// Rotates a direction about `axis` by `angle`.
///
/// Directions along the axis are fixed; the other four cycle.
pub fn rotate_direction_about(direction: Direction, axis: Axis, angle: Angle) -> Direction {
    let rotated = rotate_offset_about(direction.offset(), axis, angle);
    // quarter turns map unit axis steps onto unit axis steps
    Direction::from_offset(rotated).unwrap_or(direction)
}

/// A block's rotation triple, one angle per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rotation {
    pub x: Angle,
    pub y: Angle,
    pub z: Angle,
}

impl Rotation {
    pub const IDENTITY: Self = Self {
        x: Angle::Deg0,
        y: Angle::Deg0,
        z: Angle::Deg0,
    };

    pub const fn new(x: Angle, y: Angle, z: Angle) -> Self {
        Self { x, y, z }
    }

    /// Draws one angle per axis, in axis order.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let x = Angle::random(rng);
        let y = Angle::random(rng);
        let z = Angle::random(rng);
        Self { x, y, z }
    }

    pub const fn angle(&self, axis: Axis) -> Angle {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Applies the triple to an offset: about x, then y, then z.
    pub fn apply_offset(&self, offset: Coord) -> Coord {
        Axis::ORDER
            .iter()
            .fold(offset, |acc, &axis| rotate_offset_about(acc, axis, self.angle(axis)))
    }

    /// Undoes [`Rotation::apply_offset`]: inverse angles in reverse axis order.
    pub fn invert_offset(&self, offset: Coord) -> Coord {
        Axis::ORDER.iter().rev().fold(offset, |acc, &axis| {
            rotate_offset_about(acc, axis, self.angle(axis).inverse())
        })
    }

    pub fn apply(&self, direction: Direction) -> Direction {
        Axis::ORDER.iter().fold(direction, |acc, &axis| {
            rotate_direction_about(acc, axis, self.angle(axis))
        })
    }

    pub fn invert(&self, direction: Direction) -> Direction {
        Axis::ORDER.iter().rev().fold(direction, |acc, &axis| {
            rotate_direction_about(acc, axis, self.angle(axis).inverse())
        })
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})",
            self.x.degrees(),
            self.y.degrees(),
            self.z.degrees()
        )
    }
}
