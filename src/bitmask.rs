//! 8-neighbor occupancy masks.
//!
//! Bit layout, clockwise from the top-left corner:
//!
//! ```text
//!   1   2   4
//! 128   .   8
//!  64  32  16
//! ```

use crate::spatial::GridCoord;
use std::fmt;

/// One of the eight cells around a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Up and to the left.
    TopLeft,
    /// Up, `y - 1`.
    Top,
    /// Up and to the right.
    TopRight,
    /// `x + 1`.
    Right,
    /// Down and to the right.
    BottomRight,
    /// Down, `y + 1`.
    Bottom,
    /// Down and to the left.
    BottomLeft,
    /// `x - 1`.
    Left,
}

impl Direction {
    /// All directions, in bit order.
    pub const ALL: [Direction; 8] = [
        Direction::TopLeft,
        Direction::Top,
        Direction::TopRight,
        Direction::Right,
        Direction::BottomRight,
        Direction::Bottom,
        Direction::BottomLeft,
        Direction::Left,
    ];

    /// The single bit this direction owns.
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            Direction::TopLeft => 1 << 0,
            Direction::Top => 1 << 1,
            Direction::TopRight => 1 << 2,
            Direction::Right => 1 << 3,
            Direction::BottomRight => 1 << 4,
            Direction::Bottom => 1 << 5,
            Direction::BottomLeft => 1 << 6,
            Direction::Left => 1 << 7,
        }
    }

    /// Offset from a cell to its neighbor in this direction.
    #[inline]
    pub const fn offset(self) -> GridCoord {
        match self {
            Direction::TopLeft => GridCoord::new(-1, -1),
            Direction::Top => GridCoord::new(0, -1),
            Direction::TopRight => GridCoord::new(1, -1),
            Direction::Right => GridCoord::new(1, 0),
            Direction::BottomRight => GridCoord::new(1, 1),
            Direction::Bottom => GridCoord::new(0, 1),
            Direction::BottomLeft => GridCoord::new(-1, 1),
            Direction::Left => GridCoord::new(-1, 0),
        }
    }
}

/// Which of the eight neighbors of a cell are occupied by same-group tiles.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bitmask(pub u8);

impl Bitmask {
    /// No neighbors.
    pub const DEFAULT: Bitmask = Bitmask(0);
    /// All eight neighbors.
    pub const FULL: Bitmask = Bitmask(u8::MAX);

    /// Copy of `self` with the bit of `direction` set to `present`.
    #[inline]
    #[must_use]
    pub const fn update(self, direction: Direction, present: bool) -> Bitmask {
        if present {
            Bitmask(self.0 | direction.bit())
        } else {
            Bitmask(self.0 & !direction.bit())
        }
    }

    /// Whether the bit of `direction` is set.
    #[inline]
    pub const fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    /// Raw byte.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build a mask from the directions reported present by `present`.
    pub fn from_fn(mut present: impl FnMut(Direction) -> bool) -> Bitmask {
        Direction::ALL
            .iter()
            .fold(Bitmask::DEFAULT, |mask, &d| mask.update(d, present(d)))
    }
}

impl From<u8> for Bitmask {
    fn from(bits: u8) -> Self {
        Bitmask(bits)
    }
}

impl fmt::Debug for Bitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmask({:#010b})", self.0)
    }
}

impl fmt::Display for Bitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#010b})", self.0, self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_clear_is_identity_for_every_mask() {
        for bits in 0..=u8::MAX {
            let m = Bitmask(bits);
            for d in Direction::ALL {
                let cleared = m.update(d, false);
                assert_eq!(cleared.update(d, true).update(d, false), cleared);
                // Other bits untouched.
                assert_eq!(m.update(d, true).0 & !d.bit(), m.0 & !d.bit());
            }
        }
    }

    #[test]
    fn each_direction_owns_exactly_one_bit() {
        let mut seen = 0u8;
        for d in Direction::ALL {
            let m = Bitmask::DEFAULT.update(d, true);
            assert_eq!(m.0.count_ones(), 1);
            assert_eq!(m, Bitmask::DEFAULT.update(d, true));
            assert_eq!(seen & m.0, 0);
            seen |= m.0;
        }
        assert_eq!(Bitmask(seen), Bitmask::FULL);
    }

    #[test]
    fn update_order_does_not_matter() {
        let inputs = [
            (Direction::Top, true),
            (Direction::Left, true),
            (Direction::BottomRight, true),
            (Direction::Right, false),
        ];
        let forward = inputs
            .iter()
            .fold(Bitmask::DEFAULT, |m, &(d, p)| m.update(d, p));
        let backward = inputs
            .iter()
            .rev()
            .fold(Bitmask::DEFAULT, |m, &(d, p)| m.update(d, p));
        assert_eq!(forward, backward);
        assert_eq!(forward.0, 2 | 128 | 16);
    }

    #[test]
    fn offsets_are_distinct_unit_steps() {
        let offsets: std::collections::HashSet<_> =
            Direction::ALL.iter().map(|d| d.offset()).collect();
        assert_eq!(offsets.len(), 8);
        assert!(offsets
            .iter()
            .all(|o| o.x.abs() <= 1 && o.y.abs() <= 1 && *o != GridCoord::ZERO));
        assert_eq!(Direction::Top.offset(), GridCoord::new(0, -1));
    }
}
