//! Cube-style cell coordinates and edge directions.
//!
//! [`HexCoordinates`] is the stable identity of a cell: a cube coordinate
//! trio with `x + y + z = 0`, convertible to and from the 2-D offset
//! (column, row) view used for array indexing. [`HexDirection`] names the
//! six edges of a cell. Both are plain value types; the heavier geometry
//! (world positions, corner tables) delegates to `hexx` in
//! [`crate::metrics`].

use std::fmt;

use hexx::{EdgeDirection, Hex};

/// Immutable cube coordinate of a cell. Only `x` and `z` are stored;
/// `y` is derived so the `x + y + z = 0` invariant cannot be violated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HexCoordinates {
    x: i32,
    z: i32,
}

impl HexCoordinates {
    /// Creates coordinates from the two stored cube components.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Converts an offset (column, row) grid position to cube coordinates.
    ///
    /// Rows are shifted half a cell per row; the integer division undoes
    /// the shift so straight offset columns become diagonal cube columns.
    pub const fn from_offset(col: i32, row: i32) -> Self {
        Self {
            x: col - row / 2,
            z: row,
        }
    }

    /// The offset (column, row) view of these coordinates.
    pub const fn to_offset(self) -> (i32, i32) {
        (self.x + self.z / 2, self.z)
    }

    /// Cube x component.
    pub const fn x(self) -> i32 {
        self.x
    }

    /// Cube y component, derived from the zero-sum invariant.
    pub const fn y(self) -> i32 {
        -self.x - self.z
    }

    /// Cube z component.
    pub const fn z(self) -> i32 {
        self.z
    }

    /// The equivalent axial `hexx` coordinate (q = x, r = z).
    pub const fn to_hex(self) -> Hex {
        Hex::new(self.x, self.z)
    }

    /// Coordinates of the adjacent cell across the given edge.
    pub fn neighbor(self, direction: HexDirection) -> Self {
        let hex = self.to_hex().neighbor(direction.edge());
        Self::new(hex.x, hex.y)
    }
}

impl fmt::Display for HexCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x(), self.y(), self.z())
    }
}

/// One of the six edge directions of a cell, in rotational order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HexDirection {
    /// North-east edge.
    NE,
    /// East edge.
    E,
    /// South-east edge.
    SE,
    /// South-west edge.
    SW,
    /// West edge.
    W,
    /// North-west edge.
    NW,
}

impl HexDirection {
    /// All six directions in rotational order.
    pub const ALL: [Self; 6] = [Self::NE, Self::E, Self::SE, Self::SW, Self::W, Self::NW];

    /// Position of this direction in [`Self::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Direction from its index, `None` when out of range.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// The edge on the far side of the cell (`+3 mod 6`).
    pub fn opposite(self) -> Self {
        Self::ALL[(self.index() + 3) % 6]
    }

    /// The previous edge in rotational order (wrapping).
    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + 5) % 6]
    }

    /// The next edge in rotational order (wrapping).
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % 6]
    }

    /// The matching `hexx` edge direction.
    pub const fn edge(self) -> EdgeDirection {
        EdgeDirection::ALL_DIRECTIONS[self as usize]
    }
}
