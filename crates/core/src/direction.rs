use serde::{Deserialize, Serialize};

/// One of the six axis-aligned neighbor directions.
///
/// North is -Z, south is +Z, east is +X, west is -X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Negative Y.
    Down,
    /// Positive Y.
    Up,
    /// Negative Z.
    North,
    /// Positive Z.
    South,
    /// Negative X.
    West,
    /// Positive X.
    East,
}

impl Direction {
    /// All directions in a fixed order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Integer step toward the neighbor in this direction.
    pub const fn offset(self) -> [i32; 3] {
        match self {
            Direction::Down => [0, -1, 0],
            Direction::Up => [0, 1, 0],
            Direction::North => [0, 0, -1],
            Direction::South => [0, 0, 1],
            Direction::West => [-1, 0, 0],
            Direction::East => [1, 0, 0],
        }
    }

    /// Unit normal of a face pointing this way.
    pub fn normal(self) -> [f32; 3] {
        let [x, y, z] = self.offset();
        [x as f32, y as f32, z as f32]
    }

    /// The direction pointing the other way.
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Matching single-bit cull flag.
    pub const fn flag(self) -> CullFlags {
        match self {
            Direction::Down => CullFlags::DOWN,
            Direction::Up => CullFlags::UP,
            Direction::North => CullFlags::NORTH,
            Direction::South => CullFlags::SOUTH,
            Direction::West => CullFlags::WEST,
            Direction::East => CullFlags::EAST,
        }
    }

    /// Map a unit normal back to its direction, if it is axis-aligned.
    pub fn from_normal(normal: [f32; 3]) -> Option<Direction> {
        const EPS: f32 = 1e-4;
        Direction::ALL.into_iter().find(|dir| {
            let n = dir.normal();
            (n[0] - normal[0]).abs() < EPS
                && (n[1] - normal[1]).abs() < EPS
                && (n[2] - normal[2]).abs() < EPS
        })
    }
}

bitflags::bitflags! {
    /// Faces a mesh generator must omit. A set bit means "cull this face".
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CullFlags: u8 {
        const DOWN = 0b00_0001;
        const UP = 0b00_0010;
        const NORTH = 0b00_0100;
        const SOUTH = 0b00_1000;
        const WEST = 0b01_0000;
        const EAST = 0b10_0000;
    }
}

impl CullFlags {
    /// Whether the face toward `dir` is culled.
    pub fn culls(self, dir: Direction) -> bool {
        self.contains(dir.flag())
    }

    /// Number of faces that will still be emitted.
    pub fn visible_faces(self) -> u32 {
        6 - self.bits().count_ones()
    }
}

impl From<Direction> for CullFlags {
    fn from(dir: Direction) -> Self {
        dir.flag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_offsets_cancel() {
        for dir in Direction::ALL {
            let a = dir.offset();
            let b = dir.opposite().offset();
            assert_eq!([a[0] + b[0], a[1] + b[1], a[2] + b[2]], [0, 0, 0]);
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn flags_are_distinct() {
        let all = Direction::ALL
            .into_iter()
            .fold(CullFlags::empty(), |acc, dir| acc | dir.flag());
        assert_eq!(all, CullFlags::all());
        assert_eq!(all.visible_faces(), 0);
        assert_eq!(CullFlags::empty().visible_faces(), 6);
    }

    #[test]
    fn normal_round_trips_to_direction() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_normal(dir.normal()), Some(dir));
        }
        assert_eq!(Direction::from_normal([0.5, 0.5, 0.0]), None);
    }
}
