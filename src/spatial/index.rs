use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Side length of a chunk bucket, in cells.
pub const CHUNK_SIZE: i32 = 32;

/// Integer grid coordinate. Used both for map cells and for tile
/// coordinates inside an atlas image. `y` grows downwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridCoord {
    /// The origin, `(0, 0)`.
    pub const ZERO: GridCoord = GridCoord { x: 0, y: 0 };

    /// Build a coordinate.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for GridCoord {
    type Output = GridCoord;

    #[inline]
    fn add(self, rhs: GridCoord) -> GridCoord {
        GridCoord::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for GridCoord {
    type Output = GridCoord;

    #[inline]
    fn sub(self, rhs: GridCoord) -> GridCoord {
        GridCoord::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from((x, y): (i32, i32)) -> Self {
        GridCoord::new(x, y)
    }
}

/// Formats as `x,y`, the key format of bitmask tables.
impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Error returned when a string is not of the form `x,y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCoordError(pub String);

impl fmt::Display for ParseCoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a coordinate of the form \"x,y\", got {:?}", self.0)
    }
}

impl std::error::Error for ParseCoordError {}

impl FromStr for GridCoord {
    type Err = ParseCoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCoordError(s.to_owned());
        let (x, y) = s.split_once(',').ok_or_else(err)?;
        let x = x.trim().parse::<i32>().map_err(|_| err())?;
        let y = y.trim().parse::<i32>().map_err(|_| err())?;
        Ok(GridCoord::new(x, y))
    }
}

/// Numeric handle of a logical tile (one entry of the tile definitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub u32);

impl TileId {
    /// The numeric id.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a render layer.
pub type LayerIdx = usize;

/// A `CHUNK_SIZE` square of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkCoord {
    /// Chunk column.
    pub x: i32,
    /// Chunk row.
    pub y: i32,
}

/// Chunk containing cell `p`.
#[inline]
pub fn cell_to_chunk(p: GridCoord) -> ChunkCoord {
    ChunkCoord {
        x: p.x.div_euclid(CHUNK_SIZE),
        y: p.y.div_euclid(CHUNK_SIZE),
    }
}

/// Sparse cell storage bucketed by chunk, so rectangular queries only visit
/// the chunks that overlap the rectangle.
#[derive(Debug, Clone)]
pub struct CellIndex<T> {
    buckets: HashMap<ChunkCoord, HashMap<GridCoord, T>>,
    len: usize,
}

impl<T> Default for CellIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CellIndex<T> {
    /// Empty index.
    pub fn new() -> Self {
        CellIndex {
            buckets: HashMap::new(),
            len: 0,
        }
    }

    /// Store `value` at `pos`, returning the previous value if any.
    pub fn insert(&mut self, pos: GridCoord, value: T) -> Option<T> {
        let bucket = self
            .buckets
            .entry(cell_to_chunk(pos))
            .or_insert_with(HashMap::new);
        let prev = bucket.insert(pos, value);
        if prev.is_none() {
            self.len += 1;
        }
        prev
    }

    /// Remove the cell, dropping its chunk once empty.
    pub fn remove(&mut self, pos: GridCoord) -> Option<T> {
        let cc = cell_to_chunk(pos);
        let bucket = self.buckets.get_mut(&cc)?;
        let prev = bucket.remove(&pos);
        if prev.is_some() {
            self.len -= 1;
            if bucket.is_empty() {
                self.buckets.remove(&cc);
            }
        }
        prev
    }

    /// Value stored at `pos`.
    pub fn get(&self, pos: GridCoord) -> Option<&T> {
        self.buckets.get(&cell_to_chunk(pos))?.get(&pos)
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no cell is occupied.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every cell.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    /// All cells, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &T)> {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.iter().map(|(p, v)| (*p, v)))
    }

    /// Chunks overlapping the inclusive cell rectangle `[min, max]`, padded
    /// by `margin` chunks and sorted row-major so drawing order is stable.
    pub fn chunks_in_rect(
        &self,
        min: GridCoord,
        max: GridCoord,
        margin: i32,
    ) -> Vec<(ChunkCoord, &HashMap<GridCoord, T>)> {
        let mut lo = cell_to_chunk(min);
        let mut hi = cell_to_chunk(max);
        if lo.x > hi.x {
            std::mem::swap(&mut lo.x, &mut hi.x);
        }
        if lo.y > hi.y {
            std::mem::swap(&mut lo.y, &mut hi.y);
        }

        let mut chunks: Vec<_> = self
            .buckets
            .iter()
            .filter(|(cc, _)| {
                cc.x >= lo.x - margin
                    && cc.x <= hi.x + margin
                    && cc.y >= lo.y - margin
                    && cc.y <= hi.y + margin
            })
            .map(|(cc, bucket)| (*cc, bucket))
            .collect();
        chunks.sort_by_key(|(cc, _)| (cc.y, cc.x));
        chunks
    }
}
