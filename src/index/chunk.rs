//! Chunk-level index: matching blocks for one column and their visible subset

use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::index::block::{BlockKey, BlockRecord};

/// Horizontal footprint of a chunk column in blocks
pub const CHUNK_SIZE: i32 = 16;

/// Integer coordinate identifying a chunk column in the world grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Convert a world position to the containing chunk column
    pub fn from_world_pos(pos: Vec3) -> Self {
        Self {
            x: (pos.x / CHUNK_SIZE as f32).floor() as i32,
            z: (pos.z / CHUNK_SIZE as f32).floor() as i32,
        }
    }

    /// Block-space x/z of the minimum corner of this column
    pub fn origin(&self) -> (i32, i32) {
        (self.x * CHUNK_SIZE, self.z * CHUNK_SIZE)
    }

    /// Euclidean horizontal distance to another chunk, in chunk units
    pub fn distance_to(&self, other: ChunkCoord) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dz = (self.z - other.z) as f32;
        (dx * dx + dz * dz).sqrt()
    }

    /// Whether this chunk is within `limit` chunks of `observer`
    pub fn in_render_distance(&self, observer: ChunkCoord, limit: f32) -> bool {
        self.distance_to(observer) <= limit
    }
}

/// All matching blocks for one chunk column, plus the visible subset.
///
/// Plain data structure: callers synchronize access (WorldIndex wraps each
/// instance in a mutex). Invariant: `visible` holds exactly the keys whose
/// record has `visible == true`.
pub struct ChunkIndex {
    /// Coordinate of this column in the chunk grid
    pub coord: ChunkCoord,
    /// Every matching block in this column
    blocks: HashMap<BlockKey, BlockRecord>,
    /// Keys of the records currently on the exposed shell
    visible: HashSet<BlockKey>,
}

impl ChunkIndex {
    /// Create an empty index for a column
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: HashMap::new(),
            visible: HashSet::new(),
        }
    }

    /// Build an index from a scan's matching positions
    ///
    /// All records start visible; the caller runs a visibility pass next.
    pub fn from_keys(coord: ChunkCoord, keys: impl IntoIterator<Item = BlockKey>) -> Self {
        let mut index = Self::new(coord);
        for key in keys {
            index.insert(key);
        }
        index
    }

    /// Insert a record for a matching position
    ///
    /// Returns `false` if the position was already tracked.
    pub fn insert(&mut self, key: BlockKey) -> bool {
        if self.blocks.contains_key(&key) {
            return false;
        }
        self.blocks.insert(key, BlockRecord::new(key));
        self.visible.insert(key);
        true
    }

    /// Remove a record, dropping it from the visible set as well
    ///
    /// Returns `true` if a record was present.
    pub fn remove(&mut self, key: BlockKey) -> bool {
        self.visible.remove(&key);
        self.blocks.remove(&key).is_some()
    }

    /// Whether a position is tracked as matching
    pub fn contains(&self, key: BlockKey) -> bool {
        self.blocks.contains_key(&key)
    }

    /// Set the cached visibility of a tracked position
    ///
    /// No-op for untracked keys.
    pub fn set_visible(&mut self, key: BlockKey, visible: bool) {
        if let Some(record) = self.blocks.get_mut(&key) {
            record.visible = visible;
            if visible {
                self.visible.insert(key);
            } else {
                self.visible.remove(&key);
            }
        }
    }

    /// Whether a tracked position is currently visible
    pub fn is_visible(&self, key: BlockKey) -> bool {
        self.visible.contains(&key)
    }

    /// Number of matching blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the column tracks no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of visible blocks
    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// Iterate over all tracked keys
    pub fn keys(&self) -> impl Iterator<Item = &BlockKey> {
        self.blocks.keys()
    }

    /// Iterate over all records
    pub fn records(&self) -> impl Iterator<Item = &BlockRecord> {
        self.blocks.values()
    }

    /// Copy out the currently visible records
    pub fn visible_records(&self) -> Vec<BlockRecord> {
        self.visible
            .iter()
            .filter_map(|key| self.blocks.get(key).copied())
            .collect()
    }
}
