//! Block identity: states, packed position keys, and per-block records

use serde::{Deserialize, Serialize};

use crate::index::chunk::{ChunkCoord, CHUNK_SIZE};

/// Identity of a block type/state as reported by the host engine.
///
/// The index never interprets the value; it only feeds it to the active
/// predicate. `0` is reserved for air/empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockState(pub u16);

impl BlockState {
    /// The empty state
    pub const AIR: BlockState = BlockState(0);
}

/// Integer block position, packable into 64 bits for hashing
///
/// x and z get 26 signed bits each, y gets 12, which covers any world a
/// 16x16-column chunk grid can realistically address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockKey {
    /// Create a new block key
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Pack into a single u64 (26/12/26 bit x/y/z split)
    pub fn packed(&self) -> u64 {
        ((self.x as u64 & 0x3FF_FFFF) << 38)
            | ((self.y as u64 & 0xFFF) << 26)
            | (self.z as u64 & 0x3FF_FFFF)
    }

    /// Unpack from the `packed` form, sign-extending each field
    pub fn from_packed(v: u64) -> Self {
        let x = ((((v >> 38) & 0x3FF_FFFF) as u32) << 6) as i32 >> 6;
        let y = ((((v >> 26) & 0xFFF) as u32) << 20) as i32 >> 20;
        let z = (((v & 0x3FF_FFFF) as u32) << 6) as i32 >> 6;
        Self { x, y, z }
    }

    /// The 6 face-adjacent neighbor positions
    pub fn neighbors(&self) -> [BlockKey; 6] {
        [
            Self::new(self.x + 1, self.y, self.z),
            Self::new(self.x - 1, self.y, self.z),
            Self::new(self.x, self.y + 1, self.z),
            Self::new(self.x, self.y - 1, self.z),
            Self::new(self.x, self.y, self.z + 1),
            Self::new(self.x, self.y, self.z - 1),
        ]
    }

    /// Coordinate of the chunk column owning this position
    pub fn chunk(&self) -> ChunkCoord {
        ChunkCoord::new(self.x.div_euclid(CHUNK_SIZE), self.z.div_euclid(CHUNK_SIZE))
    }
}

/// A matching block tracked by the index, with its cached visibility flag
///
/// A record exists only while its position satisfies the active predicate;
/// `visible` is derived from the 6-neighbor occlusion rule and cached here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRecord {
    /// Position of the block
    pub key: BlockKey,
    /// Whether the block is on the exposed shell of its cluster
    pub visible: bool,
}

impl BlockRecord {
    /// Create a record for a freshly matched position
    ///
    /// Starts visible (fail-open); callers recompute immediately after insert.
    pub fn new(key: BlockKey) -> Self {
        Self { key, visible: true }
    }
}
