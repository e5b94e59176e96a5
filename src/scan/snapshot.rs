//! Chunk snapshots and the scan that filters them

use rayon::prelude::*;

use crate::index::block::{BlockKey, BlockState};
use crate::index::chunk::{ChunkCoord, CHUNK_SIZE};
use crate::predicate::BlockPredicate;

/// Pull-based access to world block data, implemented by the host.
///
/// Called from scan workers, so implementations must be thread-safe and must
/// hand back an owned snapshot rather than a live view into engine state.
pub trait ChunkSource: Send + Sync {
    /// Owned copy of the block states for one chunk column, or `None` if the
    /// host no longer has the chunk loaded.
    fn snapshot(&self, coord: ChunkCoord) -> Option<ChunkSnapshot>;
}

/// Owned block states for one 16x16 chunk column.
///
/// Columns run from `floor_y` up to the local terrain height, so heights may
/// vary per column and air above the surface costs nothing.
pub struct ChunkSnapshot {
    /// Coordinate of the captured column
    pub coord: ChunkCoord,
    /// Lowest y the world contains; column storage starts here
    pub floor_y: i32,
    /// Per-column states, x-major, bottom-up from `floor_y`
    columns: Vec<Vec<BlockState>>,
}

impl ChunkSnapshot {
    /// Create an empty snapshot (every column has zero height)
    pub fn new(coord: ChunkCoord, floor_y: i32) -> Self {
        Self {
            coord,
            floor_y,
            columns: vec![Vec::new(); (CHUNK_SIZE * CHUNK_SIZE) as usize],
        }
    }

    fn slot(local_x: i32, local_z: i32) -> usize {
        (local_x * CHUNK_SIZE + local_z) as usize
    }

    /// Set the state at a world position inside this chunk.
    ///
    /// Grows the column with air as needed. Positions below the floor or
    /// outside the column footprint are ignored.
    pub fn set_block(&mut self, key: BlockKey, state: BlockState) {
        if key.chunk() != self.coord || key.y < self.floor_y {
            return;
        }
        let local_x = key.x.rem_euclid(CHUNK_SIZE);
        let local_z = key.z.rem_euclid(CHUNK_SIZE);
        let column = &mut self.columns[Self::slot(local_x, local_z)];
        let height = (key.y - self.floor_y) as usize;
        if column.len() <= height {
            column.resize(height + 1, BlockState::AIR);
        }
        column[height] = state;
    }

    /// State at a world position; air above the column or outside the chunk
    pub fn block(&self, key: BlockKey) -> BlockState {
        if key.chunk() != self.coord || key.y < self.floor_y {
            return BlockState::AIR;
        }
        let local_x = key.x.rem_euclid(CHUNK_SIZE);
        let local_z = key.z.rem_euclid(CHUNK_SIZE);
        self.columns[Self::slot(local_x, local_z)]
            .get((key.y - self.floor_y) as usize)
            .copied()
            .unwrap_or(BlockState::AIR)
    }

    /// Terrain height of a column (exclusive top y), in world space
    pub fn height_at(&self, local_x: i32, local_z: i32) -> i32 {
        self.floor_y + self.columns[Self::slot(local_x, local_z)].len() as i32
    }

    /// Total stored states across all columns
    pub fn volume(&self) -> usize {
        self.columns.iter().map(|c| c.len()).sum()
    }
}

/// Filter every stored position of a snapshot through a predicate.
///
/// Cost is O(columns x height); columns are scanned in parallel. The result
/// order is unspecified.
pub fn scan_snapshot(snapshot: &ChunkSnapshot, predicate: &dyn BlockPredicate) -> Vec<BlockKey> {
    let (origin_x, origin_z) = snapshot.coord.origin();
    let floor_y = snapshot.floor_y;

    (0..CHUNK_SIZE * CHUNK_SIZE)
        .into_par_iter()
        .flat_map_iter(|slot| {
            let local_x = slot / CHUNK_SIZE;
            let local_z = slot % CHUNK_SIZE;
            snapshot.columns[slot as usize]
                .iter()
                .enumerate()
                .filter_map(move |(i, state)| {
                    if predicate.matches(*state) {
                        Some(BlockKey::new(origin_x + local_x, floor_y + i as i32, origin_z + local_z))
                    } else {
                        None
                    }
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORE: BlockState = BlockState(14);
    const STONE: BlockState = BlockState(1);

    fn ore_only(state: BlockState) -> bool {
        state == ORE
    }

    #[test]
    fn test_set_and_get_block() {
        let mut snapshot = ChunkSnapshot::new(ChunkCoord::new(0, 0), -64);
        let key = BlockKey::new(3, 10, 12);

        snapshot.set_block(key, ORE);

        assert_eq!(snapshot.block(key), ORE);
        assert_eq!(snapshot.block(BlockKey::new(3, 11, 12)), BlockState::AIR);
        assert_eq!(snapshot.height_at(3, 12), 11);
        // gap below the set block is air
        assert_eq!(snapshot.block(BlockKey::new(3, -64, 12)), BlockState::AIR);
    }

    #[test]
    fn test_out_of_chunk_positions_ignored() {
        let mut snapshot = ChunkSnapshot::new(ChunkCoord::new(0, 0), 0);

        snapshot.set_block(BlockKey::new(16, 5, 0), ORE); // chunk (1,0)
        snapshot.set_block(BlockKey::new(0, -1, 0), ORE); // below floor

        assert_eq!(snapshot.volume(), 0);
        assert_eq!(snapshot.block(BlockKey::new(16, 5, 0)), BlockState::AIR);
    }

    #[test]
    fn test_negative_chunk_coords() {
        let coord = ChunkCoord::new(-1, -1);
        let mut snapshot = ChunkSnapshot::new(coord, 0);
        let key = BlockKey::new(-1, 3, -16);

        snapshot.set_block(key, ORE);
        assert_eq!(snapshot.block(key), ORE);

        let matches = scan_snapshot(&snapshot, &ore_only);
        assert_eq!(matches, vec![key]);
    }

    #[test]
    fn test_scan_matches_brute_force() {
        let coord = ChunkCoord::new(2, -3);
        let (origin_x, origin_z) = coord.origin();
        let mut snapshot = ChunkSnapshot::new(coord, -64);

        // deterministic speckle of ore through a stone column
        let mut expected = Vec::new();
        for local_x in 0..CHUNK_SIZE {
            for local_z in 0..CHUNK_SIZE {
                let height = 40 + ((local_x * 7 + local_z * 3) % 20);
                for y in -64..(-64 + height) {
                    let key = BlockKey::new(origin_x + local_x, y, origin_z + local_z);
                    let state = if (key.x + key.y + key.z).rem_euclid(11) == 0 {
                        ORE
                    } else {
                        STONE
                    };
                    snapshot.set_block(key, state);
                    if ore_only(state) {
                        expected.push(key);
                    }
                }
            }
        }

        let mut matches = scan_snapshot(&snapshot, &ore_only);
        matches.sort_by_key(|k| k.packed());
        expected.sort_by_key(|k| k.packed());
        assert_eq!(matches, expected);
    }

    #[test]
    fn test_scan_empty_snapshot() {
        let snapshot = ChunkSnapshot::new(ChunkCoord::new(0, 0), 0);
        assert!(scan_snapshot(&snapshot, &ore_only).is_empty());
    }
}
