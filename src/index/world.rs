//! World-level index: chunk slots, generation stamps, and deferred deltas

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use glam::Vec3;

use crate::index::block::{BlockKey, BlockRecord, BlockState};
use crate::index::chunk::{ChunkCoord, ChunkIndex};
use crate::predicate::BlockPredicate;

/// A block-change notification routed to the index
#[derive(Clone, Copy, Debug)]
pub struct BlockDelta {
    /// Position that changed
    pub key: BlockKey,
    /// State before the change
    pub old: BlockState,
    /// State after the change
    pub new: BlockState,
}

/// Classification of a delta against the active predicate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeltaKind {
    /// Didn't match before, matches now
    Addition,
    /// Matched before, doesn't now
    Removal,
    /// Matches on both sides or neither
    Unchanged,
}

impl BlockDelta {
    /// Classify this delta against a predicate
    pub fn classify(&self, predicate: &dyn BlockPredicate) -> DeltaKind {
        match (predicate.matches(self.old), predicate.matches(self.new)) {
            (false, true) => DeltaKind::Addition,
            (true, false) => DeltaKind::Removal,
            _ => DeltaKind::Unchanged,
        }
    }
}

/// State of one chunk coordinate in the index.
///
/// Absence from the map means Unloaded/Evicted. Indexing -> Indexed is an
/// atomic whole-slot replace; a mismatched generation at install time means
/// the result is stale and gets discarded.
enum ChunkSlot {
    /// A scan is in flight; deltas are deferred until it installs
    Indexing {
        generation: u64,
        deferred: Vec<BlockDelta>,
    },
    /// Scan installed; deltas apply inline
    Indexed {
        generation: u64,
        index: Arc<Mutex<ChunkIndex>>,
    },
}

/// Index of matching blocks across all retained chunks.
///
/// The top-level chunk map has its own lock, distinct from the per-chunk
/// locks, so concurrent writers to different chunks don't serialize on a
/// single global mutex. Chunk locks are never nested: cross-chunk neighbor
/// lookups take one lock at a time, so visibility may lag a concurrent
/// mutation by a frame, which the next delta or prune cycle corrects.
pub struct WorldIndex {
    /// Slot per retained chunk coordinate
    chunks: Mutex<HashMap<ChunkCoord, ChunkSlot>>,
    /// Chunk the observer currently occupies (drives eviction)
    observer: Mutex<ChunkCoord>,
    /// Monotonic stamp source for scan installs
    next_generation: AtomicU64,
}

impl WorldIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(HashMap::new()),
            observer: Mutex::new(ChunkCoord::new(0, 0)),
            next_generation: AtomicU64::new(1),
        }
    }

    fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Update the observer's world position
    pub fn set_observer(&self, pos: Vec3) {
        *self.observer.lock().unwrap() = ChunkCoord::from_world_pos(pos);
    }

    /// Chunk the observer currently occupies
    pub fn observer_chunk(&self) -> ChunkCoord {
        *self.observer.lock().unwrap()
    }

    /// Mark a chunk as Indexing and return the generation stamped into it.
    ///
    /// Replaces any existing slot, so a previously indexed chunk drops its
    /// data and a previously in-flight scan becomes stale.
    pub fn begin_indexing(&self, coord: ChunkCoord) -> u64 {
        let generation = self.next_generation();
        let mut chunks = self.chunks.lock().unwrap();
        chunks.insert(
            coord,
            ChunkSlot::Indexing {
                generation,
                deferred: Vec::new(),
            },
        );
        generation
    }

    /// Drop an Indexing slot whose scan came back without data.
    ///
    /// Returns `false` if the slot was already superseded.
    pub fn abort_indexing(&self, coord: ChunkCoord, generation: u64) -> bool {
        let mut chunks = self.chunks.lock().unwrap();
        let owned = matches!(
            chunks.get(&coord),
            Some(ChunkSlot::Indexing { generation: g, .. }) if *g == generation
        );
        if owned {
            chunks.remove(&coord);
        }
        owned
    }

    /// Install a completed scan result for a chunk.
    ///
    /// Only installs if the slot is still Indexing with the same generation;
    /// otherwise the result is stale and `false` is returned. On install,
    /// deltas deferred during the scan are replayed so the final state
    /// reflects them rather than the pre-delta scan.
    pub fn install_scan(
        &self,
        coord: ChunkCoord,
        generation: u64,
        matches: Vec<BlockKey>,
        predicate: &dyn BlockPredicate,
    ) -> bool {
        let (index, deferred) = {
            let mut chunks = self.chunks.lock().unwrap();
            match chunks.remove(&coord) {
                Some(ChunkSlot::Indexing {
                    generation: g,
                    deferred,
                }) if g == generation => {
                    let index = Arc::new(Mutex::new(ChunkIndex::from_keys(coord, matches)));
                    chunks.insert(
                        coord,
                        ChunkSlot::Indexed {
                            generation,
                            index: index.clone(),
                        },
                    );
                    (index, deferred)
                }
                Some(slot) => {
                    // not ours to install; put the live slot back
                    chunks.insert(coord, slot);
                    return false;
                }
                None => return false,
            }
        };

        let keys: Vec<BlockKey> = index.lock().unwrap().keys().copied().collect();
        for key in keys {
            self.refresh_visibility(key);
        }
        for delta in deferred {
            log::trace!("replaying deferred delta at {:?}", delta.key);
            self.apply_delta(delta, predicate);
        }
        true
    }

    /// Route a block-change notification to the owning chunk.
    ///
    /// While the chunk is Indexing the delta is deferred and replayed after
    /// the scan installs. While Indexed it applies inline. An addition into
    /// an untracked chunk lazily creates an empty one; a removal there is a
    /// no-op.
    pub fn apply_delta(&self, delta: BlockDelta, predicate: &dyn BlockPredicate) {
        match delta.classify(predicate) {
            DeltaKind::Unchanged => {}
            DeltaKind::Addition => {
                if self.defer_if_indexing(delta) {
                    return;
                }
                self.add_block(delta.key);
            }
            DeltaKind::Removal => {
                if self.defer_if_indexing(delta) {
                    return;
                }
                self.remove_block(delta.key);
            }
        }
    }

    fn defer_if_indexing(&self, delta: BlockDelta) -> bool {
        let mut chunks = self.chunks.lock().unwrap();
        if let Some(ChunkSlot::Indexing { deferred, .. }) = chunks.get_mut(&delta.key.chunk()) {
            deferred.push(delta);
            return true;
        }
        false
    }

    /// Track a newly matching position.
    ///
    /// Recomputes visibility for the position and its 6 neighbors, since a
    /// new block can enclose a previously exposed one.
    pub fn add_block(&self, key: BlockKey) {
        let index = {
            let mut chunks = self.chunks.lock().unwrap();
            match chunks.entry(key.chunk()) {
                Entry::Occupied(entry) => match entry.get() {
                    ChunkSlot::Indexed { index, .. } => index.clone(),
                    // an in-flight scan owns this chunk and its snapshot
                    // already reflects the world; nothing to do here
                    ChunkSlot::Indexing { .. } => return,
                },
                Entry::Vacant(slot) => {
                    let generation = self.next_generation();
                    let index = Arc::new(Mutex::new(ChunkIndex::new(key.chunk())));
                    slot.insert(ChunkSlot::Indexed {
                        generation,
                        index: index.clone(),
                    });
                    index
                }
            }
        };

        let inserted = index.lock().unwrap().insert(key);
        if !inserted {
            return;
        }
        self.refresh_visibility(key);
        for neighbor in key.neighbors() {
            self.refresh_visibility(neighbor);
        }
    }

    /// Stop tracking a position.
    ///
    /// Recomputes visibility for the 6 neighbors, since a removal can expose
    /// previously hidden ones.
    pub fn remove_block(&self, key: BlockKey) {
        let Some(index) = self.indexed(key.chunk()) else {
            return;
        };
        let removed = index.lock().unwrap().remove(key);
        if !removed {
            return;
        }
        for neighbor in key.neighbors() {
            self.refresh_visibility(neighbor);
        }
    }

    /// Whether a position holds a matching record.
    ///
    /// Positions in untracked chunks count as not matching (fail-open for
    /// visibility at unloaded borders).
    pub fn matches(&self, key: BlockKey) -> bool {
        match self.indexed(key.chunk()) {
            Some(index) => index.lock().unwrap().contains(key),
            None => false,
        }
    }

    /// Recompute the cached visibility of one tracked position.
    ///
    /// Visible iff at least one of the 6 face-adjacent neighbors is not a
    /// matching record. Pure and idempotent; no-op for untracked positions.
    pub fn refresh_visibility(&self, key: BlockKey) {
        let Some(index) = self.indexed(key.chunk()) else {
            return;
        };
        let tracked = index.lock().unwrap().contains(key);
        if !tracked {
            return;
        }
        // gather neighbor matches one lock at a time; chunk locks never nest
        let visible = key.neighbors().iter().any(|n| !self.matches(*n));
        index.lock().unwrap().set_visible(key, visible);
    }

    /// Full visibility recompute for every tracked record.
    ///
    /// Used after a bulk predicate change; idempotent.
    pub fn update_all_visibility(&self) {
        for index in self.indexed_chunks() {
            let keys: Vec<BlockKey> = index.lock().unwrap().keys().copied().collect();
            for key in keys {
                self.refresh_visibility(key);
            }
        }
    }

    /// Drop chunks beyond `limit` chunks of the observer.
    ///
    /// Evicted chunks regenerate lazily through a fresh scan on re-entry;
    /// stale data is never reused. Returns the number of chunks dropped.
    pub fn prune(&self, limit: f32) -> usize {
        let observer = self.observer_chunk();
        let mut chunks = self.chunks.lock().unwrap();
        let before = chunks.len();
        chunks.retain(|coord, _| coord.in_render_distance(observer, limit));
        let dropped = before - chunks.len();
        if dropped > 0 {
            log::debug!("pruned {} chunks beyond {:.1} chunks of {:?}", dropped, limit, observer);
        }
        dropped
    }

    /// Copy out every visible record across all indexed chunks.
    ///
    /// The map lock is held only to clone the chunk list and each chunk lock
    /// only for the copy, so writers are never blocked for long.
    pub fn snapshot_visible(&self) -> Vec<BlockRecord> {
        let mut out = Vec::new();
        for index in self.indexed_chunks() {
            out.extend(index.lock().unwrap().visible_records());
        }
        out
    }

    /// Drop every slot (feature disable)
    pub fn clear(&self) {
        self.chunks.lock().unwrap().clear();
    }

    /// Coordinates of every retained slot, Indexing or Indexed
    pub fn coords(&self) -> Vec<ChunkCoord> {
        self.chunks.lock().unwrap().keys().copied().collect()
    }

    /// Number of retained chunk slots
    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    /// Total matching blocks across all indexed chunks
    pub fn block_count(&self) -> usize {
        self.indexed_chunks()
            .iter()
            .map(|index| index.lock().unwrap().len())
            .sum()
    }

    /// Total visible blocks across all indexed chunks
    pub fn visible_count(&self) -> usize {
        self.indexed_chunks()
            .iter()
            .map(|index| index.lock().unwrap().visible_len())
            .sum()
    }

    /// Whether a chunk is currently Indexed
    pub fn is_indexed(&self, coord: ChunkCoord) -> bool {
        matches!(
            self.chunks.lock().unwrap().get(&coord),
            Some(ChunkSlot::Indexed { .. })
        )
    }

    /// Whether a chunk has a scan in flight
    pub fn is_indexing(&self, coord: ChunkCoord) -> bool {
        matches!(
            self.chunks.lock().unwrap().get(&coord),
            Some(ChunkSlot::Indexing { .. })
        )
    }

    fn indexed(&self, coord: ChunkCoord) -> Option<Arc<Mutex<ChunkIndex>>> {
        match self.chunks.lock().unwrap().get(&coord) {
            Some(ChunkSlot::Indexed { index, .. }) => Some(index.clone()),
            _ => None,
        }
    }

    fn indexed_chunks(&self) -> Vec<Arc<Mutex<ChunkIndex>>> {
        self.chunks
            .lock()
            .unwrap()
            .values()
            .filter_map(|slot| match slot {
                ChunkSlot::Indexed { index, .. } => Some(index.clone()),
                ChunkSlot::Indexing { .. } => None,
            })
            .collect()
    }
}

impl Default for WorldIndex {
    fn default() -> Self {
        Self::new()
    }
}
