//! Per-feature facade tying index, scanning, and predicate together

use std::sync::Arc;

use glam::Vec3;

use crate::config::HighlighterConfig;
use crate::index::block::{BlockKey, BlockRecord, BlockState};
use crate::index::chunk::ChunkCoord;
use crate::index::world::{BlockDelta, WorldIndex};
use crate::predicate::BlockPredicate;
use crate::scan::service::{ScanResult, ScanService};
use crate::scan::snapshot::ChunkSource;

/// One highlight feature instance (e.g. an ore overlay).
///
/// Created on feature enable, discarded on disable. The host forwards world
/// events to `on_chunk_loaded` / `on_block_changed`, calls `on_tick` from its
/// update loop, and pulls `snapshot_visible` once per frame for drawing.
/// Chunk scans run on the scan service's worker pool, never on the caller's
/// thread; block deltas apply inline (O(7) neighbor lookups).
pub struct BlockHighlighter {
    index: WorldIndex,
    service: ScanService,
    predicate: Arc<dyn BlockPredicate>,
    config: HighlighterConfig,
    enabled: bool,
}

impl BlockHighlighter {
    /// Create a highlighter with a dedicated scan runtime.
    ///
    /// The initial predicate is built from `config.allow_list`; swap in a
    /// custom one later with `set_predicate`.
    pub fn new(source: Arc<dyn ChunkSource>, config: HighlighterConfig) -> Self {
        let predicate: Arc<dyn BlockPredicate> = Arc::new(config.allow_list.clone());
        let service = ScanService::new(source, config.scan_workers);
        Self {
            index: WorldIndex::new(),
            service,
            predicate,
            config,
            enabled: true,
        }
    }

    /// Create a highlighter on the current tokio runtime.
    ///
    /// Like `new`, the initial predicate comes from `config.allow_list`.
    pub fn new_with_current_runtime(source: Arc<dyn ChunkSource>, config: HighlighterConfig) -> Self {
        let predicate: Arc<dyn BlockPredicate> = Arc::new(config.allow_list.clone());
        let service = ScanService::new_with_current_runtime(source, config.scan_workers);
        Self {
            index: WorldIndex::new(),
            service,
            predicate,
            config,
            enabled: true,
        }
    }

    /// Host notification: a chunk finished loading.
    ///
    /// Marks the chunk Indexing and queues an async scan; deltas arriving
    /// before the scan installs are deferred and replayed afterwards.
    pub fn on_chunk_loaded(&mut self, coord: ChunkCoord) {
        if !self.enabled {
            return;
        }
        let generation = self.index.begin_indexing(coord);
        self.service.request(coord, generation, self.predicate.clone());
    }

    /// Host notification: a single block changed state
    pub fn on_block_changed(&mut self, key: BlockKey, old: BlockState, new: BlockState) {
        if !self.enabled {
            return;
        }
        self.index
            .apply_delta(BlockDelta { key, old, new }, self.predicate.as_ref());
    }

    /// Install completed scan results.
    ///
    /// Results that were superseded, out of range, or that completed after a
    /// disable are discarded here; that is the normal stale-scan path, not an
    /// error.
    pub fn pump(&mut self) {
        for result in self.service.poll_results() {
            if !self.enabled {
                log::debug!("discarding scan for {:?}: feature disabled", result.coord());
                continue;
            }
            match result {
                ScanResult::Scanned {
                    coord,
                    generation,
                    matches,
                    scan_time_ms,
                } => {
                    let observer = self.index.observer_chunk();
                    if !coord.in_render_distance(observer, self.config.render_distance_chunks) {
                        // no longer wanted; prune clears the stale slot
                        self.index.abort_indexing(coord, generation);
                        log::debug!("discarding scan for {:?}: out of range", coord);
                        continue;
                    }
                    let count = matches.len();
                    if self
                        .index
                        .install_scan(coord, generation, matches, self.predicate.as_ref())
                    {
                        log::debug!(
                            "indexed chunk {:?}: {} matches in {:.2}ms",
                            coord,
                            count,
                            scan_time_ms
                        );
                    } else {
                        log::debug!("discarding scan for {:?}: generation superseded", coord);
                    }
                }
                ScanResult::Missing { coord, generation } => {
                    self.index.abort_indexing(coord, generation);
                    log::debug!("chunk {:?} vanished before its scan", coord);
                }
            }
        }
    }

    /// Per-tick maintenance: install scan results, then evict distant chunks
    pub fn on_tick(&mut self) {
        self.pump();
        if self.enabled {
            self.index.prune(self.config.render_distance_chunks);
        }
    }

    /// Update the observer's world position
    pub fn set_observer(&mut self, pos: Vec3) {
        self.index.set_observer(pos);
    }

    /// Swap the active predicate and rescan every retained chunk.
    ///
    /// Membership can widen as well as narrow, so cached records can't be
    /// filtered in place; each chunk goes back through Indexing.
    pub fn set_predicate(&mut self, predicate: Arc<dyn BlockPredicate>) {
        self.predicate = predicate;
        if !self.enabled {
            return;
        }
        let coords = self.index.coords();
        log::info!("predicate changed, rescanning {} chunks", coords.len());
        for coord in coords {
            let generation = self.index.begin_indexing(coord);
            self.service.request(coord, generation, self.predicate.clone());
        }
    }

    /// Copy out every currently visible record for drawing
    pub fn snapshot_visible(&self) -> Vec<BlockRecord> {
        self.index.snapshot_visible()
    }

    /// Re-arm after a disable.
    ///
    /// The index starts empty; the host re-delivers chunk loads for whatever
    /// is in range.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop indexing and drop all data; in-flight scans are discarded when
    /// they complete
    pub fn disable(&mut self) {
        self.enabled = false;
        self.index.clear();
        log::info!("highlighter disabled, index cleared");
    }

    /// Whether the feature is currently enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The underlying index (stats, direct queries)
    pub fn index(&self) -> &WorldIndex {
        &self.index
    }

    /// The active configuration
    pub fn config(&self) -> &HighlighterConfig {
        &self.config
    }
}
