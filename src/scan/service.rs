//! Async scan service with priority-free queued concurrent scans

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::index::block::BlockKey;
use crate::index::chunk::ChunkCoord;
use crate::predicate::BlockPredicate;
use crate::scan::snapshot::{scan_snapshot, ChunkSource};

/// Request to scan one chunk column
#[derive(Clone)]
pub struct ScanRequest {
    /// Chunk to scan
    pub coord: ChunkCoord,
    /// Generation stamped into the chunk slot when the scan was queued
    pub generation: u64,
    /// Predicate active when the scan was queued
    pub predicate: Arc<dyn BlockPredicate>,
}

/// Result of a completed scan
#[derive(Debug)]
pub enum ScanResult {
    /// Matching positions found in the chunk
    Scanned {
        coord: ChunkCoord,
        generation: u64,
        matches: Vec<BlockKey>,
        scan_time_ms: f32,
    },
    /// The host no longer had the chunk loaded
    Missing { coord: ChunkCoord, generation: u64 },
}

impl ScanResult {
    /// Chunk this result belongs to
    pub fn coord(&self) -> ChunkCoord {
        match self {
            ScanResult::Scanned { coord, .. } => *coord,
            ScanResult::Missing { coord, .. } => *coord,
        }
    }

    /// Generation the scan was queued under
    pub fn generation(&self) -> u64 {
        match self {
            ScanResult::Scanned { generation, .. } => *generation,
            ScanResult::Missing { generation, .. } => *generation,
        }
    }
}

/// Concurrent chunk scanner backed by a worker task pool.
///
/// Requests flow through an unbounded channel to a worker loop that keeps at
/// most `max_concurrent` scans in flight; results come back through a second
/// channel and are drained with `poll_results` on the caller's thread.
pub struct ScanService {
    /// Channel for sending scan requests to the worker loop
    request_tx: mpsc::UnboundedSender<ScanRequest>,
    /// Channel for receiving scan results
    result_rx: mpsc::UnboundedReceiver<ScanResult>,
    /// Latest queued generation per chunk still awaiting a result
    pending: HashMap<ChunkCoord, u64>,
    /// Tokio runtime handle (None when using the caller's runtime)
    #[allow(dead_code)]
    runtime: Option<Runtime>,
}

impl ScanService {
    /// Create a new scan service with a dedicated runtime
    ///
    /// # Arguments
    /// * `source` - Host-side chunk data access
    /// * `max_concurrent` - Maximum number of scans in flight (clamped to 1)
    pub fn new(source: Arc<dyn ChunkSource>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<ScanRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<ScanResult>();

        let runtime = Runtime::new().expect("Failed to create tokio runtime");

        runtime.spawn(async move {
            Self::worker_loop(source, max_concurrent, &mut request_rx, result_tx).await;
        });

        Self {
            request_tx,
            result_rx,
            pending: HashMap::new(),
            runtime: Some(runtime),
        }
    }

    /// Create a scan service on the current tokio runtime
    ///
    /// Useful when the caller already runs inside tokio. Panics if called
    /// outside a runtime context.
    pub fn new_with_current_runtime(source: Arc<dyn ChunkSource>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<ScanRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<ScanResult>();

        tokio::spawn(async move {
            Self::worker_loop(source, max_concurrent, &mut request_rx, result_tx).await;
        });

        Self {
            request_tx,
            result_rx,
            pending: HashMap::new(),
            runtime: None,
        }
    }

    /// Worker loop that processes scan requests with concurrency control
    async fn worker_loop(
        source: Arc<dyn ChunkSource>,
        max_concurrent: usize,
        request_rx: &mut mpsc::UnboundedReceiver<ScanRequest>,
        result_tx: mpsc::UnboundedSender<ScanResult>,
    ) {
        let mut active_tasks = JoinSet::new();
        let mut queued: VecDeque<ScanRequest> = VecDeque::new();

        loop {
            tokio::select! {
                Some(request) = request_rx.recv() => {
                    queued.push_back(request);
                }

                Some(result) = active_tasks.join_next(), if !active_tasks.is_empty() => {
                    match result {
                        Ok(scan_result) => {
                            let _ = result_tx.send(scan_result);
                        }
                        Err(e) => {
                            log::error!("scan task panicked: {}", e);
                        }
                    }
                }

                // Exit when the channel is closed and no more work remains
                else => {
                    if queued.is_empty() && active_tasks.is_empty() {
                        break;
                    }
                }
            }

            // Start new scans while we have capacity
            while active_tasks.len() < max_concurrent {
                let Some(request) = queued.pop_front() else {
                    break;
                };
                let source = source.clone();
                active_tasks.spawn_blocking(move || Self::scan_task(source, request));
            }
        }
    }

    /// Scan a single chunk against the request's predicate
    fn scan_task(source: Arc<dyn ChunkSource>, request: ScanRequest) -> ScanResult {
        let started = Instant::now();
        match source.snapshot(request.coord) {
            Some(snapshot) => {
                let matches = scan_snapshot(&snapshot, request.predicate.as_ref());
                ScanResult::Scanned {
                    coord: request.coord,
                    generation: request.generation,
                    matches,
                    scan_time_ms: started.elapsed().as_secs_f32() * 1000.0,
                }
            }
            None => ScanResult::Missing {
                coord: request.coord,
                generation: request.generation,
            },
        }
    }

    /// Queue a chunk scan.
    ///
    /// A newer request for the same chunk supersedes any older one still in
    /// flight; the stale result is rejected downstream by its generation.
    pub fn request(&mut self, coord: ChunkCoord, generation: u64, predicate: Arc<dyn BlockPredicate>) {
        self.pending.insert(coord, generation);
        let request = ScanRequest {
            coord,
            generation,
            predicate,
        };
        self.request_tx.send(request).expect("Scan worker died");
    }

    /// Poll for completed scan results (non-blocking)
    ///
    /// Returns all currently available results.
    pub fn poll_results(&mut self) -> Vec<ScanResult> {
        let mut results = Vec::new();

        while let Ok(result) = self.result_rx.try_recv() {
            // only the newest generation keeps the chunk pending
            if let Some(&latest) = self.pending.get(&result.coord()) {
                if result.generation() >= latest {
                    self.pending.remove(&result.coord());
                }
            }
            results.push(result);
        }

        results
    }

    /// Forget a pending scan (best effort)
    ///
    /// The scan may still complete; its result should be discarded by the
    /// caller via the generation check.
    pub fn cancel(&mut self, coord: ChunkCoord) {
        self.pending.remove(&coord);
    }

    /// Number of chunks with a scan outstanding
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a chunk has a scan outstanding
    pub fn is_pending(&self, coord: ChunkCoord) -> bool {
        self.pending.contains_key(&coord)
    }
}
