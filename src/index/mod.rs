//! Spatial index of predicate-matching blocks

pub mod block;
pub mod chunk;
pub mod world;

pub use block::{BlockKey, BlockRecord, BlockState};
pub use chunk::{ChunkCoord, ChunkIndex, CHUNK_SIZE};
pub use world::{BlockDelta, DeltaKind, WorldIndex};
