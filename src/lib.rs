//! Blocksight - spatial block index with incremental visibility culling

pub mod core;
pub mod index;
pub mod scan;
pub mod predicate;
pub mod config;
pub mod highlighter;
