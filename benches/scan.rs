use criterion::{criterion_group, criterion_main, Criterion, black_box};

use blocksight::index::block::{BlockKey, BlockState};
use blocksight::index::chunk::{ChunkCoord, CHUNK_SIZE};
use blocksight::index::world::{BlockDelta, WorldIndex};
use blocksight::predicate::AllowList;
use blocksight::scan::snapshot::{scan_snapshot, ChunkSnapshot};

const ORE: BlockState = BlockState(14);
const STONE: BlockState = BlockState(1);

/// A full stone column with a deterministic speckle of ore
fn build_snapshot(height: i32) -> ChunkSnapshot {
    let coord = ChunkCoord::new(0, 0);
    let mut snapshot = ChunkSnapshot::new(coord, -64);
    for x in 0..CHUNK_SIZE {
        for z in 0..CHUNK_SIZE {
            for y in -64..(-64 + height) {
                let state = if (x + y + z).rem_euclid(37) == 0 { ORE } else { STONE };
                snapshot.set_block(BlockKey::new(x, y, z), state);
            }
        }
    }
    snapshot
}

fn ore_list() -> AllowList {
    AllowList::from_states([ORE])
}

fn bench_scan_short_column(c: &mut Criterion) {
    let snapshot = build_snapshot(64);
    let predicate = ore_list();

    c.bench_function("scan_column_64", |b| {
        b.iter(|| scan_snapshot(black_box(&snapshot), black_box(&predicate)));
    });
}

fn bench_scan_tall_column(c: &mut Criterion) {
    let snapshot = build_snapshot(320);
    let predicate = ore_list();

    c.bench_function("scan_column_320", |b| {
        b.iter(|| scan_snapshot(black_box(&snapshot), black_box(&predicate)));
    });
}

fn bench_install_scan(c: &mut Criterion) {
    let snapshot = build_snapshot(320);
    let predicate = ore_list();
    let matches = scan_snapshot(&snapshot, &predicate);

    c.bench_function("install_scan_320", |b| {
        b.iter(|| {
            let index = WorldIndex::new();
            let coord = ChunkCoord::new(0, 0);
            let generation = index.begin_indexing(coord);
            index.install_scan(coord, generation, black_box(matches.clone()), &predicate);
            index.visible_count()
        });
    });
}

fn bench_block_deltas(c: &mut Criterion) {
    let predicate = ore_list();

    c.bench_function("apply_delta_cluster", |b| {
        b.iter(|| {
            let index = WorldIndex::new();
            for x in 0..8 {
                for y in 60..68 {
                    for z in 0..8 {
                        index.apply_delta(
                            BlockDelta {
                                key: BlockKey::new(x, y, z),
                                old: STONE,
                                new: ORE,
                            },
                            &predicate,
                        );
                    }
                }
            }
            index.visible_count()
        });
    });
}

criterion_group!(
    benches,
    bench_scan_short_column,
    bench_scan_tall_column,
    bench_install_scan,
    bench_block_deltas
);
criterion_main!(benches);
