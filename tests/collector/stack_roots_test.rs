/*!
 * Stack Root Tests
 * Blocks referenced only from live frames
 */

use pretty_assertions::assert_eq;
use rgc::gc::roots::{with_stack_snapshot, StackBounds};
use rgc::{scrub_stack, Collector, GcConfig, StackRootStatus, StackSource};
use std::hint::black_box;

fn collector() -> Collector {
    Collector::init(GcConfig::explicit_roots().with_arena_capacity(1 << 20)).unwrap()
}

/// Allocates a block held only by a local and collects while it is live
#[inline(never)]
fn collect_with_live_local(gc: &mut Collector) -> bool {
    let handle = black_box(gc.allocate(48).unwrap());
    let report = gc.collect().unwrap();
    assert!(matches!(report.stack_root, StackRootStatus::Scanned { .. }));
    let survived = gc.table().block_at(black_box(handle).address()).is_some();
    survived
}

#[test]
fn test_stack_local_survives_then_is_collected() {
    let mut gc = collector();

    assert!(collect_with_live_local(&mut gc));
    assert_eq!(gc.live_blocks(), 1);

    scrub_stack(64 * 1024);
    let report = gc.collect().unwrap();
    assert_eq!(report.freed_blocks, 1);
    assert_eq!(gc.live_blocks(), 0);
}

#[inline(never)]
fn nested_frames(gc: &mut Collector, depth: usize) -> usize {
    let handle = black_box(gc.allocate(16).unwrap());
    let survivors = if depth == 0 {
        gc.collect().unwrap();
        gc.live_blocks()
    } else {
        nested_frames(gc, depth - 1)
    };
    black_box(handle);
    survivors
}

#[test]
fn test_every_live_frame_is_scanned() {
    let mut gc = collector();
    assert_eq!(nested_frames(&mut gc, 7), 8);
}

#[test]
fn test_thread_stack_bounds_contain_snapshot() {
    let bounds = StackBounds::discover(StackSource::ThreadAttributes).unwrap();
    with_stack_snapshot(|snapshot| {
        assert!(snapshot.stack_pointer() >= bounds.low);
        assert!(snapshot.stack_pointer() < bounds.high);
        let range = bounds.range_from(snapshot.stack_pointer()).unwrap();
        assert_eq!(range.end(), bounds.high);
    });
}

#[test]
fn test_collection_on_spawned_thread() {
    let freed = std::thread::spawn(|| {
        let mut gc = collector();
        assert!(collect_with_live_local(&mut gc));
        scrub_stack(64 * 1024);
        gc.collect().unwrap().freed_blocks
    })
    .join()
    .unwrap();
    assert_eq!(freed, 1);
}

#[test]
fn test_main_thread_only_source_is_skipped_off_main() {
    let mut gc = Collector::init(
        GcConfig::explicit_roots()
            .with_arena_capacity(1 << 20)
            .with_stack_source(StackSource::ProcStat),
    )
    .unwrap();
    let report = std::thread::spawn(move || {
        let report = gc.collect().unwrap();
        drop(gc);
        report
    })
    .join()
    .unwrap();
    assert!(matches!(report.stack_root, StackRootStatus::Skipped { .. }));
    assert_eq!(report.root_ranges, 0);
}
