/*!
 * rgc - Self-Check Entry Point
 *
 * Builds a small heap graph, runs collection cycles against it, and prints
 * the resulting statistics as JSON.
 */

use std::error::Error;
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use rgc::{init_tracing, scrub_stack, Collector, GcConfig};

/// Static root holding the container block's address
static CONTAINER: AtomicUsize = AtomicUsize::new(0);

const CHILDREN: usize = 5;

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let config = GcConfig::from_env()?;
    info!(config = %serde_json::to_string(&config)?, "rgc self-check starting");
    let mut gc = Collector::init(config)?;

    build_graph(&mut gc)?;
    scrub_stack(16 * 1024);

    let kept = gc.collect()?;
    info!(
        freed_blocks = kept.freed_blocks,
        live_blocks = kept.live_blocks,
        "cycle with container rooted"
    );
    gc.heap_graph().log("after first cycle");
    if kept.freed_blocks != 0 || black_box(CONTAINER.load(Ordering::SeqCst)) == 0 {
        return Err(format!("rooted container lost {} blocks", kept.freed_blocks).into());
    }

    black_box(&CONTAINER).store(0, Ordering::SeqCst);
    scrub_stack(16 * 1024);
    let released = gc.collect()?;
    info!(
        freed_blocks = released.freed_blocks,
        live_blocks = released.live_blocks,
        "cycle with container unrooted"
    );
    if released.freed_blocks != CHILDREN + 1 {
        return Err(format!(
            "unrooted container freed {} of {} blocks",
            released.freed_blocks,
            CHILDREN + 1
        )
        .into());
    }

    let stats = gc.stats().clone();
    let memory = gc.memory_stats();
    let cleanup = gc.cleanup();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "first_cycle": kept,
            "second_cycle": released,
            "gc": stats,
            "memory": memory,
            "cleanup": cleanup,
        }))?
    );
    Ok(())
}

/// Container block referencing five children, reachable only from `CONTAINER`
#[inline(never)]
fn build_graph(gc: &mut Collector) -> Result<(), Box<dyn Error>> {
    let container = gc.allocate(CHILDREN * std::mem::size_of::<usize>())?;
    let slots = gc
        .payload_ptr(container)
        .ok_or("container block vanished")?
        .as_ptr()
        .cast::<usize>();

    for index in 0..CHILDREN {
        let child = gc.allocate(32)?;
        // SAFETY: the container holds CHILDREN words
        unsafe { slots.add(index).write(child.address()) };
    }

    black_box(&CONTAINER).store(container.address(), Ordering::SeqCst);
    Ok(())
}
