//! Stress test - many fiber stacks
//!
//! Spins up a large number of independent stacks, each with a small
//! nested chain, drives them all to completion while measuring tick
//! throughput, and reports aggregate peak stack usage (built with the
//! `mem-track` feature so `peak_size()` is live).

use std::time::Instant;
use tickfiber::{fiber_body, Fiber, FiberPoll, FiberStack, ResumePoint, TimeBudget};

const STACK_BYTES: usize = 64;

/// Two sleeps whose durations vary per stack, so completions spread
/// out instead of arriving in lockstep.
struct Chain {
    rp: ResumePoint,
    first: f32,
    second: f32,
}

impl Chain {
    fn new(seed: usize) -> Self {
        Chain {
            rp: ResumePoint::ENTRY,
            first: 0.05 + (seed % 7) as f32 * 0.01,
            second: 0.02 + (seed % 13) as f32 * 0.005,
        }
    }
}

impl Fiber for Chain {
    fn tick(&mut self, fs: &mut FiberStack<'_>, pos: usize, dt: &mut TimeBudget) -> FiberPoll {
        fiber_body!((self.rp, fs, pos, dt) {
            site 1: sleep(self.first);
            site 2: sleep(self.second);
        })
    }
}

fn main() {
    println!("=== tickfiber stress test ===\n");

    let num_stacks: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(10_000);

    println!("Creating {} stacks of {} bytes...", num_stacks, STACK_BYTES);

    let setup = Instant::now();
    let mut stacks: Vec<FiberStack<'static>> = Vec::with_capacity(num_stacks);
    for i in 0..num_stacks {
        let mut fs = FiberStack::new(STACK_BYTES);
        fs.start(Chain::new(i)).expect("start chain");
        stacks.push(fs);
    }
    println!("Setup time: {:?}", setup.elapsed());

    let dt = 1.0 / 120.0;
    let mut live = num_stacks;
    let mut ticks: u64 = 0;
    let run = Instant::now();

    while live > 0 {
        for fs in &mut stacks {
            if fs.is_running() {
                ticks += 1;
                if !fs.tick(dt) {
                    live -= 1;
                }
            }
        }
    }

    let elapsed = run.elapsed();
    println!("\nAll chains finished");
    println!("Ticks driven: {}", ticks);
    println!("Run time: {:?}", elapsed);
    println!(
        "Tick rate: {:.0} ticks/sec",
        ticks as f64 / elapsed.as_secs_f64()
    );

    // Every stack is idle again; peak_size is the high-water mark its
    // chain actually needed, which is what a host would use to shrink
    // STACK_BYTES.
    let max_peak = stacks.iter().map(|fs| fs.peak_size()).max().unwrap_or(0);
    let sum_peak: usize = stacks.iter().map(|fs| fs.peak_size()).sum();
    let avg_peak = if stacks.is_empty() {
        0
    } else {
        sum_peak / stacks.len()
    };
    println!(
        "Peak stack usage: {} bytes max, {} bytes avg, of {} byte stacks",
        max_peak, avg_peak, STACK_BYTES
    );
}
