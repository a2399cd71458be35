//! Basic tickfiber example
//!
//! One stack, one root fiber with nested calls, driven by a fixed-step
//! frame loop the way a game or control loop would.

use tickfiber::{fiber_body, Fiber, FiberPoll, FiberStack, ResumePoint, TimeBudget};

/// One leg of the patrol: announce the target, walk, announce arrival.
struct Leg {
    rp: ResumePoint,
    waypoint: u32,
}

impl Leg {
    fn new(waypoint: u32) -> Self {
        Leg {
            rp: ResumePoint::ENTRY,
            waypoint,
        }
    }
}

impl Fiber for Leg {
    fn tick(&mut self, fs: &mut FiberStack<'_>, pos: usize, dt: &mut TimeBudget) -> FiberPoll {
        fiber_body!((self.rp, fs, pos, dt) {
            run { println!("[patrol] heading to waypoint {}", self.waypoint); }
            site 1: sleep(0.75);
            run { println!("[patrol] reached waypoint {}", self.waypoint); }
        })
    }
}

/// The route: three legs with a short pause between them.
struct Patrol {
    rp: ResumePoint,
}

impl Fiber for Patrol {
    fn tick(&mut self, fs: &mut FiberStack<'_>, pos: usize, dt: &mut TimeBudget) -> FiberPoll {
        fiber_body!((self.rp, fs, pos, dt) {
            run { println!("[patrol] starting route"); }
            site 1: Leg => Leg::new(1);
            site 2: sleep(0.25);
            site 3: Leg => Leg::new(2);
            site 4: sleep(0.25);
            site 5: Leg => Leg::new(3);
            run { println!("[patrol] route complete"); }
        })
    }
}

fn main() {
    println!("=== tickfiber basic example ===\n");

    let mut stack = FiberStack::new(256);
    stack
        .start(Patrol {
            rp: ResumePoint::ENTRY,
        })
        .expect("start patrol");

    // A 60 fps frame loop. A real host would measure the elapsed time;
    // here every frame is a fixed step.
    let dt = 1.0 / 60.0;
    let mut frames = 0u32;
    while stack.tick(dt) {
        frames += 1;
    }

    println!(
        "\nfinished after {} frames ({:.2}s simulated)",
        frames,
        frames as f32 * dt
    );
    println!(
        "stack: {} bytes capacity, {} bytes peak (0 unless built with mem-track)",
        stack.capacity(),
        stack.peak_size()
    );
}
