//! Cooperative abort, forced abort and destructor accounting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tickfiber::{fiber_body, Fiber, FiberPoll, FiberStack, ResumePoint, TimeBudget};

/// Nested fiber that waits a long time; counts its drops.
struct Mid {
    rp: ResumePoint,
    drops: Arc<AtomicUsize>,
}

impl Fiber for Mid {
    fn tick(&mut self, fs: &mut FiberStack<'_>, pos: usize, dt: &mut TimeBudget) -> FiberPoll {
        fiber_body!((self.rp, fs, pos, dt) {
            site 1: sleep(100.0);
        })
    }
}

impl Drop for Mid {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }
}

/// Root fiber: one nested call, then a sleep of its own.
struct Root {
    rp: ResumePoint,
    drops: Arc<AtomicUsize>,
}

impl Fiber for Root {
    fn tick(&mut self, fs: &mut FiberStack<'_>, pos: usize, dt: &mut TimeBudget) -> FiberPoll {
        fiber_body!((self.rp, fs, pos, dt) {
            site 1: Mid => Mid { rp: ResumePoint::ENTRY, drops: self.drops.clone() };
            site 2: sleep(5.0);
        })
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(feature = "safe-abort")]
#[test]
fn test_safe_abort_unwinds_all_frames() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut fs = FiberStack::new(256);
    fs.start(Root {
        rp: ResumePoint::ENTRY,
        drops: drops.clone(),
    })
    .unwrap();

    // Park deep in the chain: root, mid and the mid sleep.
    assert!(fs.tick(0.1));
    assert!(fs.is_running());

    fs.abort();

    assert!(!fs.is_running());
    assert!(!fs.is_aborting());
    assert_eq!(fs.size(), 0);
    assert!(!fs.tick(0.0));
    // Both drop-counting records were dropped exactly once.
    assert_eq!(drops.load(Ordering::Relaxed), 2);
}

#[cfg(feature = "safe-abort")]
#[test]
fn test_abort_after_inner_already_finished() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut fs = FiberStack::new(256);
    fs.start(Root {
        rp: ResumePoint::ENTRY,
        drops: drops.clone(),
    })
    .unwrap();

    // Run the nested call to completion; the root parks in its own sleep.
    assert!(fs.tick(101.0));
    assert_eq!(drops.load(Ordering::Relaxed), 1);

    fs.abort();
    assert_eq!(drops.load(Ordering::Relaxed), 2);
    assert_eq!(fs.size(), 0);
}

#[test]
fn test_force_abort_is_leaky_but_idle() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut fs = FiberStack::new(256);
    fs.start(Root {
        rp: ResumePoint::ENTRY,
        drops: drops.clone(),
    })
    .unwrap();
    assert!(fs.tick(0.1));

    fs.force_abort();

    assert!(!fs.is_running());
    assert_eq!(fs.size(), 0);
    // No fiber code ran; the records were discarded, not dropped.
    assert_eq!(drops.load(Ordering::Relaxed), 0);
    assert!(!fs.tick(0.0));
}

#[test]
fn test_natural_completion_drops_each_frame_once() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut fs = FiberStack::new(256);
    fs.start(Root {
        rp: ResumePoint::ENTRY,
        drops: drops.clone(),
    })
    .unwrap();

    while fs.tick(50.0) {}

    assert_eq!(fs.size(), 0);
    assert_eq!(drops.load(Ordering::Relaxed), 2);
}

#[test]
fn test_stack_reusable_after_abort() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut fs = FiberStack::new(256);
    fs.start(Root {
        rp: ResumePoint::ENTRY,
        drops: drops.clone(),
    })
    .unwrap();
    assert!(fs.tick(0.1));

    fs.abort();
    assert!(!fs.is_running());

    fs.start(Root {
        rp: ResumePoint::ENTRY,
        drops: drops.clone(),
    })
    .unwrap();
    while fs.tick(50.0) {}
    assert!(!fs.is_running());
}
