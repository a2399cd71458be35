//! # tickfiber - stackless fibers for frame-ticked hosts
//!
//! Cooperative fiber runtime for environments that advance the world in
//! small time slices: game frames, control loops, microcontroller main
//! loops. A host owns a [`FiberStack`] (a fixed byte buffer), starts one
//! root fiber on it, and calls [`FiberStack::tick`] once per frame with
//! the elapsed time. Fibers suspend mid-body by sleeping or by calling
//! nested fibers, and resume exactly where they left off on a later
//! tick. No OS threads, no per-fiber stacks, no allocation after the
//! stack is built.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tickfiber::{fiber_body, Fiber, FiberPoll, FiberStack, ResumePoint, Sleep, TimeBudget};
//!
//! struct Blink {
//!     rp: ResumePoint,
//!     cycles: u32,
//! }
//!
//! impl Fiber for Blink {
//!     fn tick(&mut self, fs: &mut FiberStack<'_>, pos: usize,
//!             dt: &mut TimeBudget) -> FiberPoll {
//!         fiber_body!((self.rp, fs, pos, dt) {
//!             run { led_on(); }
//!             site 1: sleep(0.2);
//!             run { led_off(); self.cycles += 1; }
//!             site 2: sleep(0.8);
//!         })
//!     }
//! }
//!
//! fn main() {
//!     let mut stack = FiberStack::new(128);
//!     stack.start(Blink { rp: ResumePoint::ENTRY, cycles: 0 }).unwrap();
//!     while stack.tick(1.0 / 60.0) {
//!         // render, poll input, ...
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Host loop                       │
//! │                 stack.tick(delta)                   │
//! └─────────────────────────────────────────────────────┘
//!                          │ root trampoline
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │ FiberStack buffer (fixed capacity)                  │
//! │ ┌───────────┐┌───────────┐┌─────────┐              │
//! │ │ root      ││ nested    ││ Sleep   │  ...free...  │
//! │ │ record    ││ record    ││ record  │              │
//! │ └───────────┘└───────────┘└─────────┘              │
//! │      └─ tick ─────┴─ tick ────┘   innermost first   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Each record's tick either suspends (the whole chain yields back to
//! the host) or completes (the record is dropped in place and the
//! caller's body continues after the call site). The time budget flows
//! down the chain and unused surplus flows back up.

// Re-export the core surface
pub use tickfiber_core::{
    frame_size, Fiber, FiberError, FiberPoll, FiberResult, FiberStack, ResumePoint, Sleep,
    StackBuffer, TimeBudget,
};

pub use tickfiber_core::constants;

// Re-export print and contract-check macros
pub use tickfiber_core::{
    fassert, fassert_log, fdebug, ferror, ffatal, finfo, fprint, fprintln, ftrace, fwarn,
};
pub use tickfiber_core::fprint::{
    init as init_logging, set_flush_enabled, set_log_level, LogLevel,
};

mod macros;
