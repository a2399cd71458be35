//! # tickfiber-core
//!
//! Core types for the tickfiber cooperative fiber runtime.
//!
//! A host owns one or more [`FiberStack`]s, each a fixed-capacity byte
//! buffer holding the activation records of a single fiber call chain.
//! Once per frame the host calls [`FiberStack::tick`] with the elapsed
//! time; the live fibers advance to their next suspension point and the
//! call returns. No OS threads, no per-fiber stacks, no allocation after
//! the stack itself is created.
//!
//! ## Modules
//!
//! - `stack` - fiber callstack, activation record storage and dispatch
//! - `fiber` - the `Fiber` protocol, poll result and resume points
//! - `sleep` - built-in leaf fiber that waits out a duration
//! - `budget` - per-tick time accounting
//! - `error` - error types
//! - `fprint` - leveled stderr print macros and contract-check macros
//!
//! Authoring sugar (the `fiber_body!` macro) lives in the `tickfiber`
//! facade crate; this crate only defines the underlying protocol.

pub mod budget;
pub mod error;
pub mod fiber;
pub mod fprint;
pub mod sleep;
pub mod stack;

// Re-exports for convenience
pub use budget::TimeBudget;
pub use error::{FiberError, FiberResult};
pub use fiber::{Fiber, FiberPoll, ResumePoint};
pub use sleep::Sleep;
pub use stack::{frame_size, FiberStack, StackBuffer};

/// Constants for stack layout
pub mod constants {
    /// Alignment of every activation record, in bytes.
    ///
    /// Covers all the ordinary scalar types. Fibers whose state needs a
    /// stricter alignment are rejected when pushed.
    pub const FRAME_ALIGN: usize = 8;

    /// Capacity of a default-constructed stack, in bytes.
    pub const DEFAULT_STACK_BYTES: usize = 256;
}
