//! Error types for stack operations

use core::fmt;

/// Result type for fallible stack operations
pub type FiberResult<T> = Result<T, FiberError>;

/// Errors reported when placing a root fiber on a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberError {
    /// The activation record does not fit in the stack buffer
    StackOverflow {
        /// Bytes the record would occupy, rounded to frame alignment
        needed: usize,
        /// Capacity of the stack buffer
        capacity: usize,
    },

    /// A root fiber is already running on this stack
    StackInUse,
}

impl fmt::Display for FiberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FiberError::StackOverflow { needed, capacity } => {
                write!(f, "stack overflow by {} bytes", needed - capacity)
            }
            FiberError::StackInUse => write!(f, "stack already in use by a fiber"),
        }
    }
}

impl std::error::Error for FiberError {}
