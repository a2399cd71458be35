//! Fiber callstack
//!
//! A `FiberStack` is a fixed-capacity byte buffer holding the
//! activation records of one fiber call chain, packed back to back and
//! aligned to [`FRAME_ALIGN`](crate::constants::FRAME_ALIGN). Records
//! are written in place when a call site first reaches them, never
//! move, and are dropped in place the moment their fiber completes.
//! The buffer is either allocated by the stack itself or borrowed from
//! the host as a [`StackBuffer`].
//!
//! Dispatch is monomorphized per fiber type. The only indirect call in
//! the runtime is the root trampoline recorded by [`FiberStack::start`];
//! every nested dispatch resolves statically at the call site.

use crate::budget::TimeBudget;
use crate::constants::{DEFAULT_STACK_BYTES, FRAME_ALIGN};
use crate::error::{FiberError, FiberResult};
use crate::fiber::{Fiber, FiberPoll};
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};
use std::alloc::{self, Layout};

/// Bytes an activation record of type `F` occupies on a stack.
///
/// The raw size is rounded up to frame alignment, and zero-sized types
/// are given one full alignment unit so that a pushed record always
/// advances the stack (the idempotent push guard depends on it).
pub const fn frame_size<F>() -> usize {
    let raw = mem::size_of::<F>();
    let raw = if raw == 0 { 1 } else { raw };
    (raw + FRAME_ALIGN - 1) & !(FRAME_ALIGN - 1)
}

/// A host-provided stack buffer with the alignment records require.
///
/// Lets a host carve fiber stacks out of static or local memory
/// instead of the heap:
///
/// ```ignore
/// let mut bytes = StackBuffer::<256>::new();
/// let mut stack = FiberStack::with_buffer(&mut bytes);
/// ```
#[repr(align(8))] // keep in sync with constants::FRAME_ALIGN
pub struct StackBuffer<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> StackBuffer<N> {
    /// Create a zeroed buffer.
    pub const fn new() -> Self {
        Self { bytes: [0; N] }
    }

    /// Buffer capacity in bytes.
    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }
}

impl<const N: usize> Default for StackBuffer<N> {
    fn default() -> Self {
        StackBuffer::new()
    }
}

enum BufferOwner {
    Owned,
    Borrowed,
}

/// Signature of the monomorphized root trampoline.
type RootTick = fn(&mut FiberStack<'_>, &mut TimeBudget) -> FiberPoll;

/// A fixed-capacity callstack driving one cooperative fiber chain.
///
/// Invariants, outside the body of a tick:
///
/// - `size <= capacity`
/// - `size == 0` exactly when no root trampoline is recorded, which is
///   exactly when [`is_running`](Self::is_running) is false
/// - the bytes in `[0, size)` are a sequence of live activation
///   records, innermost last
///
/// A stack is driven by one thread at a time and is neither `Send` nor
/// `Sync`; hosts that want parallelism run one stack per thread.
pub struct FiberStack<'buf> {
    buf: NonNull<u8>,
    capacity: usize,
    size: usize,
    root_tick: Option<RootTick>,
    #[cfg(feature = "safe-abort")]
    aborting: bool,
    #[cfg(feature = "mem-track")]
    peak_size: usize,
    owner: BufferOwner,
    _buf: PhantomData<&'buf mut [u8]>,
}

fn buffer_layout(capacity: usize) -> Layout {
    Layout::from_size_align(capacity.max(1), FRAME_ALIGN).expect("stack buffer layout")
}

impl FiberStack<'static> {
    /// Allocate a stack owning `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        let layout = buffer_layout(capacity);
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc(layout) };
        let buf = match NonNull::new(ptr) {
            Some(buf) => buf,
            None => alloc::handle_alloc_error(layout),
        };
        FiberStack {
            buf,
            capacity,
            size: 0,
            root_tick: None,
            #[cfg(feature = "safe-abort")]
            aborting: false,
            #[cfg(feature = "mem-track")]
            peak_size: 0,
            owner: BufferOwner::Owned,
            _buf: PhantomData,
        }
    }
}

impl Default for FiberStack<'static> {
    fn default() -> Self {
        FiberStack::new(DEFAULT_STACK_BYTES)
    }
}

impl<'buf> FiberStack<'buf> {
    /// Run over a buffer owned by the host. Nothing is freed on drop.
    pub fn with_buffer<const N: usize>(buffer: &'buf mut StackBuffer<N>) -> FiberStack<'buf> {
        // SAFETY: an array's data pointer is never null.
        let buf = unsafe { NonNull::new_unchecked(buffer.as_mut_ptr()) };
        FiberStack {
            buf,
            capacity: N,
            size: 0,
            root_tick: None,
            #[cfg(feature = "safe-abort")]
            aborting: false,
            #[cfg(feature = "mem-track")]
            peak_size: 0,
            owner: BufferOwner::Borrowed,
            _buf: PhantomData,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Capacity of the stack buffer in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently occupied by activation records.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Highest `size` ever reached, for capacity tuning.
    ///
    /// Always zero unless built with the `mem-track` feature.
    #[inline]
    pub fn peak_size(&self) -> usize {
        #[cfg(feature = "mem-track")]
        {
            self.peak_size
        }
        #[cfg(not(feature = "mem-track"))]
        {
            0
        }
    }

    /// True while a root fiber occupies the stack.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.root_tick.is_some()
    }

    /// True during the single unwinding tick driven by [`abort`](Self::abort).
    ///
    /// Fiber bodies observe this after every nested dispatch and must
    /// finish without starting new work while it holds. Always false
    /// when built without the `safe-abort` feature.
    #[inline]
    pub fn is_aborting(&self) -> bool {
        #[cfg(feature = "safe-abort")]
        {
            self.aborting
        }
        #[cfg(not(feature = "safe-abort"))]
        {
            false
        }
    }

    // ------------------------------------------------------------------
    // Host interface
    // ------------------------------------------------------------------

    /// Place `fiber` at the bottom of an idle stack.
    ///
    /// The record is written at offset zero and a trampoline
    /// specialized to `F` is recorded; nothing runs until the next
    /// [`tick`](Self::tick).
    pub fn start<F: Fiber + 'buf>(&mut self, fiber: F) -> FiberResult<()> {
        if self.root_tick.is_some() {
            return Err(FiberError::StackInUse);
        }
        check_frame_align::<F>();
        let len = frame_size::<F>();
        if len > self.capacity {
            return Err(FiberError::StackOverflow {
                needed: len,
                capacity: self.capacity,
            });
        }
        // SAFETY: the stack is idle, len <= capacity and the buffer
        // base carries FRAME_ALIGN, so offset 0 is in bounds and
        // aligned for F.
        unsafe { ptr::write(self.frame_ptr::<F>(0), fiber) };
        self.size = len;
        self.root_tick = Some(run_root::<F>);
        self.note_peak();
        crate::ftrace!(
            "root started: {} byte record on a {} byte stack",
            len,
            self.capacity
        );
        Ok(())
    }

    /// Advance the fiber chain by `delta` seconds of budget.
    ///
    /// Returns true while the root fiber remains live, false once it
    /// completed or when the stack is idle.
    pub fn tick(&mut self, delta: f32) -> bool {
        let root = match self.root_tick {
            Some(f) => f,
            None => return false,
        };
        let mut dt = TimeBudget::new(delta);
        root(self, &mut dt).is_pending()
    }

    /// Cooperatively unwind the stack.
    ///
    /// Drives one final zero-budget tick with
    /// [`is_aborting`](Self::is_aborting) raised. Every suspended fiber
    /// observes the flag, completes without starting new work, and is
    /// dropped in place from the innermost record outward. Idle stacks
    /// are left untouched.
    ///
    /// Without the `safe-abort` feature this is
    /// [`force_abort`](Self::force_abort).
    pub fn abort(&mut self) {
        #[cfg(feature = "safe-abort")]
        {
            if self.root_tick.is_none() {
                return;
            }
            crate::ftrace!("abort: unwinding {} bytes", self.size);
            self.aborting = true;
            self.tick(0.0);
            self.aborting = false;
            if self.root_tick.is_some() {
                crate::fassert_log!(false, "a fiber started new work during an abort tick");
                crate::fwarn!("fiber kept running through an abort tick, forcing");
                self.force_abort();
            }
        }
        #[cfg(not(feature = "safe-abort"))]
        self.force_abort();
    }

    /// Discard all fiber state without running any fiber code.
    ///
    /// Constant time and safe to call from fatal paths. Records are not
    /// dropped; anything they own is leaked.
    pub fn force_abort(&mut self) {
        if self.size > 0 {
            crate::ftrace!("force abort: discarding {} bytes", self.size);
        }
        self.root_tick = None;
        self.size = 0;
    }

    // ------------------------------------------------------------------
    // Dispatch interface for fiber bodies (used by fiber_body!, not
    // meant to be called directly)
    // ------------------------------------------------------------------

    /// Construct a callee record at the top of the stack.
    ///
    /// Overflow is fatal here: a body in mid-flight has no error
    /// channel, and the contract makes the host responsible for sizing
    /// the stack.
    #[doc(hidden)]
    pub fn _push_frame<F: Fiber + 'buf>(&mut self, fiber: F) {
        check_frame_align::<F>();
        let len = frame_size::<F>();
        if self.size + len > self.capacity {
            crate::ffatal!(
                "fiber stack overflow by {} bytes",
                self.size + len - self.capacity
            );
        }
        // SAFETY: bounds checked above; size is a multiple of
        // FRAME_ALIGN and the base is aligned, so the slot is aligned
        // for F and does not overlap any live record.
        unsafe { ptr::write(self.frame_ptr::<F>(self.size), fiber) };
        self.size += len;
        self.note_peak();
    }

    /// Tick the record of type `F` at `frame_pos`, popping it on
    /// completion.
    #[doc(hidden)]
    pub fn _tick_frame<F: Fiber>(&mut self, frame_pos: usize, dt: &mut TimeBudget) -> FiberPoll {
        let frame = self.frame_ptr::<F>(frame_pos);
        let callee_pos = frame_pos + frame_size::<F>();
        // SAFETY: a live F record sits at frame_pos; the reference does
        // not overlap the stack header, and nested pushes write only
        // above callee_pos.
        let poll = unsafe { (*frame).tick(self, callee_pos, dt) };
        if poll.is_pending() {
            return FiberPoll::Pending;
        }
        crate::fassert_log!(
            self.size == callee_pos,
            "fiber completed with live callees above it"
        );
        self.size = frame_pos;
        // SAFETY: the record is initialized and no longer reachable
        // from the stack.
        unsafe { ptr::drop_in_place(frame) };
        FiberPoll::Complete
    }

    #[inline]
    fn frame_ptr<F>(&self, pos: usize) -> *mut F {
        // SAFETY: callers keep pos within capacity.
        unsafe { self.buf.as_ptr().add(pos) as *mut F }
    }

    #[inline]
    fn note_peak(&mut self) {
        #[cfg(feature = "mem-track")]
        {
            self.peak_size = self.peak_size.max(self.size);
        }
    }
}

/// Trampoline recorded by `start`, specialized per root fiber type.
fn run_root<F: Fiber>(stack: &mut FiberStack<'_>, dt: &mut TimeBudget) -> FiberPoll {
    let poll = stack._tick_frame::<F>(0, dt);
    if poll.is_complete() {
        stack.root_tick = None;
    }
    poll
}

fn check_frame_align<F>() {
    if mem::align_of::<F>() > FRAME_ALIGN {
        crate::ffatal!(
            "fiber state alignment {} exceeds frame alignment {}",
            mem::align_of::<F>(),
            FRAME_ALIGN
        );
    }
}

impl Drop for FiberStack<'_> {
    fn drop(&mut self) {
        if self.is_running() {
            if std::thread::panicking() {
                // Running fiber code during an unwind risks a double
                // panic; leak the frames instead.
                self.force_abort();
            } else {
                crate::fassert_log!(
                    false,
                    "destroying stack while a fiber is running ({} bytes live)",
                    self.size
                );
                self.abort();
            }
        }
        if let BufferOwner::Owned = self.owner {
            // SAFETY: allocated in new() with the same layout.
            unsafe { alloc::dealloc(self.buf.as_ptr(), buffer_layout(self.capacity)) };
        }
    }
}

impl fmt::Debug for FiberStack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberStack")
            .field("capacity", &self.capacity)
            .field("size", &self.size)
            .field("running", &self.is_running())
            .field("aborting", &self.is_aborting())
            .finish()
    }
}
