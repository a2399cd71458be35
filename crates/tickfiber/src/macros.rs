//! The fiber body macro
//!
//! `fiber_body!` turns a straight-line body with labeled suspension
//! sites into the resume-point dispatch the [`Fiber`](crate::Fiber)
//! protocol requires: jump to the site recorded in the resume point,
//! push the callee record once (guarded by the stack size), dispatch
//! it, propagate suspension upward and fall through on completion.

/// Expand a straight-line fiber body with suspension sites.
///
/// Written inside [`Fiber::tick`](crate::Fiber::tick); evaluates to the
/// [`FiberPoll`](crate::FiberPoll) the tick returns.
///
/// # Form
///
/// ```ignore
/// fiber_body!((self.rp, fs, pos, dt) {
///     run { /* straight-line code, runs on the first tick */ }
///     site 1: sleep(0.5);
///     run { /* runs after the sleep elapses */ }
///     site 2: Walk => Walk::new(self.target);
///     run { /* runs after Walk completes */ }
/// })
/// ```
///
/// The header names, in order: the body's [`ResumePoint`](crate::ResumePoint)
/// field, and the `stack`, `stack_pos` and `dt` parameters of `tick`.
///
/// - `site N: Callee => ctor;` suspends on a nested fiber of type
///   `Callee`, constructed from `ctor` the first time the site is
///   reached. `site N: sleep(secs);` is shorthand for a nested
///   [`Sleep`](crate::Sleep).
/// - Site tags are integer literals, unique within the body, strictly
///   increasing and starting at 1. Tag 0 is the entry point.
/// - `run { ... }` blocks execute within a single tick and may use any
///   of the fiber's fields. Locals do not survive a suspension; state
///   that must survive lives in the fiber itself.
/// - Bodies are linear. A fiber that wants to loop over suspension
///   sites implements `Fiber::tick` by hand on top of the same
///   dispatch calls this macro expands to.
///
/// When the stack is aborting, the body finishes right after the
/// current site's dispatch returns and no further sites run.
#[macro_export]
macro_rules! fiber_body {
    (($rp:expr, $fs:ident, $pos:ident, $dt:ident) { $($body:tt)* }) => {{
        let __tickfiber_rp: u32 = $rp.get();
        $crate::__fiber_body!(@entry ($rp, $fs, $pos, $dt, __tickfiber_rp) [] $($body)*)
    }};
}

/// Internal helper for fiber_body! expansion.
#[doc(hidden)]
#[macro_export]
macro_rules! __fiber_body {
    // ── Entry code, before the first site ─────────────────────
    (@entry $ctx:tt [$($acc:tt)*] run { $($c:tt)* } $($rest:tt)*) => {
        $crate::__fiber_body!(@entry $ctx [$($acc)* $($c)*] $($rest)*)
    };

    // Body with no sites: run once, complete.
    (@entry ($rp:expr, $fs:ident, $pos:ident, $dt:ident, $cur:ident) [$($acc:tt)*]) => {{
        let _ = (&$fs, $pos, &$dt);
        if $cur == $crate::ResumePoint::ENTRY.get() {
            $($acc)*
        }
        $crate::FiberPoll::Complete
    }};

    (@entry ($rp:expr, $fs:ident, $pos:ident, $dt:ident, $cur:ident) [$($acc:tt)*] site $($rest:tt)*) => {{
        if $cur == $crate::ResumePoint::ENTRY.get() {
            $($acc)*
        }
        $crate::__fiber_body!(@site ($rp, $fs, $pos, $dt, $cur) site $($rest)*)
    }};

    // ── Site headers ──────────────────────────────────────────
    // Sleep shorthand rewrites into the general nested-call form.
    (@site $ctx:tt site $tag:literal : sleep($secs:expr); $($rest:tt)*) => {
        $crate::__fiber_body!(@site $ctx site $tag : $crate::Sleep => $crate::Sleep::new($secs); $($rest)*)
    };

    (@site $ctx:tt site $tag:literal : $ty:ty => $ctor:expr; $($rest:tt)*) => {
        $crate::__fiber_body!(@after $ctx ($tag ; $ty ; $ctor) [] $($rest)*)
    };

    // ── Code following a site ─────────────────────────────────
    (@after $ctx:tt $site:tt [$($acc:tt)*] run { $($c:tt)* } $($rest:tt)*) => {
        $crate::__fiber_body!(@after $ctx $site [$($acc)* $($c)*] $($rest)*)
    };

    // Last site of the body.
    (@after ($rp:expr, $fs:ident, $pos:ident, $dt:ident, $cur:ident)
            ($tag:literal ; $ty:ty ; $ctor:expr) [$($acc:tt)*]) => {{
        if $cur <= $tag {
            if $fs.size() == $pos {
                $rp.set($tag);
                $fs._push_frame::<$ty>($ctor);
            }
            if $fs._tick_frame::<$ty>($pos, $dt).is_pending() {
                return $crate::FiberPoll::Pending;
            }
            if $fs.is_aborting() {
                return $crate::FiberPoll::Complete;
            }
            $($acc)*
        }
        $crate::FiberPoll::Complete
    }};

    // A further site follows.
    (@after ($rp:expr, $fs:ident, $pos:ident, $dt:ident, $cur:ident)
            ($tag:literal ; $ty:ty ; $ctor:expr) [$($acc:tt)*] site $($rest:tt)*) => {{
        if $cur <= $tag {
            if $fs.size() == $pos {
                $rp.set($tag);
                $fs._push_frame::<$ty>($ctor);
            }
            if $fs._tick_frame::<$ty>($pos, $dt).is_pending() {
                return $crate::FiberPoll::Pending;
            }
            if $fs.is_aborting() {
                return $crate::FiberPoll::Complete;
            }
            $($acc)*
        }
        $crate::__fiber_body!(@site ($rp, $fs, $pos, $dt, $cur) site $($rest)*)
    }};
}

#[cfg(test)]
mod tests {
    use crate::{Fiber, FiberPoll, FiberStack, ResumePoint, TimeBudget};

    struct Pulse {
        rp: ResumePoint,
        edges: u32,
    }

    impl Fiber for Pulse {
        fn tick(&mut self, fs: &mut FiberStack<'_>, pos: usize, dt: &mut TimeBudget) -> FiberPoll {
            fiber_body!((self.rp, fs, pos, dt) {
                run { self.edges += 1; }
                site 1: sleep(0.2);
                run { self.edges += 1; }
                site 2: sleep(0.2);
                run { self.edges += 1; }
            })
        }
    }

    struct NoSites {
        ticks: u32,
    }

    impl Fiber for NoSites {
        fn tick(&mut self, fs: &mut FiberStack<'_>, pos: usize, dt: &mut TimeBudget) -> FiberPoll {
            let rp = ResumePoint::ENTRY;
            fiber_body!((rp, fs, pos, dt) {
                run { self.ticks += 1; }
            })
        }
    }

    #[test]
    fn test_body_suspends_and_resumes() {
        let mut fs = FiberStack::new(64);
        fs.start(Pulse {
            rp: ResumePoint::ENTRY,
            edges: 0,
        })
        .unwrap();

        assert!(fs.tick(0.1)); // parked in site 1
        assert!(fs.tick(0.2)); // site 1 done, parked in site 2
        assert!(!fs.tick(0.2)); // chain done
        assert!(!fs.is_running());
    }

    #[test]
    fn test_body_completes_in_one_tick() {
        let mut fs = FiberStack::new(64);
        fs.start(Pulse {
            rp: ResumePoint::ENTRY,
            edges: 0,
        })
        .unwrap();
        assert!(!fs.tick(1.0));
    }

    #[test]
    fn test_body_without_sites() {
        let mut fs = FiberStack::new(64);
        fs.start(NoSites { ticks: 0 }).unwrap();
        assert!(!fs.tick(0.0));
    }
}
