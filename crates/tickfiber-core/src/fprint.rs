//! Stack diagnostics
//!
//! Leveled prints on locked stderr, plus the contract-check macros the
//! stack uses for fatal diagnostics. The whole configuration lives in
//! one packed byte (level bits, flush bit, init bit) filled from the
//! environment the first time anything prints:
//!
//! - `TFB_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace (or 0-5)
//! - `TFB_FLUSH_EPRINT=1` - flush stderr after every line (crash debugging)
//!
//! The stack itself logs at two levels: trace lines for lifecycle
//! events (root start, abort, forced abort), and warn/error lines when
//! a contract is violated. Trace is meant for single-stepping one
//! misbehaving stack, not for steady-state hosts.
//!
//! Building without the `logs` feature strips every print; the macros
//! stay available and expand to nothing. Contract checks are active
//! only under the `asserts` feature.

#[cfg(feature = "logs")]
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

/// Whether `fassert!`/`fassert_log!` checks are compiled in.
pub const ASSERTS_ENABLED: bool = cfg!(feature = "asserts");

/// Log levels, lowest to most verbose
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse a level name or digit, as accepted by `TFB_LOG_LEVEL`.
    pub fn parse(s: &str) -> Option<LogLevel> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "warning" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            "trace" | "5" => LogLevel::Trace,
            _ => return None,
        };
        Some(level)
    }

    fn label(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// Packed configuration word. Zero means "never touched": the first
// reader fills it from the environment.
const LEVEL_MASK: u8 = 0b0000_0111;
const FLUSH_BIT: u8 = 0b0100_0000;
const INIT_BIT: u8 = 0b1000_0000;

static CONFIG: AtomicU8 = AtomicU8::new(0);

fn level_from_bits(bits: u8) -> LogLevel {
    match bits & LEVEL_MASK {
        0 => LogLevel::Off,
        1 => LogLevel::Error,
        2 => LogLevel::Warn,
        3 => LogLevel::Info,
        4 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

fn load_config() -> u8 {
    let cfg = CONFIG.load(Ordering::Relaxed);
    if cfg & INIT_BIT != 0 {
        return cfg;
    }
    init_from_env()
}

fn init_from_env() -> u8 {
    let mut cfg = INIT_BIT | LogLevel::Info as u8;
    if let Ok(val) = std::env::var("TFB_LOG_LEVEL") {
        if let Some(level) = LogLevel::parse(&val) {
            cfg = (cfg & !LEVEL_MASK) | level as u8;
        }
    }
    if let Ok(val) = std::env::var("TFB_FLUSH_EPRINT") {
        if matches!(val.as_str(), "1" | "true" | "yes" | "on") {
            cfg |= FLUSH_BIT;
        }
    }
    // A programmatic setter that ran first wins.
    match CONFIG.compare_exchange(0, cfg, Ordering::Relaxed, Ordering::Relaxed) {
        Ok(_) => cfg,
        Err(current) => current,
    }
}

/// Read the diagnostic configuration from the environment.
///
/// Happens lazily on the first print; hosts that want deterministic
/// startup call it explicitly.
pub fn init() {
    load_config();
}

/// Current log level
#[inline]
pub fn log_level() -> LogLevel {
    level_from_bits(load_config())
}

/// Set the log level programmatically
pub fn set_log_level(level: LogLevel) {
    let _ = CONFIG.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cfg| {
        Some(INIT_BIT | (cfg & FLUSH_BIT) | level as u8)
    });
}

/// Set the flush-per-line mode programmatically
pub fn set_flush_enabled(enabled: bool) {
    let _ = CONFIG.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cfg| {
        let base = if cfg & INIT_BIT != 0 {
            cfg
        } else {
            INIT_BIT | LogLevel::Info as u8
        };
        Some(if enabled {
            base | FLUSH_BIT
        } else {
            base & !FLUSH_BIT
        })
    });
}

/// Check whether a level would be printed
#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    (load_config() & LEVEL_MASK) >= level as u8
}

/// Single emit path behind all the print macros. `level` of `None` is
/// an unconditional raw print.
#[doc(hidden)]
pub fn _femit(level: Option<LogLevel>, newline: bool, args: std::fmt::Arguments<'_>) {
    #[cfg(feature = "logs")]
    {
        let cfg = load_config();
        if let Some(level) = level {
            if (cfg & LEVEL_MASK) < level as u8 {
                return;
            }
        }
        let stderr = std::io::stderr();
        let mut out = stderr.lock();
        if let Some(level) = level {
            let _ = write!(out, "tfb {}: ", level.label());
        }
        let _ = out.write_fmt(args);
        if newline {
            let _ = out.write_all(b"\n");
        }
        if cfg & FLUSH_BIT != 0 {
            let _ = out.flush();
        }
    }
    #[cfg(not(feature = "logs"))]
    {
        let _ = (level, newline, args);
    }
}

// ============================================================================
// Print macros
// ============================================================================

/// Print to stderr, no newline, regardless of level
#[macro_export]
macro_rules! fprint {
    ($($arg:tt)*) => {{
        $crate::fprint::_femit(None, false, format_args!($($arg)*));
    }};
}

/// Print to stderr with newline, regardless of level
#[macro_export]
macro_rules! fprintln {
    () => {{
        $crate::fprint::_femit(None, true, format_args!(""));
    }};
    ($($arg:tt)*) => {{
        $crate::fprint::_femit(None, true, format_args!($($arg)*));
    }};
}

/// Error level log
#[macro_export]
macro_rules! ferror {
    ($($arg:tt)*) => {{
        $crate::fprint::_femit(
            Some($crate::fprint::LogLevel::Error),
            true,
            format_args!($($arg)*),
        );
    }};
}

/// Warning level log
#[macro_export]
macro_rules! fwarn {
    ($($arg:tt)*) => {{
        $crate::fprint::_femit(
            Some($crate::fprint::LogLevel::Warn),
            true,
            format_args!($($arg)*),
        );
    }};
}

/// Info level log
#[macro_export]
macro_rules! finfo {
    ($($arg:tt)*) => {{
        $crate::fprint::_femit(
            Some($crate::fprint::LogLevel::Info),
            true,
            format_args!($($arg)*),
        );
    }};
}

/// Debug level log
#[macro_export]
macro_rules! fdebug {
    ($($arg:tt)*) => {{
        $crate::fprint::_femit(
            Some($crate::fprint::LogLevel::Debug),
            true,
            format_args!($($arg)*),
        );
    }};
}

/// Trace level log, used for stack lifecycle lines
#[macro_export]
macro_rules! ftrace {
    ($($arg:tt)*) => {{
        $crate::fprint::_femit(
            Some($crate::fprint::LogLevel::Trace),
            true,
            format_args!($($arg)*),
        );
    }};
}

// ============================================================================
// Contract checks
// ============================================================================

/// Log an error and panic. For contract violations with no recovery path.
#[macro_export]
macro_rules! ffatal {
    ($($arg:tt)*) => {{
        $crate::ferror!($($arg)*);
        panic!($($arg)*);
    }};
}

/// Contract check, fatal when it fails; the diagnostic is the failed
/// condition itself.
///
/// Compiled in only under the `asserts` feature; otherwise the
/// condition is never evaluated.
#[macro_export]
macro_rules! fassert {
    ($cond:expr) => {{
        if $crate::fprint::ASSERTS_ENABLED && !($cond) {
            $crate::ffatal!("contract check failed: {}", stringify!($cond));
        }
    }};
}

/// Contract check with a custom diagnostic message.
///
/// Compiled in only under the `asserts` feature; otherwise neither the
/// condition nor the message is evaluated.
#[macro_export]
macro_rules! fassert_log {
    ($cond:expr, $($arg:tt)*) => {{
        if $crate::fprint::ASSERTS_ENABLED && !($cond) {
            $crate::ffatal!($($arg)*);
        }
    }};
}
