//! Fault events captured by the crash traps.
//!
//! A fault is an abnormal-termination trigger: either an uncaught panic
//! or a fatal OS signal. Both carry the call stack observed at trap time,
//! innermost frame first, in capture order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frame substituted when the runtime cannot produce a backtrace.
const TRAP_FRAME: &str = "<stack capture unavailable>";

/// A captured fault. Exactly one variant describes each occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultEvent {
    /// An uncaught panic. `reason` is the panic payload when it carried
    /// a string, `None` for non-string payloads.
    Exception {
        reason: Option<String>,
        call_stack: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// A fatal OS signal, identified by its number.
    Signal {
        signal: i32,
        call_stack: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl FaultEvent {
    /// Creates an exception fault stamped with the current time.
    pub fn exception(reason: Option<String>, call_stack: Vec<String>) -> Self {
        Self::Exception {
            reason,
            call_stack,
            timestamp: Utc::now(),
        }
    }

    /// Creates a signal fault stamped with the current time.
    pub fn signal(signal: i32, call_stack: Vec<String>) -> Self {
        Self::Signal {
            signal,
            call_stack,
            timestamp: Utc::now(),
        }
    }

    /// The captured frames, innermost first.
    pub fn call_stack(&self) -> &[String] {
        match self {
            Self::Exception { call_stack, .. } | Self::Signal { call_stack, .. } => call_stack,
        }
    }

    /// When the fault was trapped.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Exception { timestamp, .. } | Self::Signal { timestamp, .. } => *timestamp,
        }
    }
}

/// Captures the current call stack as one rendered line per frame.
///
/// Frames come back innermost first and are never re-sorted. The result
/// is never empty: if the backtrace machinery produces nothing (stripped
/// binaries, unsupported platforms) a single synthetic trap frame stands
/// in, so downstream report building always has a location to show.
pub fn capture_call_stack() -> Vec<String> {
    let rendered = std::backtrace::Backtrace::force_capture().to_string();
    let frames: Vec<String> = rendered
        .lines()
        .map(|line| line.trim_end().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if frames.is_empty() {
        vec![TRAP_FRAME.to_string()]
    } else {
        frames
    }
}

/// Human-readable name for the fatal signals the trap registers.
pub fn signal_name(signal: i32) -> &'static str {
    match signal {
        libc::SIGABRT => "SIGABRT",
        libc::SIGILL => "SIGILL",
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGFPE => "SIGFPE",
        #[cfg(unix)]
        libc::SIGBUS => "SIGBUS",
        #[cfg(unix)]
        libc::SIGPIPE => "SIGPIPE",
        _ => "unknown",
    }
}
