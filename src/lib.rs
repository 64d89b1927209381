//! Crashwatch - in-process crash capture and reporting
//!
//! Traps uncaught panics and fatal OS signals, turns them into
//! human-readable crash reports, persists each report to a time-stamped
//! log file, keeps the most recent report resident for quick retrieval,
//! and hands a short summary to a pluggable notifier.
//!
//! Consent UI and report viewing belong to the embedding application;
//! this crate owns the persisted consent flags and the latest-report
//! accessor those collaborators need.
//!
//! # Features
//!
//! - Panic hook and signal handlers (SIGABRT, SIGILL, SIGSEGV, SIGFPE,
//!   SIGBUS, SIGPIPE), install-once for the process lifetime
//! - Deterministic report building with placeholder degradation for
//!   missing reasons or empty stacks
//! - Atomic `CrashLog_<timestamp>.txt` persistence with collision-proof
//!   filenames
//! - Opt-in gating through a JSON-backed preference store
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crashwatch::{CrashMonitor, LogNotifier, MonitorConfig};
//!
//! fn main() {
//!     let monitor = CrashMonitor::new(
//!         MonitorConfig::default(),
//!         Arc::new(LogNotifier::named("MyApp")),
//!     )
//!     .expect("crash monitor setup");
//!     monitor.start();
//!
//!     // Your application code...
//! }
//! ```

pub mod fault;
pub mod monitor;
pub mod notify;
pub mod prefs;
pub mod report;
pub mod sink;
pub mod trap;

pub use fault::{capture_call_stack, signal_name, FaultEvent};
pub use monitor::{CrashMonitor, MonitorConfig};
pub use notify::{LogNotifier, Notifier, NotifyError};
pub use prefs::{MonitoringConfig, PreferenceStore, PrefsError};
pub use report::CrashReport;
pub use sink::{ReportSink, SinkError};
pub use trap::{arm, FaultPipeline};
