//! Process-wide crash traps.
//!
//! [`arm`] installs a panic hook and handlers for six fatal signals
//! (SIGABRT, SIGILL, SIGSEGV, SIGFPE, SIGBUS, SIGPIPE). Either trap
//! converts the occurrence into a [`FaultEvent`] and drives it through
//! the [`FaultPipeline`]: build report, persist, notify. The trap is
//! install-once: there is no disarm, and arming again is a no-op.
//!
//! The signal handler runs in a compromised context where only a small
//! set of libc calls is formally async-signal-safe. This implementation
//! knowingly formats and writes files from that context: the handler has
//! already reset the signal to its default disposition and re-raises it
//! on the way out, so the process is terminating regardless and a second
//! fault inside the handler terminates instead of recursing. A stricter
//! variant would capture into preallocated buffers and drain outside the
//! interrupted context.

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info};

use crate::fault::{capture_call_stack, signal_name, FaultEvent};
use crate::notify::Notifier;
use crate::report::CrashReport;
use crate::sink::ReportSink;

/// The signals the trap claims. Last registration wins per OS signal
/// table semantics, so arming replaces any previously installed handler.
#[cfg(unix)]
const FATAL_SIGNALS: [i32; 6] = [
    libc::SIGABRT,
    libc::SIGILL,
    libc::SIGSEGV,
    libc::SIGFPE,
    libc::SIGBUS,
    libc::SIGPIPE,
];

static PIPELINE: RwLock<Option<FaultPipeline>> = RwLock::new(None);
static ARMED: AtomicBool = AtomicBool::new(false);

/// Runs one fault to completion: build, persist, notify, in that order,
/// so the notification always reflects the just-persisted report.
pub struct FaultPipeline {
    sink: Arc<ReportSink>,
    notifier: Arc<dyn Notifier>,
    summary_lines: usize,
}

impl FaultPipeline {
    pub fn new(sink: Arc<ReportSink>, notifier: Arc<dyn Notifier>, summary_lines: usize) -> Self {
        Self {
            sink,
            notifier,
            summary_lines,
        }
    }

    /// Handles a fault. Infallible: persistence and notification failures
    /// are logged and swallowed, never raised back into the fault path.
    pub fn handle(&self, event: FaultEvent) {
        let report = CrashReport::build(event);
        self.sink.persist(&report);

        let summary = report.summary_lines(self.summary_lines);
        if let Err(err) = self.notifier.notify(&summary, &report.render()) {
            error!(%err, "crash notification failed");
        }
    }
}

/// Arms the process-wide crash traps with the given pipeline.
///
/// Idempotent: the first call installs the hook and signal handlers and
/// keeps its pipeline for the process lifetime; later calls are no-ops,
/// so one handler fires per fault, never two. Signal registration
/// failures are logged and the remaining signals are still attempted.
/// There is no disarm.
pub fn arm(pipeline: FaultPipeline) {
    {
        let mut slot = PIPELINE.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(pipeline);
        } else {
            debug!("crash traps already hold a pipeline; keeping the original");
        }
    }

    if ARMED.swap(true, Ordering::SeqCst) {
        return;
    }

    install_panic_hook();
    #[cfg(unix)]
    install_signal_handlers();

    info!("crash monitoring armed");
}

/// Swaps the installed pipeline regardless of arming state, so tests can
/// observe the hook with their own sink and notifier.
#[cfg(test)]
pub(crate) fn force_pipeline(pipeline: FaultPipeline) {
    *PIPELINE.write().unwrap_or_else(PoisonError::into_inner) = Some(pipeline);
}

/// Runs the installed pipeline for one fault, if any is installed.
fn dispatch(event: FaultEvent) {
    let slot = PIPELINE.read().unwrap_or_else(PoisonError::into_inner);
    if let Some(pipeline) = slot.as_ref() {
        pipeline.handle(event);
    }
}

/// Replaces the panic hook with one that reports the panic through the
/// pipeline, then chains to the previous hook so standard stderr
/// reporting still happens.
fn install_panic_hook() {
    let previous = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let reason = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned());

        let mut call_stack = capture_call_stack();
        if let Some(location) = info.location() {
            call_stack.insert(
                0,
                format!("{}:{}:{}", location.file(), location.line(), location.column()),
            );
        }

        dispatch(FaultEvent::exception(reason, call_stack));

        previous(info);
    }));
}

#[cfg(unix)]
fn install_signal_handlers() {
    for signal in FATAL_SIGNALS {
        let previous = unsafe { libc::signal(signal, fatal_signal_handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            error!(
                signal = signal_name(signal),
                "failed to register signal handler"
            );
        }
    }
}

/// Handler for fatal signals. Receives only the signal number; no other
/// context from the interrupted thread may be assumed valid.
#[cfg(unix)]
extern "C" fn fatal_signal_handler(signal: libc::c_int) {
    // Restore the default disposition first: a fault inside this handler
    // must terminate the process, not re-enter it.
    unsafe {
        libc::signal(signal, libc::SIG_DFL);
    }

    dispatch(FaultEvent::signal(signal, capture_call_stack()));

    // Hand the signal back to the default disposition.
    unsafe {
        libc::raise(signal);
    }
}
