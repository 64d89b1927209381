//! Monitor orchestration.
//!
//! [`CrashMonitor`] ties the pieces together: it owns the preference
//! store, the report sink, and the notifier, and exposes the entry
//! points collaborators call: start, arm, fetch the latest report,
//! request notification permission, and schedule a test crash.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::fault::{capture_call_stack, FaultEvent};
use crate::notify::Notifier;
use crate::prefs::{MonitoringConfig, PreferenceStore};
use crate::report::CrashReport;
use crate::sink::ReportSink;
use crate::trap::{self, FaultPipeline};

/// Monitor settings. Timing and layout values are parameters here, not
/// constants; products disagree on them.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directory crash logs are written to.
    pub report_dir: PathBuf,
    /// Path of the persisted preference file.
    pub preference_path: PathBuf,
    /// How many report lines the notification summary carries.
    pub summary_lines: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("crash-reports"),
            preference_path: PathBuf::from("crash-prefs.json"),
            summary_lines: 5,
        }
    }
}

/// Process-wide crash monitor.
///
/// Construct once at startup, before any fault can occur, and keep it
/// for the process lifetime; there is no teardown. The consent UI is an
/// external collaborator: it reads and persists the flags through
/// [`preferences`](Self::preferences) and calls
/// [`arm_monitoring`](Self::arm_monitoring) when the user opts in.
pub struct CrashMonitor {
    config: MonitorConfig,
    prefs: PreferenceStore,
    sink: Arc<ReportSink>,
    notifier: Arc<dyn Notifier>,
}

impl CrashMonitor {
    /// Creates the monitor, creating the report directory if needed.
    pub fn new(config: MonitorConfig, notifier: Arc<dyn Notifier>) -> io::Result<Self> {
        let sink = Arc::new(ReportSink::new(&config.report_dir)?);
        let prefs = PreferenceStore::new(config.preference_path.clone());
        Ok(Self {
            config,
            prefs,
            sink,
            notifier,
        })
    }

    /// Startup entry point: requests notification permission and arms
    /// the traps iff the persisted preference says monitoring is on.
    /// Returns whether the traps were armed.
    pub fn start(&self) -> bool {
        self.notifier.request_permission();

        let flags = self.prefs.load().unwrap_or_else(|err| {
            warn!(%err, "unreadable preferences, falling back to defaults");
            MonitoringConfig::default()
        });

        if flags.enabled {
            self.arm();
            true
        } else {
            info!("crash monitoring disabled by preference");
            false
        }
    }

    /// Persists `enabled = true` and arms the traps. Called by the
    /// consent flow when the user opts in.
    pub fn arm_monitoring(&self) {
        let mut flags = self.prefs.load().unwrap_or_default();
        flags.enabled = true;
        flags.welcome_shown = true;
        if let Err(err) = self.prefs.save(&flags) {
            warn!(%err, "failed to persist monitoring preference");
        }
        self.arm();
    }

    /// The most recent crash report, `None` before the first fault.
    /// Read by the report-viewing collaborator.
    pub fn latest_report(&self) -> Option<CrashReport> {
        self.sink.latest()
    }

    /// The preference store backing the consent flags.
    pub fn preferences(&self) -> &PreferenceStore {
        &self.prefs
    }

    /// Asks the notifier for display permission.
    pub fn request_notification_permission(&self) {
        self.notifier.request_permission();
    }

    /// Schedules a crash for testing the pipeline end to end.
    ///
    /// On a spawned thread, after `delay`: when `synthesize_report` is
    /// set, a synthetic exception fault with `reason` is driven through
    /// the full pipeline first (report built, persisted, notified); then
    /// the thread panics with `reason`, which the armed hook reports as
    /// a real fault. Joining the returned handle yields `Err` from that
    /// panic.
    pub fn test_crash(
        &self,
        delay: Duration,
        reason: &str,
        synthesize_report: bool,
    ) -> JoinHandle<()> {
        let pipeline = self.pipeline();
        let reason = reason.to_string();

        thread::spawn(move || {
            thread::sleep(delay);
            if synthesize_report {
                pipeline.handle(FaultEvent::exception(
                    Some(reason.clone()),
                    capture_call_stack(),
                ));
            }
            panic!("{reason}");
        })
    }

    fn arm(&self) {
        trap::arm(self.pipeline());
    }

    fn pipeline(&self) -> FaultPipeline {
        FaultPipeline::new(
            Arc::clone(&self.sink),
            Arc::clone(&self.notifier),
            self.config.summary_lines,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;

    fn monitor_in(dir: &std::path::Path) -> (CrashMonitor, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let config = MonitorConfig {
            report_dir: dir.join("reports"),
            preference_path: dir.join("prefs.json"),
            summary_lines: 5,
        };
        let monitor = CrashMonitor::new(config, Arc::clone(&notifier) as Arc<dyn Notifier>)
            .unwrap();
        (monitor, notifier)
    }

    #[test]
    fn start_does_not_arm_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, _) = monitor_in(dir.path());

        assert!(!monitor.start());
        assert!(monitor.latest_report().is_none());
    }

    #[test]
    fn arm_monitoring_persists_the_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, _) = monitor_in(dir.path());

        monitor.arm_monitoring();

        let flags = monitor.preferences().load().unwrap();
        assert!(flags.enabled);
        assert!(flags.welcome_shown);
    }

    #[test]
    fn test_crash_drives_the_full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, notifier) = monitor_in(dir.path());

        let handle = monitor.test_crash(
            Duration::from_millis(10),
            "synthetic drill fault",
            true,
        );
        assert!(handle.join().is_err());

        let latest = monitor.latest_report().unwrap();
        assert!(latest
            .human_summary
            .contains("Crash Reason: synthetic drill fault"));

        let notifications = notifier.notifications();
        assert!(notifications
            .iter()
            .any(|(summary, _)| summary.contains("synthetic drill fault")));
    }

    #[test]
    fn test_crash_without_synthesis_only_panics() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, notifier) = monitor_in(dir.path());

        let handle = monitor.test_crash(Duration::from_millis(1), "silent drill", false);
        assert!(handle.join().is_err());

        // Nothing went through this monitor's pipeline.
        assert!(notifier.notifications().is_empty());
    }
}
