//! Notification boundary.
//!
//! The pipeline hands a short summary plus the full report to a
//! [`Notifier`] after persisting. How the notification is displayed is
//! the embedder's business: a desktop notification center, a status
//! bar, a message bus. The pipeline tolerates delivery failing and never
//! waits on user interaction.

use thiserror::Error;
use tracing::{info, warn};

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Surfaces a crash summary to the user.
///
/// Implementations must not block waiting for interaction with the
/// notification; delivery may complete asynchronously after `notify`
/// returns.
pub trait Notifier: Send + Sync {
    /// Asks the host for permission to display notifications.
    /// Fire-and-forget: the outcome is logged, not returned.
    fn request_permission(&self);

    /// Displays `summary`, carrying `full_report` as the payload so a
    /// report viewer can open the complete log from the notification.
    fn notify(&self, summary: &str, full_report: &str) -> Result<(), NotifyError>;
}

/// Default notifier that surfaces summaries through the log stream.
///
/// Useful for headless embedders and tests; applications with a real
/// notification facility supply their own [`Notifier`].
#[derive(Debug)]
pub struct LogNotifier {
    app_name: String,
}

impl LogNotifier {
    pub fn named(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::named("The App")
    }
}

impl Notifier for LogNotifier {
    fn request_permission(&self) {
        info!("log notifier requires no notification permission");
    }

    fn notify(&self, summary: &str, _full_report: &str) -> Result<(), NotifyError> {
        warn!(app = %self.app_name, "{} has crashed\n{summary}", self.app_name);
        Ok(())
    }
}

/// Records every notification for pipeline-order assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    notifications: std::sync::Mutex<Vec<(String, String)>>,
    fail_delivery: bool,
}

#[cfg(test)]
impl RecordingNotifier {
    /// A recorder whose `notify` also returns a delivery error.
    pub(crate) fn failing() -> Self {
        Self {
            fail_delivery: true,
            ..Self::default()
        }
    }

    pub(crate) fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn request_permission(&self) {}

    fn notify(&self, summary: &str, full_report: &str) -> Result<(), NotifyError> {
        self.notifications
            .lock()
            .unwrap()
            .push((summary.to_string(), full_report.to_string()));
        if self.fail_delivery {
            return Err(NotifyError::Delivery("recorder set to fail".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_notifier_always_delivers() {
        let notifier = LogNotifier::default();

        assert!(notifier.notify("summary", "full").is_ok());
    }

    #[test]
    fn recorder_captures_summary_and_payload() {
        let recorder = RecordingNotifier::default();
        recorder.notify("short", "long").unwrap();

        assert_eq!(
            recorder.notifications(),
            vec![("short".to_string(), "long".to_string())]
        );
    }
}
