//! Crash report persistence.
//!
//! The sink owns two things: the on-disk crash log directory and the
//! in-memory latest-report slot. [`ReportSink::persist`] is called from
//! the fault path, so it never propagates an error. A failed disk write
//! is logged and the in-memory slot is still updated, because the
//! notification step reads only the slot.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error};

use crate::report::CrashReport;

/// Collision suffixes tried before giving up on a filename stamp.
const MAX_NAME_COLLISIONS: u32 = 100;

/// Errors from the file-writing half of the sink. Internal: `persist`
/// logs these rather than returning them.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write crash log: {0}")]
    Write(#[from] std::io::Error),

    #[error("no free crash log filename for stamp {0}")]
    NamesExhausted(String),
}

/// Persists crash reports and exposes the most recent one.
///
/// Process-wide: construct once at startup, before any fault can occur,
/// and keep it alive for the process lifetime. The latest-report slot is
/// last-write-wins; overlapping faults racing on it is an accepted race
/// (both processes of events end in termination).
pub struct ReportSink {
    dir: PathBuf,
    latest: Mutex<Option<CrashReport>>,
}

impl ReportSink {
    /// Creates a sink writing into `dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            latest: Mutex::new(None),
        })
    }

    /// The crash log directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists a report: updates the latest-report slot, then writes
    /// `CrashLog_<timestamp>.txt`.
    ///
    /// The slot is updated first so a failed write never costs the
    /// notification its report. I/O failures are logged and swallowed;
    /// nothing here may raise a new fault on the fault path.
    pub fn persist(&self, report: &CrashReport) {
        {
            let mut slot = self
                .latest
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *slot = Some(report.clone());
        }

        match self.write_log_file(report) {
            Ok(path) => debug!(path = %path.display(), "crash log saved"),
            Err(err) => error!(%err, "failed to save crash log"),
        }
    }

    /// The most recently persisted report, `None` before the first fault.
    pub fn latest(&self) -> Option<CrashReport> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Writes the rendered report atomically: the content goes to a temp
    /// file in the same directory, then is linked into place, so a reader
    /// never observes a half-written log. On a name collision (two faults
    /// inside one timestamp tick) a numeric suffix is appended.
    fn write_log_file(&self, report: &CrashReport) -> Result<PathBuf, SinkError> {
        let stamp = report
            .source
            .timestamp()
            .format("%Y%m%d_%H%M%S%.3f")
            .to_string();

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(report.render().as_bytes())?;
        tmp.as_file().sync_all()?;

        for counter in 0..MAX_NAME_COLLISIONS {
            let name = if counter == 0 {
                format!("CrashLog_{stamp}.txt")
            } else {
                format!("CrashLog_{stamp}_{counter}.txt")
            };
            let target = self.dir.join(name);

            match tmp.persist_noclobber(&target) {
                Ok(_) => return Ok(target),
                Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    tmp = err.file;
                }
                Err(err) => return Err(SinkError::Write(err.error)),
            }
        }

        Err(SinkError::NamesExhausted(stamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultEvent;
    use chrono::{TimeZone, Utc};

    fn signal_report(signal: i32, frames: &[&str]) -> CrashReport {
        CrashReport::build(FaultEvent::Signal {
            signal,
            call_stack: frames.iter().map(|f| f.to_string()).collect(),
            timestamp: Utc.with_ymd_and_hms(2024, 11, 28, 12, 0, 0).unwrap(),
        })
    }

    fn log_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("CrashLog_"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn latest_is_empty_before_first_fault() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ReportSink::new(dir.path()).unwrap();

        assert!(sink.latest().is_none());
    }

    #[test]
    fn persisted_file_matches_rendered_report() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ReportSink::new(dir.path()).unwrap();
        let report = signal_report(6, &["frame0", "frame1"]);

        sink.persist(&report);

        let files = log_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".txt"));

        let content = fs::read_to_string(dir.path().join(&files[0])).unwrap();
        assert!(content.starts_with("App Crash Log"));
        assert!(content.contains("App received signal: 6"));
        assert!(content.contains("frame0\nframe1"));
        assert_eq!(content, report.render());

        let latest = sink.latest().unwrap();
        assert!(latest.human_summary.contains("App received signal: 6"));
    }

    #[test]
    fn quick_succession_produces_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ReportSink::new(dir.path()).unwrap();

        // Identical timestamps force the collision-suffix path.
        sink.persist(&signal_report(6, &["first"]));
        sink.persist(&signal_report(11, &["second"]));

        assert_eq!(log_files(dir.path()).len(), 2);
        let latest = sink.latest().unwrap();
        assert!(latest.human_summary.contains("App received signal: 11"));
    }

    #[test]
    fn failed_write_still_updates_latest() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ReportSink::new(dir.path()).unwrap();

        // Pull the directory out from under the sink to simulate an I/O
        // failure on the fault path.
        fs::remove_dir_all(dir.path()).unwrap();

        let report = signal_report(6, &["frame0"]);
        sink.persist(&report);

        let latest = sink.latest().unwrap();
        assert_eq!(latest.full_stack_text, "frame0");
    }
}
