//! Crash report construction.
//!
//! Builds the human- and machine-readable report text from a captured
//! [`FaultEvent`]. Building is a pure transformation: no I/O, no shared
//! state, and no failure mode. Absent fields degrade to placeholder
//! text instead of erroring.
//!
//! # Report layout
//!
//! ```text
//! App Crash Log
//! ====================
//! Human Readable Section
//! ====================
//! Crash Reason: <reason>          (or "App received signal: <n>")
//! Crash Location: <first frame>
//! Crash Time: <timestamp>
//! ====================
//! Advanced Information
//! ====================
//! Call Stack:
//! <frames, innermost first>
//! ```

use serde::{Deserialize, Serialize};

use crate::fault::FaultEvent;

const SECTION_RULE: &str = "====================";
const UNKNOWN: &str = "Unknown";

/// A built crash report. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashReport {
    /// Header, reason, location, and time lines with section rules.
    pub human_summary: String,
    /// Every captured frame joined by newline, capture order preserved.
    pub full_stack_text: String,
    /// The fault this report was built from.
    pub source: FaultEvent,
}

impl CrashReport {
    /// Builds a report from a fault event.
    ///
    /// Total over all well-formed events: a missing reason or an empty
    /// call stack produces `Unknown` lines rather than an error.
    pub fn build(event: FaultEvent) -> Self {
        let reason_line = match &event {
            FaultEvent::Exception { reason, .. } => {
                format!("Crash Reason: {}", reason.as_deref().unwrap_or(UNKNOWN))
            }
            FaultEvent::Signal { signal, .. } => format!("App received signal: {signal}"),
        };

        let location = event
            .call_stack()
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN);

        let human_summary = format!(
            "App Crash Log\n\
             {SECTION_RULE}\n\
             Human Readable Section\n\
             {SECTION_RULE}\n\
             {reason_line}\n\
             Crash Location: {location}\n\
             Crash Time: {}",
            event.timestamp().to_rfc3339(),
        );

        let full_stack_text = event.call_stack().join("\n");

        Self {
            human_summary,
            full_stack_text,
            source: event,
        }
    }

    /// The full report text, exactly as persisted to disk.
    pub fn render(&self) -> String {
        format!(
            "{}\n\
             {SECTION_RULE}\n\
             Advanced Information\n\
             {SECTION_RULE}\n\
             Call Stack:\n\
             {}",
            self.human_summary, self.full_stack_text,
        )
    }

    /// The first `n` lines of the rendered report, for notification bodies.
    pub fn summary_lines(&self, n: usize) -> String {
        self.render()
            .lines()
            .take(n)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
