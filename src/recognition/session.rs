//! Recognition session adapter
//!
//! Wraps a [`SpeechCapture`] backend so the interaction states see one
//! start/stop cycle at a time and at most one terminal outcome per cycle,
//! whatever the backend actually delivers.

use tracing::{debug, warn};

use super::transcript;
use super::{CycleId, RecognitionError, RecognitionOutcome, RecognitionSignal, SpeechCapture};

pub struct RecognitionSession {
    capture: Box<dyn SpeechCapture>,
    cycle: CycleId,
    active: bool,
    /// Set once the current cycle has produced (or given up on) its outcome
    resolved: bool,
    recognized_text: Option<String>,
    failed: bool,
}

impl RecognitionSession {
    pub fn new(capture: Box<dyn SpeechCapture>) -> Self {
        Self {
            capture,
            cycle: 0,
            active: false,
            resolved: true,
            recognized_text: None,
            failed: false,
        }
    }

    /// Begin a new capture cycle
    pub fn start(&mut self) -> Result<CycleId, RecognitionError> {
        if self.active {
            return Err(RecognitionError::AlreadyActive);
        }

        self.cycle += 1;
        self.resolved = false;
        self.recognized_text = None;
        self.failed = false;

        if let Err(e) = self.capture.begin(self.cycle) {
            self.resolved = true;
            self.failed = true;
            return Err(e);
        }

        self.active = true;
        debug!(cycle = self.cycle, "recognition started");
        Ok(self.cycle)
    }

    /// Stop capturing. The outcome, if any, still arrives as a signal.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.capture.end(self.cycle);
        debug!(cycle = self.cycle, "recognition stopped");
    }

    /// Stop capturing and drop whatever the backend reports for this cycle.
    /// An unresolved cycle counts as failed.
    pub fn abort(&mut self) {
        if self.active {
            self.active = false;
            self.capture.discard(self.cycle);
            debug!(cycle = self.cycle, "recognition aborted");
        }
        if !self.resolved {
            self.resolved = true;
            self.failed = true;
        }
    }

    /// Accept a terminal signal from the backend.
    ///
    /// Returns the normalised outcome the first time the current cycle
    /// resolves and `None` for stale or duplicate deliveries.
    pub fn accept(&mut self, signal: &RecognitionSignal) -> Option<RecognitionOutcome> {
        if signal.cycle != self.cycle {
            debug!(
                signal_cycle = signal.cycle,
                current_cycle = self.cycle,
                "dropping recognition signal from an old cycle"
            );
            return None;
        }
        if self.resolved {
            debug!(cycle = self.cycle, outcome = %signal.outcome, "dropping duplicate recognition signal");
            return None;
        }

        self.resolved = true;
        let outcome = match &signal.outcome {
            RecognitionOutcome::Result(raw) => match transcript::normalize(raw) {
                Some(text) => RecognitionOutcome::Result(text),
                None => RecognitionOutcome::NoResult,
            },
            other => other.clone(),
        };

        match &outcome {
            RecognitionOutcome::Result(text) => self.recognized_text = Some(text.clone()),
            RecognitionOutcome::NoResult => {}
            RecognitionOutcome::Error(reason) => {
                warn!(cycle = self.cycle, %reason, "speech recognition error");
                self.failed = true;
            }
        }

        Some(outcome)
    }

    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    /// Whether the current cycle has its outcome
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Transcript of the current cycle; `None` when nothing usable was heard
    pub fn recognized_text(&self) -> Option<&str> {
        self.recognized_text.as_deref()
    }

    pub fn failed(&self) -> bool {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::testing::{CaptureCall, ScriptedCapture};

    fn signal(cycle: CycleId, outcome: RecognitionOutcome) -> RecognitionSignal {
        RecognitionSignal { cycle, outcome }
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (capture, log) = ScriptedCapture::new();
        let mut session = RecognitionSession::new(Box::new(capture));

        assert_eq!(session.start().unwrap(), 1);
        assert!(matches!(session.start(), Err(RecognitionError::AlreadyActive)));
        assert_eq!(log.calls(), vec![CaptureCall::Begin(1)]);
    }

    #[test]
    fn test_stop_without_result_is_safe() {
        let (capture, log) = ScriptedCapture::new();
        let mut session = RecognitionSession::new(Box::new(capture));

        session.stop();
        session.start().unwrap();
        session.stop();
        session.stop();

        assert!(!session.is_resolved());
        assert_eq!(log.calls(), vec![CaptureCall::Begin(1), CaptureCall::End(1)]);
        // Stopped, so the next cycle may start
        assert_eq!(session.start().unwrap(), 2);
    }

    #[test]
    fn test_first_terminal_signal_wins() {
        let (capture, _log) = ScriptedCapture::new();
        let mut session = RecognitionSession::new(Box::new(capture));
        let cycle = session.start().unwrap();

        let first = session.accept(&signal(cycle, RecognitionOutcome::Result("open the vault".into())));
        assert_eq!(first, Some(RecognitionOutcome::Result("open the vault".into())));

        assert_eq!(session.accept(&signal(cycle, RecognitionOutcome::NoResult)), None);
        assert_eq!(session.recognized_text(), Some("open the vault"));
        assert!(!session.failed());
    }

    #[test]
    fn test_stale_cycle_is_dropped() {
        let (capture, _log) = ScriptedCapture::new();
        let mut session = RecognitionSession::new(Box::new(capture));
        session.start().unwrap();
        session.stop();
        session.start().unwrap();

        assert_eq!(session.accept(&signal(1, RecognitionOutcome::Result("late".into()))), None);
        assert_eq!(session.recognized_text(), None);
    }

    #[test]
    fn test_error_marks_failure() {
        let (capture, _log) = ScriptedCapture::new();
        let mut session = RecognitionSession::new(Box::new(capture));
        let cycle = session.start().unwrap();

        let outcome = session.accept(&signal(cycle, RecognitionOutcome::Error("not-allowed".into())));
        assert_eq!(outcome, Some(RecognitionOutcome::Error("not-allowed".into())));
        assert!(session.failed());
    }

    #[test]
    fn test_blank_result_normalises_to_no_result() {
        let (capture, _log) = ScriptedCapture::new();
        let mut session = RecognitionSession::new(Box::new(capture));
        let cycle = session.start().unwrap();

        let outcome = session.accept(&signal(cycle, RecognitionOutcome::Result("  ".into())));
        assert_eq!(outcome, Some(RecognitionOutcome::NoResult));
        assert_eq!(session.recognized_text(), None);
    }

    #[test]
    fn test_abort_discards_late_outcome() {
        let (capture, log) = ScriptedCapture::new();
        let mut session = RecognitionSession::new(Box::new(capture));
        let cycle = session.start().unwrap();

        session.abort();
        assert!(session.failed());
        assert_eq!(session.accept(&signal(cycle, RecognitionOutcome::Result("x".into()))), None);
        assert_eq!(session.recognized_text(), None);
        assert_eq!(log.calls(), vec![CaptureCall::Begin(1), CaptureCall::Discard(1)]);
    }

    #[test]
    fn test_abort_after_result_keeps_result() {
        let (capture, _log) = ScriptedCapture::new();
        let mut session = RecognitionSession::new(Box::new(capture));
        let cycle = session.start().unwrap();
        session.accept(&signal(cycle, RecognitionOutcome::Result("open the vault".into())));

        session.abort();

        assert!(!session.failed());
        assert_eq!(session.recognized_text(), Some("open the vault"));
    }

    #[test]
    fn test_failed_begin_leaves_session_inactive() {
        let (capture, _log) = ScriptedCapture::failing("microphone busy");
        let mut session = RecognitionSession::new(Box::new(capture));

        assert!(matches!(session.start(), Err(RecognitionError::Capture(_))));
        assert!(session.is_resolved());
        assert!(session.failed());
        // A retry on the next cycle is allowed
        assert!(matches!(session.start(), Err(RecognitionError::Capture(_))));
    }
}
