//! Speech capture through an external recogniser process
//!
//! The process records from the microphone while its stdin is open and
//! prints the transcript to stdout once stdin is closed. Exit status
//! zero with blank output means nothing was recognised.

use std::process::Stdio;

use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CycleId, RecognitionError, RecognitionOutcome, RecognitionSignal, SpeechCapture};
use crate::events::{Event, EventSender};

pub struct CommandCapture {
    program: String,
    args: Vec<String>,
    events: EventSender,
    stdin: Option<ChildStdin>,
    task: Option<JoinHandle<()>>,
}

impl CommandCapture {
    pub fn new(program: String, args: Vec<String>, events: EventSender) -> Self {
        Self {
            program,
            args,
            events,
            stdin: None,
            task: None,
        }
    }
}

impl SpeechCapture for CommandCapture {
    fn begin(&mut self, cycle: CycleId) -> Result<(), RecognitionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecognitionError::Capture(format!("{}: {}", self.program, e)))?;

        self.stdin = child.stdin.take();
        let events = self.events.clone();

        self.task = Some(tokio::spawn(async move {
            let outcome = match child.wait_with_output().await {
                Ok(output) if output.status.success() => {
                    let text = String::from_utf8_lossy(&output.stdout).into_owned();
                    if text.trim().is_empty() && text != "\n" {
                        RecognitionOutcome::NoResult
                    } else {
                        RecognitionOutcome::Result(text)
                    }
                }
                Ok(output) => RecognitionOutcome::Error(format!(
                    "recogniser exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )),
                Err(e) => RecognitionOutcome::Error(e.to_string()),
            };

            debug!(cycle, %outcome, "recogniser finished");
            let _ = events.send(Event::Recognition(RecognitionSignal { cycle, outcome }));
        }));

        Ok(())
    }

    fn end(&mut self, cycle: CycleId) {
        // Closing stdin tells the recogniser to stop listening
        if self.stdin.take().is_none() {
            debug!(cycle, "recogniser stdin already closed");
        }
    }

    fn discard(&mut self, cycle: CycleId) {
        self.stdin.take();
        if let Some(task) = self.task.take() {
            // Dropping the child kills the recogniser
            task.abort();
            debug!(cycle, "recogniser discarded");
        }
    }
}

/// Stand-in when no recogniser is configured; every cycle fails to start
pub struct UnavailableCapture;

impl SpeechCapture for UnavailableCapture {
    fn begin(&mut self, _cycle: CycleId) -> Result<(), RecognitionError> {
        warn!("no recogniser command configured");
        Err(RecognitionError::Capture("no recogniser configured".to_string()))
    }

    fn end(&mut self, _cycle: CycleId) {}
}
