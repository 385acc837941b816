//! In-memory doubles for driving the controller in tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use super::engine::{Context, Controller, InteractionSettings};
use super::listeners::ListenerRegistry;
use super::timers::{TimerId, Timers};
use crate::display::Display;
use crate::events::{Event, EventReceiver, EventSender};
use crate::input::InputEvent;
use crate::recognition::{
    CycleId, RecognitionError, RecognitionOutcome, RecognitionSession, RecognitionSignal, SpeechCapture,
};
use crate::relay::{Envelope, Outbound, Relay, RelayError};
use crate::speech::{SpeechError, Speaker, UtteranceId};

/// Keeps the current screen contents
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    screen: Arc<Mutex<Vec<String>>>,
}

impl RecordingDisplay {
    pub fn lines(&self) -> Vec<String> {
        self.screen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.screen.lock().unwrap().last().cloned()
    }
}

impl Display for RecordingDisplay {
    fn show(&mut self, text: &str) {
        let mut screen = self.screen.lock().unwrap();
        screen.clear();
        if !text.is_empty() {
            screen.push(text.to_string());
        }
    }

    fn append(&mut self, text: &str) {
        self.screen.lock().unwrap().push(text.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureCall {
    Begin(CycleId),
    End(CycleId),
    Discard(CycleId),
}

/// Records calls; outcomes are injected by the test
#[derive(Clone, Default)]
pub struct CaptureLog {
    calls: Arc<Mutex<Vec<CaptureCall>>>,
}

impl CaptureLog {
    pub fn calls(&self) -> Vec<CaptureCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: CaptureCall) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct ScriptedCapture {
    log: CaptureLog,
    failure: Option<String>,
}

impl ScriptedCapture {
    pub fn new() -> (Self, CaptureLog) {
        let log = CaptureLog::default();
        (
            Self {
                log: log.clone(),
                failure: None,
            },
            log,
        )
    }

    pub fn failing(reason: &str) -> (Self, CaptureLog) {
        let (mut capture, log) = Self::new();
        capture.failure = Some(reason.to_string());
        (capture, log)
    }
}

impl SpeechCapture for ScriptedCapture {
    fn begin(&mut self, cycle: CycleId) -> Result<(), RecognitionError> {
        if let Some(reason) = &self.failure {
            return Err(RecognitionError::Capture(reason.clone()));
        }
        self.log.push(CaptureCall::Begin(cycle));
        Ok(())
    }

    fn end(&mut self, cycle: CycleId) {
        self.log.push(CaptureCall::End(cycle));
    }

    fn discard(&mut self, cycle: CycleId) {
        self.log.push(CaptureCall::Discard(cycle));
    }
}

/// Collects outbound messages
#[derive(Clone, Default)]
pub struct MemoryRelay {
    sent: Arc<Mutex<Vec<Outbound>>>,
    closed: Arc<Mutex<bool>>,
}

impl MemoryRelay {
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }

    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

impl Relay for MemoryRelay {
    fn send(&mut self, message: Outbound) -> Result<(), RelayError> {
        if *self.closed.lock().unwrap() {
            return Err(RelayError::Closed);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Default)]
struct SpeakerLog {
    spoken: Vec<String>,
    cancelled: usize,
}

/// Records what would have been spoken
#[derive(Clone, Default)]
pub struct RecordingSpeaker {
    log: Arc<Mutex<SpeakerLog>>,
}

impl RecordingSpeaker {
    pub fn spoken(&self) -> Vec<String> {
        self.log.lock().unwrap().spoken.clone()
    }

    pub fn cancelled(&self) -> usize {
        self.log.lock().unwrap().cancelled
    }

    pub fn last_utterance(&self) -> UtteranceId {
        self.log.lock().unwrap().spoken.len() as UtteranceId
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&mut self, text: &str) -> Result<UtteranceId, SpeechError> {
        let mut log = self.log.lock().unwrap();
        log.spoken.push(text.to_string());
        Ok(log.spoken.len() as UtteranceId)
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().cancelled += 1;
    }
}

#[derive(Default)]
struct TimerBookInner {
    next_id: u64,
    pending: BTreeMap<TimerId, Duration>,
}

/// Shared view of [`ManualTimers`]
#[derive(Clone, Default)]
pub struct TimerBook {
    inner: Arc<Mutex<TimerBookInner>>,
}

impl TimerBook {
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Pending timers, oldest first
    pub fn pending_ids(&self) -> Vec<TimerId> {
        self.inner.lock().unwrap().pending.keys().copied().collect()
    }
}

/// Timers that only fire when the test says so
pub struct ManualTimers {
    book: TimerBook,
}

impl ManualTimers {
    pub fn new() -> (Self, TimerBook) {
        let book = TimerBook::default();
        (Self { book: book.clone() }, book)
    }
}

impl Timers for ManualTimers {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        let mut inner = self.book.inner.lock().unwrap();
        inner.next_id += 1;
        let id = TimerId::new(inner.next_id);
        inner.pending.insert(id, delay);
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.book.inner.lock().unwrap().pending.remove(&id).is_some()
    }

    fn settle(&mut self, id: TimerId) -> bool {
        self.book.inner.lock().unwrap().pending.remove(&id).is_some()
    }

    fn pending(&self) -> usize {
        self.book.pending()
    }
}

/// Controller wired to in-memory doubles
pub struct Harness {
    pub controller: Controller,
    pub display: RecordingDisplay,
    pub capture: CaptureLog,
    pub relay: MemoryRelay,
    pub speaker: RecordingSpeaker,
    pub timers: TimerBook,
}

impl Harness {
    fn build(capture: ScriptedCapture, capture_log: CaptureLog, settings: InteractionSettings) -> Self {
        let speaker = RecordingSpeaker::default();
        Self::build_with_speaker(capture, capture_log, settings, speaker.clone(), Box::new(speaker))
    }

    fn build_with_speaker(
        capture: ScriptedCapture,
        capture_log: CaptureLog,
        settings: InteractionSettings,
        speaker: RecordingSpeaker,
        output: Box<dyn Speaker>,
    ) -> Self {
        let display = RecordingDisplay::default();
        let relay = MemoryRelay::default();
        let (timers, book) = ManualTimers::new();

        let ctx = Context {
            display: Box::new(display.clone()),
            recognition: RecognitionSession::new(Box::new(capture)),
            relay: Box::new(relay.clone()),
            speaker: output,
            timers: Box::new(timers),
            listeners: ListenerRegistry::new(),
            settings,
        };

        Self {
            controller: Controller::new(ctx),
            display,
            capture: capture_log,
            relay,
            speaker,
            timers: book,
        }
    }

    /// Harness already in its initial state with default settings
    pub fn started() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(configure: impl FnOnce(&mut InteractionSettings)) -> Self {
        let mut settings = InteractionSettings::default();
        configure(&mut settings);
        let (capture, log) = ScriptedCapture::new();
        let mut harness = Self::build(capture, log, settings);
        harness.controller.start().unwrap();
        harness
    }

    /// Harness speaking through `output`; `speaker` stays empty
    pub fn with_speaker(output: Box<dyn Speaker>) -> Self {
        let (capture, log) = ScriptedCapture::new();
        let settings = InteractionSettings::default();
        let mut harness =
            Self::build_with_speaker(capture, log, settings, RecordingSpeaker::default(), output);
        harness.controller.start().unwrap();
        harness
    }

    pub fn with_failing_capture() -> Self {
        let (capture, log) = ScriptedCapture::failing("microphone unavailable");
        let mut harness = Self::build(capture, log, InteractionSettings::default());
        harness.controller.start().unwrap();
        harness
    }

    /// Harness that has not entered any state yet, plus a queue for `run`
    pub fn unstarted() -> (Self, EventSender, EventReceiver) {
        let (capture, log) = ScriptedCapture::new();
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::build(capture, log, InteractionSettings::default()), tx, rx)
    }

    pub fn dispatch(&mut self, event: Event) {
        self.controller.dispatch(event).unwrap();
    }

    pub fn press(&mut self) {
        self.dispatch(Event::Input(InputEvent::Press));
    }

    pub fn release(&mut self) {
        self.dispatch(Event::Input(InputEvent::Release));
    }

    /// Key tap on a terminal without release reporting
    pub fn tap(&mut self) {
        self.dispatch(Event::Input(InputEvent::Toggle));
    }

    /// Deliver a recogniser outcome for the current cycle
    pub fn recognise(&mut self, outcome: RecognitionOutcome) {
        let cycle = self.controller.context().recognition.cycle();
        self.dispatch(Event::Recognition(RecognitionSignal { cycle, outcome }));
    }

    pub fn reply(&mut self, text: &str) {
        self.dispatch(Event::Inbound(Envelope::new("speech", text.into())));
    }

    pub fn finish_speaking(&mut self) {
        let utterance = self.speaker.last_utterance();
        self.dispatch(Event::SynthesisFinished(utterance));
    }

    /// Fire the oldest pending timer
    pub fn fire_next_timer(&mut self) {
        let id = *self
            .timers
            .pending_ids()
            .first()
            .expect("no pending timer to fire");
        self.dispatch(Event::TimerFired(id));
    }

    pub fn listener_count(&self) -> usize {
        self.controller.context().listeners.len()
    }
}
