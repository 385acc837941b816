//! Interaction states
//!
//! One enum variant per state with the data that state carries. The
//! controller calls [`InteractionState::enter`] once, feeds it events via
//! [`InteractionState::handle`] and finally calls
//! [`InteractionState::exit`]; listeners and timers registered through the
//! [`Scope`] are released by the controller right after `exit`.

use tracing::{debug, info, warn};

use super::engine::{Context, MachineError};
use super::listeners::Topic;
use super::scope::Scope;
use super::timers::TimerId;
use crate::events::Event;
use crate::input::InputEvent;
use crate::relay::{Outbound, SPEECH};
use crate::speech::UtteranceId;

pub const INTRO_PROMPT: &str = "Press any key to start connecting";
pub const WAITING_PROMPT: &str = "Press any key to start recording...";
pub const LISTENING_PROMPT: &str = "Release to stop recording...";
pub const SENDING_NOTICE: &str = "Sending...";
pub const RECEIVED_NOTICE: &str = "Received";
pub const CONNECTION_LOST_NOTICE: &str = "Connection to host lost.";
/// Marks the reply text on screen
pub const REPLY_PREFIX: &str = "> ";

/// Which state is active, without its data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    ConnectPrompt,
    BootAnimation,
    Waiting,
    Listening,
    Sending,
    AwaitingReply,
    Speaking,
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateKind::ConnectPrompt => write!(f, "ConnectPrompt"),
            StateKind::BootAnimation => write!(f, "BootAnimation"),
            StateKind::Waiting => write!(f, "Waiting"),
            StateKind::Listening => write!(f, "Listening"),
            StateKind::Sending => write!(f, "Sending"),
            StateKind::AwaitingReply => write!(f, "AwaitingReply"),
            StateKind::Speaking => write!(f, "Speaking"),
        }
    }
}

/// Why a state is being exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The state asked for a transition
    Transition,
    /// Protocol fault reset, connection loss or shutdown
    Forced,
}

/// What a state wants after entering or handling an event
#[derive(Debug)]
pub enum Step {
    Stay,
    Transition(InteractionState),
}

/// Boot animation progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootProgress {
    next_line: usize,
    pending: Option<TimerId>,
}

/// Reply being spoken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    text: String,
    /// Delay before speaking starts
    cue: Option<TimerId>,
    /// Upper bound on how long the reply holds the screen
    hold: Option<TimerId>,
    utterance: Option<UtteranceId>,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cue: None,
            hold: None,
            utterance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionState {
    /// "Press any key to start connecting"
    ConnectPrompt,
    /// Scripted boot text, one line per timer
    BootAnimation(BootProgress),
    /// Idle, waiting for the record key
    Waiting,
    /// Record key held, recogniser running
    Listening,
    /// Recogniser stopped, waiting for its outcome before transmitting
    Sending { deadline: Option<TimerId> },
    /// Transcript sent, waiting for the reply
    AwaitingReply,
    /// Reply received, being spoken
    Speaking(Reply),
}

impl InteractionState {
    pub fn boot_animation() -> Self {
        InteractionState::BootAnimation(BootProgress::default())
    }

    pub fn speaking(text: impl Into<String>) -> Self {
        InteractionState::Speaking(Reply::new(text))
    }

    pub fn kind(&self) -> StateKind {
        match self {
            InteractionState::ConnectPrompt => StateKind::ConnectPrompt,
            InteractionState::BootAnimation(_) => StateKind::BootAnimation,
            InteractionState::Waiting => StateKind::Waiting,
            InteractionState::Listening => StateKind::Listening,
            InteractionState::Sending { .. } => StateKind::Sending,
            InteractionState::AwaitingReply => StateKind::AwaitingReply,
            InteractionState::Speaking(_) => StateKind::Speaking,
        }
    }

    /// Called exactly once when the state becomes active
    pub fn enter(&mut self, ctx: &mut Context, scope: &mut Scope) -> Result<Step, MachineError> {
        match self {
            InteractionState::ConnectPrompt => {
                ctx.display.show(INTRO_PROMPT);
                scope.listen(&mut ctx.listeners, Topic::KeyUp);
                Ok(Step::Stay)
            }

            InteractionState::BootAnimation(progress) => {
                ctx.display.clear();
                if ctx.settings.boot_skippable {
                    scope.listen(&mut ctx.listeners, Topic::KeyDown);
                }
                Ok(show_next_boot_line(progress, ctx, scope))
            }

            InteractionState::Waiting => {
                ctx.display.show(WAITING_PROMPT);
                scope.listen(&mut ctx.listeners, Topic::KeyDown);
                Ok(Step::Stay)
            }

            InteractionState::Listening => {
                ctx.display.append(LISTENING_PROMPT);
                scope.listen(&mut ctx.listeners, Topic::KeyUp);
                scope.listen(&mut ctx.listeners, Topic::Recognition);

                // A failed start leaves the cycle resolved as a failure
                match ctx.recognition.start() {
                    Ok(cycle) => debug!(cycle, "listening"),
                    Err(e) => warn!(error = %e, "could not start recognition"),
                }
                Ok(Step::Stay)
            }

            InteractionState::Sending { deadline } => {
                ctx.display.append(SENDING_NOTICE);
                ctx.recognition.stop();

                if ctx.recognition.is_resolved() {
                    return transmit(ctx);
                }

                scope.listen(&mut ctx.listeners, Topic::Recognition);
                *deadline = Some(scope.schedule(ctx.timers.as_mut(), ctx.settings.recognition_timeout));
                Ok(Step::Stay)
            }

            InteractionState::AwaitingReply => {
                scope.listen(&mut ctx.listeners, Topic::Inbound(SPEECH.to_string()));
                Ok(Step::Stay)
            }

            InteractionState::Speaking(reply) => {
                ctx.display.append(RECEIVED_NOTICE);
                reply.cue = Some(scope.schedule(ctx.timers.as_mut(), ctx.settings.speak_delay));
                Ok(Step::Stay)
            }
        }
    }

    /// Handle an event this state listens for.
    ///
    /// Events that do not fit the state's current phase are ignored.
    pub fn handle(&mut self, event: &Event, ctx: &mut Context, scope: &mut Scope) -> Result<Step, MachineError> {
        match (self, event) {
            (InteractionState::ConnectPrompt, Event::Input(InputEvent::Release)) => {
                Ok(Step::Transition(InteractionState::boot_animation()))
            }

            (InteractionState::BootAnimation(_), Event::Input(InputEvent::Press)) => {
                info!("boot animation skipped");
                Ok(Step::Transition(InteractionState::Waiting))
            }

            (InteractionState::BootAnimation(progress), Event::TimerFired(id)) if progress.pending == Some(*id) => {
                progress.pending = None;
                Ok(show_next_boot_line(progress, ctx, scope))
            }

            (InteractionState::Waiting, Event::Input(InputEvent::Press)) => {
                Ok(Step::Transition(InteractionState::Listening))
            }

            (InteractionState::Listening, Event::Recognition(signal)) => {
                // Recogniser finished while the key is still held
                if let Some(outcome) = ctx.recognition.accept(signal) {
                    debug!(%outcome, "recognised before key release");
                }
                Ok(Step::Stay)
            }

            (InteractionState::Listening, Event::Input(InputEvent::Release)) => {
                Ok(Step::Transition(InteractionState::Sending { deadline: None }))
            }

            (InteractionState::Sending { .. }, Event::Recognition(signal)) => {
                match ctx.recognition.accept(signal) {
                    Some(_) => transmit(ctx),
                    None => Ok(Step::Stay),
                }
            }

            (InteractionState::Sending { deadline }, Event::TimerFired(id)) if *deadline == Some(*id) => {
                *deadline = None;
                warn!(
                    timeout_ms = ctx.settings.recognition_timeout.as_millis() as u64,
                    "recogniser did not report in time"
                );
                ctx.recognition.abort();
                transmit(ctx)
            }

            (InteractionState::AwaitingReply, Event::Inbound(envelope)) if envelope.event == SPEECH => {
                match envelope.data.as_str() {
                    Some(text) => Ok(Step::Transition(InteractionState::speaking(text))),
                    None => Err(MachineError::ProtocolFault(format!(
                        "speech payload is not text: {}",
                        envelope.data
                    ))),
                }
            }

            (InteractionState::Speaking(reply), Event::TimerFired(id)) if reply.cue == Some(*id) => {
                reply.cue = None;
                ctx.display.append(&format!("{}{}", REPLY_PREFIX, reply.text));
                match ctx.speaker.speak(&reply.text) {
                    Ok(utterance) => {
                        reply.utterance = Some(utterance);
                        scope.listen(&mut ctx.listeners, Topic::SynthesisDone);
                    }
                    Err(e) => warn!(error = %e, "could not speak reply"),
                }
                reply.hold = Some(scope.schedule(ctx.timers.as_mut(), ctx.settings.reply_hold));
                Ok(Step::Stay)
            }

            (InteractionState::Speaking(reply), Event::TimerFired(id)) if reply.hold == Some(*id) => {
                reply.hold = None;
                Ok(Step::Transition(InteractionState::Waiting))
            }

            (InteractionState::Speaking(reply), Event::SynthesisFinished(utterance))
                if reply.utterance == Some(*utterance) =>
            {
                Ok(Step::Transition(InteractionState::Waiting))
            }

            (state, event) => {
                debug!(state = %state.kind(), %event, "event does not match current phase");
                Ok(Step::Stay)
            }
        }
    }

    /// Called exactly once when the state stops being active
    pub fn exit(&mut self, ctx: &mut Context, reason: ExitReason) {
        match (self, reason) {
            (InteractionState::Listening, ExitReason::Forced)
            | (InteractionState::Sending { .. }, ExitReason::Forced) => {
                ctx.recognition.abort();
            }
            (InteractionState::Speaking(reply), ExitReason::Forced) => {
                if reply.utterance.is_some() {
                    ctx.speaker.cancel();
                }
            }
            _ => {}
        }
    }
}

fn show_next_boot_line(progress: &mut BootProgress, ctx: &mut Context, scope: &mut Scope) -> Step {
    let Some(line) = ctx.settings.boot_script.get(progress.next_line) else {
        return Step::Transition(InteractionState::Waiting);
    };

    ctx.display.append(&line.text);
    let delay = line.delay;
    progress.next_line += 1;
    progress.pending = Some(scope.schedule(ctx.timers.as_mut(), delay));
    Step::Stay
}

/// Send this cycle's single outbound message and move on to the reply
fn transmit(ctx: &mut Context) -> Result<Step, MachineError> {
    let message = match ctx.recognition.recognized_text() {
        Some(text) => Outbound::Recognised(text.to_string()),
        None => Outbound::NotRecognised,
    };
    info!(%message, failed = ctx.recognition.failed(), "transmitting");

    ctx.relay
        .send(message)
        .map_err(|e| MachineError::ConnectionLost(e.to_string()))?;

    Ok(Step::Transition(InteractionState::AwaitingReply))
}
