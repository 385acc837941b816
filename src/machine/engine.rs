//! Interaction controller
//!
//! Owns the single active state and the shared [`Context`]. Every event
//! is dispatched from one task, and [`Controller::transition`] is the
//! only place the active state changes: the old state exits and has its
//! scope released before the next state is entered.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::boot::{self, BootLine};
use super::listeners::{ListenerRegistry, StateId};
use super::scope::Scope;
use super::states::{ExitReason, InteractionState, StateKind, Step, CONNECTION_LOST_NOTICE};
use super::timers::Timers;
use crate::config::Config;
use crate::display::Display;
use crate::events::{Event, EventReceiver};
use crate::input::InputEvent;
use crate::recognition::RecognitionSession;
use crate::relay::{Relay, SPEECH};
use crate::speech::Speaker;

#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    /// The relay went away; the client cannot continue
    #[error("relay connection lost: {0}")]
    ConnectionLost(String),

    /// The relay sent something out of sequence; the cycle is reset
    #[error("protocol fault: {0}")]
    ProtocolFault(String),
}

/// Timings and options the states read
#[derive(Debug, Clone)]
pub struct InteractionSettings {
    pub recognition_timeout: Duration,
    pub speak_delay: Duration,
    pub reply_hold: Duration,
    pub boot_script: Vec<BootLine>,
    pub boot_skippable: bool,
    pub play_intro: bool,
}

impl InteractionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            recognition_timeout: Duration::from_millis(config.recognition.timeout_ms),
            speak_delay: Duration::from_millis(config.speech.delay_ms),
            reply_hold: Duration::from_millis(config.speech.hold_ms),
            boot_script: boot::default_script(),
            boot_skippable: config.interface.skippable_boot,
            play_intro: config.interface.play_intro,
        }
    }

    /// First state of a fresh session
    pub fn initial_state(&self) -> InteractionState {
        if self.play_intro {
            InteractionState::ConnectPrompt
        } else {
            InteractionState::Waiting
        }
    }
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Capabilities shared by every state, handed forward on each transition
pub struct Context {
    pub display: Box<dyn Display>,
    pub recognition: RecognitionSession,
    pub relay: Box<dyn Relay>,
    pub speaker: Box<dyn Speaker>,
    pub timers: Box<dyn Timers>,
    pub listeners: ListenerRegistry,
    pub settings: InteractionSettings,
}

struct Active {
    state: InteractionState,
    scope: Scope,
    entered_at: Instant,
}

pub struct Controller {
    ctx: Context,
    active: Option<Active>,
    next_state_id: u64,
}

impl Controller {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            active: None,
            next_state_id: 0,
        }
    }

    /// Kind of the active state, `None` before start and after shutdown
    pub fn state(&self) -> Option<StateKind> {
        self.active.as_ref().map(|active| active.state.kind())
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Enter the initial state
    pub fn start(&mut self) -> Result<(), MachineError> {
        if self.active.is_some() {
            return Ok(());
        }
        let initial = self.ctx.settings.initial_state();
        self.enter(initial)
    }

    /// Run the controller, processing events until the queue closes
    pub async fn run(&mut self, mut events: EventReceiver) -> Result<(), MachineError> {
        self.start()?;
        info!(state = ?self.state(), "interaction controller started");

        while let Some(event) = events.recv().await {
            self.dispatch(event)?;
        }

        info!("interaction controller stopped");
        Ok(())
    }

    /// Deliver one event to the active state
    pub fn dispatch(&mut self, event: Event) -> Result<(), MachineError> {
        if let Event::ChannelClosed { reason } = &event {
            error!(%reason, "relay connection lost");
            self.shutdown();
            self.ctx.display.show(CONNECTION_LOST_NOTICE);
            return Err(MachineError::ConnectionLost(reason.clone()));
        }

        let Some(active) = self.active.as_mut() else {
            debug!(%event, "no active state, dropping event");
            return Ok(());
        };

        let event = match event {
            Event::Input(InputEvent::Toggle) => Event::Input(resolve_toggle(active.state.kind())),
            other => other,
        };

        let deliver = match &event {
            Event::TimerFired(id) => {
                let owned = active.scope.claim_timer(*id);
                self.ctx.timers.settle(*id);
                owned
            }
            other => other
                .topic()
                .map(|topic| self.ctx.listeners.is_listening(active.scope.id(), &topic))
                .unwrap_or(false),
        };

        if !deliver {
            if let Event::Inbound(envelope) = &event {
                if envelope.event == SPEECH {
                    let detail = format!("unexpected speech reply while {}", active.state.kind());
                    return self.reset(&detail);
                }
            }
            debug!(state = %active.state.kind(), %event, "ignoring out-of-phase event");
            return Ok(());
        }

        let step = active.state.handle(&event, &mut self.ctx, &mut active.scope);
        self.apply(step)
    }

    /// Exit the active state and enter `next`
    pub fn transition(&mut self, next: InteractionState) -> Result<(), MachineError> {
        let from = self.state();
        let duration_ms = self
            .active
            .as_ref()
            .map(|active| active.entered_at.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = ?from,
            to = %next.kind(),
            duration_ms = duration_ms,
            "state transition"
        );

        self.exit_active(ExitReason::Transition);
        self.enter(next)
    }

    /// Abandon the current cycle after a protocol fault and start over
    pub fn reset(&mut self, detail: &str) -> Result<(), MachineError> {
        warn!(detail, state = ?self.state(), "protocol fault, resetting to Waiting");
        self.exit_active(ExitReason::Forced);
        self.enter(InteractionState::Waiting)
    }

    /// Tear down the active state without entering another
    pub fn shutdown(&mut self) {
        if self.active.is_some() {
            info!(state = ?self.state(), "tearing down active state");
            self.exit_active(ExitReason::Forced);
        }
    }

    fn apply(&mut self, step: Result<Step, MachineError>) -> Result<(), MachineError> {
        match step {
            Ok(Step::Stay) => Ok(()),
            Ok(Step::Transition(next)) => self.transition(next),
            Err(MachineError::ProtocolFault(detail)) => self.reset(&detail),
            Err(e) => {
                self.shutdown();
                Err(e)
            }
        }
    }

    fn enter(&mut self, mut state: InteractionState) -> Result<(), MachineError> {
        self.next_state_id += 1;
        let mut scope = Scope::new(StateId::new(self.next_state_id));

        let step = state.enter(&mut self.ctx, &mut scope);
        debug!(
            state = %state.kind(),
            id = %scope.id(),
            listeners = scope.owned_listeners(),
            timers = scope.owned_timers(),
            "state entered"
        );

        self.active = Some(Active {
            state,
            scope,
            entered_at: Instant::now(),
        });
        self.apply(step)
    }

    fn exit_active(&mut self, reason: ExitReason) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        active.state.exit(&mut self.ctx, reason);
        let released = active
            .scope
            .release(&mut self.ctx.listeners, self.ctx.timers.as_mut());

        debug!(
            state = %active.state.kind(),
            ?reason,
            listeners = released.listeners,
            timers = released.timers,
            "state exited"
        );
    }
}

/// A tap ends recording while listening and begins it otherwise. The
/// intro prompt waits for a key release, so a tap there counts as one.
fn resolve_toggle(kind: StateKind) -> InputEvent {
    match kind {
        StateKind::Listening | StateKind::ConnectPrompt => InputEvent::Release,
        _ => InputEvent::Press,
    }
}
