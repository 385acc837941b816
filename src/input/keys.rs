//! Push-to-talk key handling
//!
//! Maps terminal key events onto the two logical recording signals. Any
//! key is the record key; Ctrl+C asks the client to quit.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Logical recording signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Begin recording (key down, including auto-repeat)
    Press,
    /// End recording (key up)
    Release,
    /// A tap on a terminal that cannot report key releases; the
    /// controller decides whether it begins or ends recording
    Toggle,
}

/// What a raw key event means to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Input(InputEvent),
    Interrupt,
}

/// Classify a terminal key event
pub fn classify(event: &KeyEvent) -> KeyAction {
    if event.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(event.code, KeyCode::Char('c') | KeyCode::Char('C'))
        && event.kind != KeyEventKind::Release
    {
        return KeyAction::Interrupt;
    }

    match event.kind {
        KeyEventKind::Press | KeyEventKind::Repeat => KeyAction::Input(InputEvent::Press),
        KeyEventKind::Release => KeyAction::Input(InputEvent::Release),
    }
}

/// Decides which key events are forwarded.
///
/// Terminals that report key releases pass press, repeat and release
/// straight through. Otherwise only fresh presses are forwarded, as
/// [`InputEvent::Toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFilter {
    reports_release: bool,
}

impl KeyFilter {
    pub fn new(reports_release: bool) -> Self {
        Self { reports_release }
    }

    pub fn reports_release(&self) -> bool {
        self.reports_release
    }

    /// Translate a key event into the signal to forward, if any
    pub fn translate(&self, event: &KeyEvent, input: InputEvent) -> Option<InputEvent> {
        if self.reports_release {
            return Some(input);
        }

        // Auto-repeat would otherwise toggle on every tick
        if event.kind != KeyEventKind::Press {
            return None;
        }
        Some(InputEvent::Toggle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn space(kind: KeyEventKind) -> KeyEvent {
        key(KeyCode::Char(' '), KeyModifiers::NONE, kind)
    }

    #[test]
    fn test_press_repeat_release() {
        assert_eq!(classify(&space(KeyEventKind::Press)), KeyAction::Input(InputEvent::Press));
        assert_eq!(classify(&space(KeyEventKind::Repeat)), KeyAction::Input(InputEvent::Press));
        assert_eq!(classify(&space(KeyEventKind::Release)), KeyAction::Input(InputEvent::Release));
    }

    #[test]
    fn test_ctrl_c_interrupts() {
        let event = key(KeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press);
        assert_eq!(classify(&event), KeyAction::Interrupt);

        let plain = key(KeyCode::Char('c'), KeyModifiers::NONE, KeyEventKind::Press);
        assert_eq!(classify(&plain), KeyAction::Input(InputEvent::Press));
    }

    #[test]
    fn test_filter_passes_through_with_release_reporting() {
        let filter = KeyFilter::new(true);
        let repeat = space(KeyEventKind::Repeat);
        assert_eq!(filter.translate(&repeat, InputEvent::Press), Some(InputEvent::Press));
        let release = space(KeyEventKind::Release);
        assert_eq!(filter.translate(&release, InputEvent::Release), Some(InputEvent::Release));
    }

    #[test]
    fn test_filter_sends_toggles_without_release_reporting() {
        let filter = KeyFilter::new(false);
        let press = space(KeyEventKind::Press);

        assert_eq!(filter.translate(&press, InputEvent::Press), Some(InputEvent::Toggle));
        assert_eq!(filter.translate(&space(KeyEventKind::Repeat), InputEvent::Press), None);
        // Every tap is the same signal; no state is kept here
        assert_eq!(filter.translate(&press, InputEvent::Press), Some(InputEvent::Toggle));
    }
}
