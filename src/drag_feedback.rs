//! Drag source feedback: decides when the drag loop drops or cancels.
//!
//! The state lives in an atomic so the object can be shared with the COM
//! wrapper and answered from any callback without blocking.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::format::DropEffect;

/// Primary (left) mouse button held.
pub const MK_LBUTTON: u32 = 0x0001;
/// Secondary (right) mouse button held.
pub const MK_RBUTTON: u32 = 0x0002;
pub const MK_SHIFT: u32 = 0x0004;
pub const MK_CONTROL: u32 = 0x0008;
pub const MK_MBUTTON: u32 = 0x0010;

/// Keyboard and mouse state reported by one continuation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputState {
    pub escape_pressed: bool,
    pub key_state: u32,
}

impl InputState {
    /// Primary button still held, nothing else pressed.
    pub fn button_held() -> Self {
        Self {
            escape_pressed: false,
            key_state: MK_LBUTTON,
        }
    }

    /// Primary button released.
    pub fn button_released() -> Self {
        Self::default()
    }

    /// Escape pressed while the button is still held.
    pub fn escape_pressed() -> Self {
        Self {
            escape_pressed: true,
            key_state: MK_LBUTTON,
        }
    }

    pub fn primary_button_held(&self) -> bool {
        self.key_state & MK_LBUTTON != 0
    }
}

/// Answer to a continuation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueAction {
    Continue,
    Drop,
    Cancel,
}

/// Answer to a feedback query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackAction {
    /// Let the OS draw its default drag cursors.
    UseDefaultCursors,
}

/// Lifecycle of one drag session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
    Dropped,
    Cancelled,
}

impl DragState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DragState::Dropped | DragState::Cancelled)
    }

    fn to_raw(self) -> u8 {
        match self {
            DragState::Idle => 0,
            DragState::Dragging => 1,
            DragState::Dropped => 2,
            DragState::Cancelled => 3,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => DragState::Dragging,
            2 => DragState::Dropped,
            3 => DragState::Cancelled,
            _ => DragState::Idle,
        }
    }
}

/// Continuation and feedback queries issued by the drag loop.
///
/// Implementations must answer immediately and never fail; a stalled answer
/// stalls the drag loop for every application.
pub trait DragFeedback {
    fn query_continue(&self, input: InputState) -> ContinueAction;
    fn give_feedback(&self, effect: DropEffect) -> FeedbackAction;
}

/// Feedback object following the usual left-button drag conventions.
#[derive(Debug)]
pub struct FileDragFeedback {
    state: AtomicU8,
}

impl Default for FileDragFeedback {
    fn default() -> Self {
        Self::new()
    }
}

impl FileDragFeedback {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(DragState::Idle.to_raw()),
        }
    }

    /// Enter `Dragging`; called when the loop starts.
    pub fn begin(&self) {
        let _ = self.state.compare_exchange(
            DragState::Idle.to_raw(),
            DragState::Dragging.to_raw(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn state(&self) -> DragState {
        DragState::from_raw(self.state.load(Ordering::Acquire))
    }

    fn finish(&self, next: DragState) -> DragState {
        match self.state.compare_exchange(
            DragState::Dragging.to_raw(),
            next.to_raw(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                tracing::debug!("Drag state -> {next:?}");
                next
            }
            Err(current) => DragState::from_raw(current),
        }
    }
}

impl DragFeedback for FileDragFeedback {
    fn query_continue(&self, input: InputState) -> ContinueAction {
        let current = self.state();
        let state = if current.is_terminal() {
            current
        } else if input.escape_pressed {
            self.finish(DragState::Cancelled)
        } else if !input.primary_button_held() {
            self.finish(DragState::Dropped)
        } else {
            current
        };
        match state {
            DragState::Cancelled => ContinueAction::Cancel,
            DragState::Dropped => ContinueAction::Drop,
            DragState::Idle | DragState::Dragging => ContinueAction::Continue,
        }
    }

    fn give_feedback(&self, _effect: DropEffect) -> FeedbackAction {
        FeedbackAction::UseDefaultCursors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(inputs: &[InputState]) -> (DragState, Vec<ContinueAction>) {
        let feedback = FileDragFeedback::new();
        feedback.begin();
        let actions = inputs
            .iter()
            .map(|input| feedback.query_continue(*input))
            .collect();
        (feedback.state(), actions)
    }

    #[test]
    fn escape_cancels() {
        let (state, actions) = replay(&[
            InputState::button_held(),
            InputState::button_held(),
            InputState::escape_pressed(),
        ]);
        assert_eq!(state, DragState::Cancelled);
        assert_eq!(
            actions,
            vec![
                ContinueAction::Continue,
                ContinueAction::Continue,
                ContinueAction::Cancel
            ]
        );
    }

    #[test]
    fn releasing_the_button_drops() {
        let (state, actions) = replay(&[
            InputState::button_held(),
            InputState::button_held(),
            InputState::button_released(),
        ]);
        assert_eq!(state, DragState::Dropped);
        assert_eq!(actions.last(), Some(&ContinueAction::Drop));
    }

    #[test]
    fn no_input_stays_dragging() {
        let (state, actions) = replay(&[]);
        assert_eq!(state, DragState::Dragging);
        assert!(actions.is_empty());
    }

    #[test]
    fn modifiers_and_other_buttons_keep_dragging() {
        let (state, _) = replay(&[InputState {
            escape_pressed: false,
            key_state: MK_LBUTTON | MK_SHIFT | MK_CONTROL | MK_RBUTTON,
        }]);
        assert_eq!(state, DragState::Dragging);
    }

    #[test]
    fn escape_wins_over_release_and_terminal_state_sticks() {
        let (state, actions) = replay(&[
            InputState {
                escape_pressed: true,
                key_state: 0,
            },
            InputState::button_released(),
        ]);
        assert_eq!(state, DragState::Cancelled);
        assert_eq!(actions, vec![ContinueAction::Cancel, ContinueAction::Cancel]);
    }

    #[test]
    fn feedback_always_uses_default_cursors() {
        let feedback = FileDragFeedback::new();
        for effect in [DropEffect::None, DropEffect::Copy, DropEffect::Move] {
            assert_eq!(
                feedback.give_feedback(effect),
                FeedbackAction::UseDefaultCursors
            );
        }
    }
}
