use crate::events::BoothEvent;
use crate::frame_source::Frame;
use crate::sequencer::{SessionOutcome, SHOTS_PER_SESSION};
use crate::theme::ThemeId;

pub const PREVIEW_PENDING_MESSAGE: &str = "Your live preview will appear here shortly.";
pub const READY_MESSAGE: &str =
    "Press \"Begin Session\" when you're ready. Five photos will be taken automatically.";
pub const THANK_YOU_MESSAGE: &str = "Thank you! Press \"Begin Session\" for another set.";
pub const INTERRUPTED_MESSAGE: &str = "Capture interrupted. Press \"Begin Session\" to try again.";
pub const SOURCE_LOST_MESSAGE: &str = "Lost connection to the camera.";

const ACTIVE_SLOT_LABEL: &str = "Capturing...";

#[derive(Debug, Clone)]
pub enum SlotView {
    Empty,
    Active,
    Captured(Frame),
}

impl SlotView {
    /// Badge text over the slot; captured slots show the photo instead.
    pub fn badge(&self, index: usize) -> Option<String> {
        match self {
            SlotView::Empty => Some(format!("#{}", index + 1)),
            SlotView::Active => Some(ACTIVE_SLOT_LABEL.to_string()),
            SlotView::Captured(_) => None,
        }
    }
}

/// Everything the capture screen shows. Only mutated through [`BoothView::apply`]
/// and the ready-state helpers, on the consumer side of the event channel.
#[derive(Debug)]
pub struct BoothView {
    theme: ThemeId,
    event_name: String,
    preview: Option<Frame>,
    slots: Vec<SlotView>,
    countdown: Option<u32>,
    headline: String,
    instruction: Option<String>,
    busy: bool,
}

impl BoothView {
    pub fn new(theme: ThemeId, event_name: &str) -> Self {
        Self {
            theme,
            event_name: event_name.to_string(),
            preview: None,
            slots: vec![SlotView::Empty; SHOTS_PER_SESSION],
            countdown: None,
            headline: theme.definition().format_headline(event_name),
            instruction: Some(PREVIEW_PENDING_MESSAGE.to_string()),
            busy: false,
        }
    }

    pub fn set_selection(&mut self, theme: ThemeId, event_name: &str) {
        self.theme = theme;
        self.event_name = event_name.to_string();
        self.headline = theme.definition().format_headline(event_name);
    }

    pub fn preview(&self) -> Option<&Frame> {
        self.preview.as_ref()
    }

    pub fn slots(&self) -> &[SlotView] {
        &self.slots
    }

    pub fn countdown(&self) -> Option<u32> {
        self.countdown
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn start_button_label(&self) -> &'static str {
        if self.busy {
            ACTIVE_SLOT_LABEL
        } else {
            "Begin Session"
        }
    }

    /// Idle screen with `message`, optionally emptying the slots.
    pub fn show_ready(&mut self, message: &str, clear_slots: bool) {
        self.busy = false;
        self.instruction = Some(message.to_string());
        self.countdown = None;
        self.headline = self.theme.definition().format_headline(&self.event_name);

        for slot in self.slots.iter_mut() {
            if clear_slots || matches!(slot, SlotView::Active) {
                *slot = SlotView::Empty;
            }
        }
    }

    /// Apply one event. Returns the outcome when a session has finished.
    pub fn apply(&mut self, event: BoothEvent) -> Option<SessionOutcome> {
        match event {
            BoothEvent::FrameReady(frame) => self.update_preview(frame),
            BoothEvent::SessionStarted { stamp } => {
                log::debug!("View: session {} started", stamp);
                self.busy = true;
                self.instruction = None;
                self.countdown = None;
                self.headline = self.theme.definition().format_headline(&self.event_name);
                self.slots.iter_mut().for_each(|slot| *slot = SlotView::Empty);
            }
            BoothEvent::SlotHighlighted(index) => {
                for slot in self.slots.iter_mut() {
                    if matches!(slot, SlotView::Active) {
                        *slot = SlotView::Empty;
                    }
                }
                if let Some(slot) = self.slots.get_mut(index) {
                    *slot = SlotView::Active;
                }
            }
            BoothEvent::CountdownTick { value, .. } => self.countdown = Some(value),
            BoothEvent::CountdownCleared => self.countdown = None,
            BoothEvent::SlotCaptured { slot, frame } => {
                if let Some(view) = self.slots.get_mut(slot) {
                    *view = SlotView::Captured(frame);
                }
            }
            BoothEvent::SessionFinished(outcome) => {
                match &outcome {
                    SessionOutcome::Complete(_) => self.show_ready(THANK_YOU_MESSAGE, false),
                    SessionOutcome::Aborted { .. } => self.show_ready(INTERRUPTED_MESSAGE, true),
                }
                return Some(outcome);
            }
            BoothEvent::SourceLost(reason) => {
                log::warn!("View: source lost ({})", reason);
                self.preview = None;
                if !self.busy {
                    self.instruction = Some(SOURCE_LOST_MESSAGE.to_string());
                }
            }
        }
        None
    }

    fn update_preview(&mut self, frame: Frame) {
        // Skip invalid frames so the preview never blanks
        if frame.width() == 0 || frame.height() == 0 {
            return;
        }
        if self.instruction.as_deref() == Some(PREVIEW_PENDING_MESSAGE) {
            self.instruction = None;
        }
        self.preview = Some(frame);
    }
}
