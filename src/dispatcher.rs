use crossbeam::channel::TryRecvError;

use crate::events::EventReceiver;
use crate::sequencer::SessionOutcome;
use crate::view::BoothView;

/// Single consumer of booth events; the only place view state changes.
pub struct EventDispatcher {
    receiver: EventReceiver,
}

impl EventDispatcher {
    pub fn new(receiver: EventReceiver) -> Self {
        Self { receiver }
    }

    /// Apply every pending event to `view` without blocking.
    ///
    /// Returns the outcomes of sessions that finished since the last call.
    pub fn drain(&self, view: &mut BoothView) -> Vec<SessionOutcome> {
        let mut finished = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(outcome) = view.apply(event) {
                        finished.push(outcome);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("All event producers are gone");
                    break;
                }
            }
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{event_channel, BoothEvent};
    use crate::error::BoothError;
    use crate::theme::ThemeId;

    #[test]
    fn test_drain_applies_in_order() {
        let (sender, receiver) = event_channel();
        let dispatcher = EventDispatcher::new(receiver);
        let mut view = BoothView::new(ThemeId::BirthdayCelebration, "Sam");

        sender
            .send(BoothEvent::SessionStarted {
                stamp: "20240309_141503".to_string(),
            })
            .unwrap();
        sender.send(BoothEvent::SlotHighlighted(0)).unwrap();
        sender.send(BoothEvent::CountdownTick { slot: 0, value: 2 }).unwrap();

        assert!(dispatcher.drain(&mut view).is_empty());
        assert!(view.is_busy());
        assert_eq!(view.countdown(), Some(2));

        // Nothing pending
        assert!(dispatcher.drain(&mut view).is_empty());
    }

    #[test]
    fn test_drain_returns_finished_sessions() {
        let (sender, receiver) = event_channel();
        let dispatcher = EventDispatcher::new(receiver);
        let mut view = BoothView::new(ThemeId::BirthdayCelebration, "Sam");

        sender
            .send(BoothEvent::SessionFinished(SessionOutcome::Aborted {
                stamp: "20240309_141503".to_string(),
                error: BoothError::CaptureInterrupted("Failed to capture image.".to_string()),
                captured: Vec::new(),
            }))
            .unwrap();
        drop(sender);

        let finished = dispatcher.drain(&mut view);
        assert_eq!(finished.len(), 1);
        assert!(!view.is_busy());
    }
}
