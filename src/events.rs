use crossbeam::channel::{self, Receiver, Sender};
use tokio::sync::watch;

use crate::frame_source::Frame;
use crate::sequencer::SessionOutcome;

/// Messages from background tasks to the UI-side consumer.
///
/// Background tasks never touch booth state directly; they only send these.
#[derive(Debug)]
pub enum BoothEvent {
    FrameReady(Frame),
    SessionStarted { stamp: String },
    SlotHighlighted(usize),
    CountdownTick { slot: usize, value: u32 },
    CountdownCleared,
    SlotCaptured { slot: usize, frame: Frame },
    SessionFinished(SessionOutcome),
    SourceLost(String),
}

pub type EventSender = Sender<BoothEvent>;
pub type EventReceiver = Receiver<BoothEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    channel::unbounded()
}

/// Send without caring whether the consumer is still around.
pub(crate) fn emit(sender: &EventSender, event: BoothEvent) {
    if sender.send(event).is_err() {
        log::debug!("Event consumer gone, dropping event");
    }
}

/// Resolves once shutdown has been requested, or the signalling side is gone.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
