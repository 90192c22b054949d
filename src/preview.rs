use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::events::{emit, wait_for_shutdown, BoothEvent, EventSender};
use crate::frame_source::FrameSource;

/// Continuously pulls frames for the live preview.
pub struct PreviewLoop {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PreviewLoop {
    pub fn spawn(source: Arc<dyn FrameSource>, interval: Duration, events: EventSender) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(source, interval, events, shutdown_rx));
        log::debug!("Preview loop started ({:?} interval)", interval);
        Self {
            shutdown,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Signal the loop and wait for it to exit.
    pub async fn stop(mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("Preview task ended abnormally: {}", e);
            }
        }
        log::debug!("Preview loop stopped");
    }
}

impl Drop for PreviewLoop {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

async fn run(
    source: Arc<dyn FrameSource>,
    interval: Duration,
    events: EventSender,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = wait_for_shutdown(&mut shutdown) => break,
        }

        if !source.is_open() {
            log::warn!("Preview source closed");
            emit(&events, BoothEvent::SourceLost("Camera disconnected.".to_string()));
            break;
        }

        let frame = tokio::select! {
            frame = source.latest_frame() => frame,
            _ = wait_for_shutdown(&mut shutdown) => break,
        };

        match frame {
            Some(frame) if frame.width() > 0 && frame.height() > 0 => {
                emit(&events, BoothEvent::FrameReady(frame));
            }
            Some(_) => log::trace!("Skipping empty preview frame"),
            None => log::trace!("No preview frame available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{event_channel, EventReceiver};
    use crate::frame_source::{DeviceHandle, SyntheticFrameSource};
    use image::RgbImage;

    async fn next_event(receiver: &EventReceiver) -> BoothEvent {
        loop {
            if let Ok(event) = receiver.try_recv() {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn test_preview_publishes_frames() {
        let source = SyntheticFrameSource::test_pattern(32, 24);
        source.open(&DeviceHandle::new("synthetic", "Test")).await.unwrap();
        let (sender, receiver) = event_channel();

        let preview = PreviewLoop::spawn(Arc::new(source), Duration::from_millis(1), sender);
        for _ in 0..3 {
            match next_event(&receiver).await {
                BoothEvent::FrameReady(frame) => assert_eq!(frame.dimensions(), (32, 24)),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(preview.is_running());
        preview.stop().await;
    }

    #[tokio::test]
    async fn test_preview_skips_empty_frames() {
        let source = SyntheticFrameSource::scripted(vec![RgbImage::new(0, 0), RgbImage::new(8, 8)]);
        source.open(&DeviceHandle::new("synthetic", "Test")).await.unwrap();
        let (sender, receiver) = event_channel();

        let preview = PreviewLoop::spawn(Arc::new(source), Duration::from_millis(1), sender);
        match next_event(&receiver).await {
            BoothEvent::FrameReady(frame) => assert_eq!(frame.dimensions(), (8, 8)),
            other => panic!("unexpected event {:?}", other),
        }
        preview.stop().await;
    }

    #[tokio::test]
    async fn test_closed_source_reports_loss() {
        let source = Arc::new(SyntheticFrameSource::test_pattern(8, 8));
        source.open(&DeviceHandle::new("synthetic", "Test")).await.unwrap();
        source.close().await;
        let (sender, receiver) = event_channel();

        let preview = PreviewLoop::spawn(source, Duration::from_millis(1), sender);
        assert!(matches!(next_event(&receiver).await, BoothEvent::SourceLost(_)));
        preview.stop().await;
    }
}
