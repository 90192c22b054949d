use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{BoothError, BoothResult};
use crate::events::{emit, wait_for_shutdown, BoothEvent, EventSender};
use crate::frame_source::{Frame, FrameSource};

/// Number of shots in one photo strip.
pub const SHOTS_PER_SESSION: usize = 5;

pub const SESSION_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    AwaitingStart,
    Counting,
    Capturing,
    Complete,
    Aborted,
}

impl SessionStatus {
    /// A new session may start unless one of these is current.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionStatus::AwaitingStart | SessionStatus::Counting | SessionStatus::Capturing
        )
    }
}

#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// 0 is the hero shot, 1..=4 fill the thumbnail row left to right
    pub ordinal: usize,
    pub image: Frame,
}

/// The shots of one photo-strip run.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub stamp: String,
    pub started_at: DateTime<Local>,
    frames: Vec<CapturedFrame>,
}

impl CaptureSession {
    fn new(started_at: DateTime<Local>) -> Self {
        Self {
            stamp: started_at.format(SESSION_STAMP_FORMAT).to_string(),
            started_at,
            frames: Vec::with_capacity(SHOTS_PER_SESSION),
        }
    }

    fn push(&mut self, image: Frame) -> CapturedFrame {
        let captured = CapturedFrame {
            ordinal: self.frames.len(),
            image,
        };
        self.frames.push(captured.clone());
        captured
    }

    pub fn frames(&self) -> &[CapturedFrame] {
        &self.frames
    }

    pub fn is_complete(&self) -> bool {
        self.frames.len() == SHOTS_PER_SESSION
    }
}

#[derive(Debug)]
pub enum SessionOutcome {
    Complete(CaptureSession),
    /// Frames captured before the failure are kept for display only.
    Aborted {
        stamp: String,
        error: BoothError,
        captured: Vec<CapturedFrame>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    Started { stamp: String },
    /// A session was already running; nothing changed.
    Ignored,
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureTiming {
    pub countdown_from: u32,
    pub tick: Duration,
    /// Pause after the countdown so the overlay clears before the shot
    pub settle: Duration,
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            tick: Duration::from_secs(1),
            settle: Duration::from_millis(150),
        }
    }
}

impl From<&Config> for CaptureTiming {
    fn from(config: &Config) -> Self {
        Self {
            countdown_from: config.capture.countdown_from,
            tick: config.tick(),
            settle: config.settle(),
        }
    }
}

fn lock_status(status: &Mutex<SessionStatus>) -> MutexGuard<'_, SessionStatus> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs timed five-shot capture sessions, one at a time.
pub struct CaptureSequencer {
    timing: CaptureTiming,
    status: Arc<Mutex<SessionStatus>>,
    events: EventSender,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureSequencer {
    pub fn new(timing: CaptureTiming, events: EventSender) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            timing,
            status: Arc::new(Mutex::new(SessionStatus::Idle)),
            events,
            shutdown,
            task: Mutex::new(None),
        }
    }

    pub fn status(&self) -> SessionStatus {
        *lock_status(&self.status)
    }

    /// Claim the sequencer for a new session.
    fn try_begin(&self) -> BoothResult<()> {
        let mut status = lock_status(&self.status);
        if status.is_active() {
            return Err(BoothError::AlreadyInProgress);
        }
        *status = SessionStatus::AwaitingStart;
        Ok(())
    }

    /// Start a capture session on a background task.
    ///
    /// Calling this while a session is running leaves that session untouched
    /// and returns [`SessionStart::Ignored`].
    pub fn start_session(&self, source: Arc<dyn FrameSource>) -> BoothResult<SessionStart> {
        if *self.shutdown.borrow() {
            return Err(BoothError::CaptureInterrupted("booth is shutting down".to_string()));
        }

        match self.try_begin() {
            Ok(()) => {}
            Err(BoothError::AlreadyInProgress) => {
                log::debug!("Start requested while a session is running, ignoring");
                return Ok(SessionStart::Ignored);
            }
            Err(e) => return Err(e),
        }

        if !source.is_open() {
            *lock_status(&self.status) = SessionStatus::Idle;
            return Err(BoothError::DeviceUnavailable("camera is not open".to_string()));
        }

        let session = CaptureSession::new(Local::now());
        let stamp = session.stamp.clone();
        log::info!("Starting capture session {}", stamp);

        let runner = SessionRunner {
            timing: self.timing,
            status: Arc::clone(&self.status),
            events: self.events.clone(),
            shutdown: self.shutdown.subscribe(),
            source,
        };
        let handle = tokio::spawn(runner.run(session));

        let mut task = self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *task = Some(handle);

        Ok(SessionStart::Started { stamp })
    }

    /// Abort any running session and wait for its task to finish.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let handle = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::warn!("Capture task ended abnormally: {}", e);
            }
        }
        log::info!("Capture sequencer stopped");
    }
}

impl Drop for CaptureSequencer {
    fn drop(&mut self) {
        // A running session sees this at its next wait and aborts
        self.shutdown.send_replace(true);
    }
}

struct SessionRunner {
    timing: CaptureTiming,
    status: Arc<Mutex<SessionStatus>>,
    events: EventSender,
    shutdown: watch::Receiver<bool>,
    source: Arc<dyn FrameSource>,
}

impl SessionRunner {
    async fn run(mut self, mut session: CaptureSession) {
        emit(
            &self.events,
            BoothEvent::SessionStarted {
                stamp: session.stamp.clone(),
            },
        );

        let outcome = match self.capture_all(&mut session).await {
            Ok(()) => {
                self.set_status(SessionStatus::Complete);
                log::info!("Capture session {} complete", session.stamp);
                SessionOutcome::Complete(session)
            }
            Err(error) => {
                self.set_status(SessionStatus::Aborted);
                log::error!(
                    "Capture session {} aborted after {} shot(s): {}",
                    session.stamp,
                    session.frames.len(),
                    error
                );
                SessionOutcome::Aborted {
                    stamp: session.stamp,
                    error,
                    captured: session.frames,
                }
            }
        };

        emit(&self.events, BoothEvent::SessionFinished(outcome));
    }

    async fn capture_all(&mut self, session: &mut CaptureSession) -> BoothResult<()> {
        for slot in 0..SHOTS_PER_SESSION {
            self.set_status(SessionStatus::Counting);
            emit(&self.events, BoothEvent::SlotHighlighted(slot));

            for value in (1..=self.timing.countdown_from).rev() {
                emit(&self.events, BoothEvent::CountdownTick { slot, value });
                self.wait(self.timing.tick).await?;
            }
            emit(&self.events, BoothEvent::CountdownCleared);
            self.wait(self.timing.settle).await?;

            self.set_status(SessionStatus::Capturing);
            let frame = self.acquire().await?;
            let captured = session.push(frame);
            log::info!("Captured shot {}/{}", slot + 1, SHOTS_PER_SESSION);
            emit(
                &self.events,
                BoothEvent::SlotCaptured {
                    slot: captured.ordinal,
                    frame: captured.image,
                },
            );
        }

        if session.is_complete() {
            Ok(())
        } else {
            Err(BoothError::InsufficientFrames {
                expected: SHOTS_PER_SESSION,
                actual: session.frames.len(),
            })
        }
    }

    async fn acquire(&mut self) -> BoothResult<Frame> {
        if !self.source.is_open() {
            return Err(BoothError::CaptureInterrupted("Camera disconnected.".to_string()));
        }

        let source = Arc::clone(&self.source);
        let frame = tokio::select! {
            frame = source.latest_frame() => frame,
            _ = wait_for_shutdown(&mut self.shutdown) => {
                return Err(BoothError::CaptureInterrupted("booth is shutting down".to_string()));
            }
        };

        frame.ok_or_else(|| BoothError::CaptureInterrupted("Failed to capture image.".to_string()))
    }

    async fn wait(&mut self, duration: Duration) -> BoothResult<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = wait_for_shutdown(&mut self.shutdown) => {
                Err(BoothError::CaptureInterrupted("booth is shutting down".to_string()))
            }
        }
    }

    fn set_status(&self, next: SessionStatus) {
        let mut status = lock_status(&self.status);
        log::debug!("Session status {:?} -> {:?}", *status, next);
        *status = next;
    }
}
