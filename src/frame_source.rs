use async_trait::async_trait;
use image::{ImageBuffer, Rgb, RgbImage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{BoothError, BoothResult};

/// One raw snapshot from a video device, shared between preview and capture.
pub type Frame = Arc<RgbImage>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Backend specific identifier, e.g. `/dev/video0`
    pub id: String,
    pub name: String,
}

impl DeviceHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A live video device.
///
/// Every call is independently safe to make from several tasks at once: the
/// preview loop and the capture sequencer both ask for the latest frame from
/// the same source, and a frame is never handed out half-written.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn list_available(&self) -> Vec<DeviceHandle>;

    async fn open(&self, device: &DeviceHandle) -> BoothResult<()>;

    /// `None` when the device is closed or failed to deliver a frame.
    async fn latest_frame(&self) -> Option<Frame>;

    fn is_open(&self) -> bool;

    async fn close(&self);
}

enum Pattern {
    /// Moving gradient, used when no camera is connected
    TestPattern { width: u32, height: u32 },
    /// Frames handed out once each, in order
    Scripted(VecDeque<RgbImage>),
}

/// Frame source that needs no hardware.
pub struct SyntheticFrameSource {
    pattern: Mutex<Pattern>,
    open: AtomicBool,
    frames_served: AtomicU64,
}

impl SyntheticFrameSource {
    pub fn test_pattern(width: u32, height: u32) -> Self {
        Self::with_pattern(Pattern::TestPattern { width, height })
    }

    pub fn scripted(frames: Vec<RgbImage>) -> Self {
        Self::with_pattern(Pattern::Scripted(frames.into()))
    }

    /// One solid frame per colour, served in order.
    pub fn solid_colors(colors: &[[u8; 3]], width: u32, height: u32) -> Self {
        let frames = colors
            .iter()
            .map(|&color| ImageBuffer::from_pixel(width, height, Rgb(color)))
            .collect();
        Self::scripted(frames)
    }

    fn with_pattern(pattern: Pattern) -> Self {
        Self {
            pattern: Mutex::new(pattern),
            open: AtomicBool::new(false),
            frames_served: AtomicU64::new(0),
        }
    }

    pub fn frames_served(&self) -> u64 {
        self.frames_served.load(Ordering::Relaxed)
    }
}

fn render_test_pattern(width: u32, height: u32, tick: u64) -> RgbImage {
    let time = tick as f32 / 30.0;
    ImageBuffer::from_fn(width, height, |x, y| {
        let r = ((x as f32 / width as f32 * 155.0) + (time * 1.7).sin() * 50.0).max(0.0) as u8;
        let g = ((y as f32 / height as f32 * 155.0) + (time * 1.3).cos() * 50.0).max(0.0) as u8;
        let b = (((x + y) as f32 / (width + height) as f32 * 155.0) + (time * 2.3).sin() * 50.0)
            .max(0.0) as u8;
        Rgb([r.saturating_add(100), g.saturating_add(100), b.saturating_add(100)])
    })
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    async fn list_available(&self) -> Vec<DeviceHandle> {
        vec![DeviceHandle::new("synthetic", "Test Pattern")]
    }

    async fn open(&self, device: &DeviceHandle) -> BoothResult<()> {
        log::info!("Opening synthetic frame source ({})", device.name);
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn latest_frame(&self) -> Option<Frame> {
        if !self.is_open() {
            return None;
        }

        let mut pattern = self.pattern.lock().await;
        let frame = match &mut *pattern {
            Pattern::TestPattern { width, height } => {
                let tick = self.frames_served.load(Ordering::Relaxed);
                Some(render_test_pattern(*width, *height, tick))
            }
            Pattern::Scripted(frames) => frames.pop_front(),
        }?;

        self.frames_served.fetch_add(1, Ordering::Relaxed);
        Some(Arc::new(frame))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            log::info!("Synthetic frame source closed after {} frames", self.frames_served());
        }
    }
}

/// Fails to open, for exercising the unavailable-camera path.
pub struct UnavailableFrameSource;

#[async_trait]
impl FrameSource for UnavailableFrameSource {
    async fn list_available(&self) -> Vec<DeviceHandle> {
        Vec::new()
    }

    async fn open(&self, device: &DeviceHandle) -> BoothResult<()> {
        Err(BoothError::DeviceUnavailable(format!(
            "no camera behind {}",
            device.id
        )))
    }

    async fn latest_frame(&self) -> Option<Frame> {
        None
    }

    fn is_open(&self) -> bool {
        false
    }

    async fn close(&self) {}
}
