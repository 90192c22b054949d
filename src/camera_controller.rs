use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::process::Command;
use tokio::sync::{Mutex, RwLock};

use crate::config::CameraConfig;
use crate::error::{BoothError, BoothResult};
use crate::frame_source::{DeviceHandle, Frame, FrameSource};

/// Camera backed by a still-capture program (`fswebcam` by default).
///
/// Every frame request runs the program once, writing a JPEG into a unique
/// temporary file which is decoded and removed again. Requests are serialized
/// so the preview loop and the capture sequencer never share a temp file.
pub struct CommandFrameSource {
    program: String,
    args_template: Vec<String>,
    width: u32,
    height: u32,
    device: RwLock<Option<DeviceHandle>>,
    open: AtomicBool,
    capture_lock: Mutex<()>,
    temp_dir: PathBuf,
    capture_counter: AtomicU64,
}

impl CommandFrameSource {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            program: config.capture_program.clone(),
            args_template: config.capture_args.clone(),
            width: config.width,
            height: config.height,
            device: RwLock::new(None),
            open: AtomicBool::new(false),
            capture_lock: Mutex::new(()),
            temp_dir: std::env::temp_dir(),
            capture_counter: AtomicU64::new(0),
        }
    }

    /// Expand `{device}`, `{width}`, `{height}` and `{output}` in the argument template.
    fn capture_args(&self, device: &str, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        self.args_template
            .iter()
            .map(|arg| {
                arg.replace("{device}", device)
                    .replace("{width}", &self.width.to_string())
                    .replace("{height}", &self.height.to_string())
                    .replace("{output}", &output)
            })
            .collect()
    }

    fn next_temp_path(&self) -> PathBuf {
        let n = self.capture_counter.fetch_add(1, Ordering::Relaxed);
        self.temp_dir
            .join(format!("photobooth_capture_{}_{}.jpg", std::process::id(), n))
    }

    async fn program_available(&self) -> bool {
        match Command::new(&self.program).arg("--help").output().await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("{} not found: {}", self.program, e);
                false
            }
        }
    }

    async fn capture_to(&self, device: &DeviceHandle, path: &Path) -> Option<Frame> {
        let args = self.capture_args(&device.id, path);
        log::debug!("Capture command: {} {}", self.program, args.join(" "));

        let output = match Command::new(&self.program).args(&args).output().await {
            Ok(output) => output,
            Err(e) => {
                log::error!("{} command failed: {}", self.program, e);
                return None;
            }
        };

        if !output.status.success() {
            log::warn!("{} failed with status: {}", self.program, output.status);
            log::warn!("stderr: {}", String::from_utf8_lossy(&output.stderr));
            return None;
        }

        match image::open(path) {
            Ok(img) => {
                let rgb_img = img.to_rgb8();
                log::debug!("Frame captured: {}x{}", rgb_img.width(), rgb_img.height());
                Some(Arc::new(rgb_img))
            }
            Err(e) => {
                log::warn!("Failed to load captured frame: {}", e);
                None
            }
        }
    }
}

async fn discard_temp_frame(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove temporary frame {}: {}", path.display(), e);
        }
    }
}

/// Human readable name of a V4L2 node, from sysfs when available.
async fn video_device_name(node: &str) -> String {
    let sysfs = format!("/sys/class/video4linux/{}/name", node);
    match fs::read_to_string(&sysfs).await {
        Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => node.to_string(),
    }
}

#[async_trait]
impl FrameSource for CommandFrameSource {
    async fn list_available(&self) -> Vec<DeviceHandle> {
        let mut nodes = Vec::new();
        let mut entries = match fs::read_dir("/dev").await {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Unable to enumerate /dev: {}", e);
                return nodes;
            }
        };

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("video") {
                names.push(name);
            }
        }
        // Sort for a stable camera order
        names.sort();

        for name in names {
            let label = video_device_name(&name).await;
            nodes.push(DeviceHandle::new(format!("/dev/{}", name), label));
        }

        log::info!("Found {} video device(s)", nodes.len());
        nodes
    }

    async fn open(&self, device: &DeviceHandle) -> BoothResult<()> {
        log::info!("Opening camera {} ({})", device.name, device.id);

        if !Path::new(&device.id).exists() {
            return Err(BoothError::DeviceUnavailable(format!(
                "{} does not exist",
                device.id
            )));
        }

        if !self.program_available().await {
            return Err(BoothError::DeviceUnavailable(format!(
                "capture program '{}' is not installed",
                self.program
            )));
        }

        *self.device.write().await = Some(device.clone());
        self.open.store(true, Ordering::SeqCst);
        log::info!("Camera {} opened at {}x{}", device.id, self.width, self.height);
        Ok(())
    }

    async fn latest_frame(&self) -> Option<Frame> {
        if !self.is_open() {
            return None;
        }
        let device = self.device.read().await.clone()?;

        let _guard = self.capture_lock.lock().await;

        // An unplugged camera takes its device node with it.
        if !Path::new(&device.id).exists() {
            log::error!("Camera {} disappeared", device.id);
            self.open.store(false, Ordering::SeqCst);
            return None;
        }

        let temp_path = self.next_temp_path();
        let frame = self.capture_to(&device, &temp_path).await;

        discard_temp_frame(&temp_path).await;

        frame
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        // Wait for an in-flight capture so its temp file is cleaned up.
        let _guard = self.capture_lock.lock().await;
        if self.open.swap(false, Ordering::SeqCst) {
            if let Some(device) = self.device.write().await.take() {
                log::info!("Camera {} closed", device.id);
            }
        }
    }
}
