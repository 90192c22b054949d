use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageError, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{BoothError, BoothResult};
use crate::session::{ensure_save_dir, strip_path};

pub const NO_PRINTER_MESSAGE: &str = "No printer selected or detected.";
pub const PRINT_FAILED_MESSAGE: &str = "Print could not be completed.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintTarget {
    pub name: String,
}

/// Where finished strips go.
pub trait OutputSink: Send + Sync {
    fn write(&self, image: &RgbImage, path: &Path) -> BoothResult<()>;

    fn choose_print_target(&self) -> Option<PrintTarget>;

    fn print(&self, image: &RgbImage, target: &PrintTarget) -> BoothResult<()>;
}

/// JPEG files on disk and CUPS (`lp`) printing.
pub struct SystemOutputSink {
    jpeg_quality: u8,
    printer: Option<String>,
    print_program: String,
    media: String,
    print_counter: AtomicU64,
}

impl SystemOutputSink {
    pub fn new(config: &Config) -> Self {
        Self {
            jpeg_quality: config.output.jpeg_quality,
            printer: config.print.printer.clone(),
            print_program: config.print.print_program.clone(),
            media: config.print.media.clone(),
            print_counter: AtomicU64::new(0),
        }
    }

    fn print_args(&self, target: &PrintTarget, file: &Path) -> Vec<String> {
        vec![
            "-d".to_string(),
            target.name.clone(),
            "-o".to_string(),
            "landscape".to_string(),
            "-o".to_string(),
            format!("media={}", self.media),
            "-o".to_string(),
            "fit-to-page".to_string(),
            file.to_string_lossy().to_string(),
        ]
    }

    fn spool_path(&self) -> PathBuf {
        let n = self.print_counter.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("photobooth_print_{}_{}.jpg", std::process::id(), n))
    }
}

fn remove_spool_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove print spool file {}: {}", path.display(), e);
        }
    }
}

/// Printer name from `lpstat -d` output.
fn parse_default_printer(output: &str) -> Option<String> {
    let line = output.lines().find(|line| line.contains("default destination"))?;
    if line.starts_with("no ") {
        return None;
    }
    let name = line.rsplit(':').next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

impl OutputSink for SystemOutputSink {
    fn write(&self, image: &RgbImage, path: &Path) -> BoothResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_save_dir(parent)?;
        }

        let file = File::create(path).map_err(|e| BoothError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality)
            .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
            .map_err(|e| match e {
                ImageError::IoError(source) => BoothError::io(path, source),
                other => BoothError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
                ),
            })?;

        log::info!("Strip written to {}", path.display());
        Ok(())
    }

    fn choose_print_target(&self) -> Option<PrintTarget> {
        if let Some(name) = &self.printer {
            return Some(PrintTarget { name: name.clone() });
        }

        let output = match Command::new("lpstat").arg("-d").output() {
            Ok(output) => output,
            Err(e) => {
                log::warn!("lpstat not available: {}", e);
                return None;
            }
        };
        let name = parse_default_printer(&String::from_utf8_lossy(&output.stdout))?;
        log::debug!("Default printer is {}", name);
        Some(PrintTarget { name })
    }

    fn print(&self, image: &RgbImage, target: &PrintTarget) -> BoothResult<()> {
        let spool = self.spool_path();
        self.write(image, &spool).map_err(|e| {
            log::error!("Failed to spool print job: {}", e);
            BoothError::PrintFailure(format!("Unable to create printer job for {}", target.name))
        })?;

        let args = self.print_args(target, &spool);
        log::debug!("Print command: {} {}", self.print_program, args.join(" "));
        let result = Command::new(&self.print_program).args(&args).output();
        remove_spool_file(&spool);

        let output = result.map_err(|e| {
            log::error!("{} command failed: {}", self.print_program, e);
            BoothError::PrintFailure(format!("Unable to create printer job for {}", target.name))
        })?;

        if !output.status.success() {
            log::warn!("{} failed with status: {}", self.print_program, output.status);
            log::warn!("stderr: {}", String::from_utf8_lossy(&output.stderr));
            return Err(BoothError::PrintFailure(PRINT_FAILED_MESSAGE.to_string()));
        }

        log::info!("Print job sent to {}", target.name);
        Ok(())
    }
}

#[derive(Debug)]
pub enum PrintOutcome {
    Sent(String),
    NoTarget,
    Disabled,
    Failed(BoothError),
}

/// What happened to one strip. Saving and printing succeed or fail independently.
#[derive(Debug)]
pub struct DispatchReport {
    pub saved: BoothResult<PathBuf>,
    pub printed: PrintOutcome,
}

impl DispatchReport {
    pub fn saved_path(&self) -> Option<&Path> {
        self.saved.as_ref().ok().map(PathBuf::as_path)
    }

    pub fn is_printed(&self) -> bool {
        matches!(self.printed, PrintOutcome::Sent(_))
    }

    /// Text for the user, one line per outcome.
    pub fn notification(&self) -> String {
        let mut lines = Vec::with_capacity(2);

        match &self.saved {
            Ok(path) => lines.push(format!("Saved strip to: {}", path.display())),
            Err(e) => lines.push(format!("{} {}", e.user_message(), e)),
        }

        match &self.printed {
            PrintOutcome::Sent(name) => lines.push(format!("Print sent to {}", name)),
            PrintOutcome::NoTarget => lines.push(NO_PRINTER_MESSAGE.to_string()),
            PrintOutcome::Disabled => {}
            PrintOutcome::Failed(BoothError::PrintFailure(message)) => lines.push(message.clone()),
            PrintOutcome::Failed(e) => lines.push(e.user_message().to_string()),
        }

        lines.join("\n")
    }
}

/// Saves and prints composed strips. Clones share the same sink.
#[derive(Clone)]
pub struct OutputDispatcher {
    sink: Arc<dyn OutputSink>,
    save_dir: PathBuf,
    print_enabled: bool,
}

impl OutputDispatcher {
    pub fn new(sink: Box<dyn OutputSink>, save_dir: impl Into<PathBuf>, print_enabled: bool) -> Self {
        Self {
            sink: Arc::from(sink),
            save_dir: save_dir.into(),
            print_enabled,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(SystemOutputSink::new(config)),
            config.output.save_dir.clone(),
            config.print.enabled,
        )
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn set_save_dir(&mut self, dir: impl Into<PathBuf>) {
        self.save_dir = dir.into();
        log::info!("Save directory set to {}", self.save_dir.display());
    }

    /// Save the strip, then print it. A failed save does not stop the print.
    pub fn dispatch(&self, image: &RgbImage, event_name: &str, stamp: &str) -> DispatchReport {
        let saved = self.save(image, event_name, stamp);
        if let Err(e) = &saved {
            log::error!("Saving strip failed: {}", e);
        }

        let printed = if !self.print_enabled {
            PrintOutcome::Disabled
        } else {
            match self.sink.choose_print_target() {
                None => {
                    log::warn!("No printer available");
                    PrintOutcome::NoTarget
                }
                Some(target) => match self.sink.print(image, &target) {
                    Ok(()) => PrintOutcome::Sent(target.name),
                    Err(e) => {
                        log::error!("Printing to {} failed: {}", target.name, e);
                        PrintOutcome::Failed(e)
                    }
                },
            }
        };

        DispatchReport { saved, printed }
    }

    fn save(&self, image: &RgbImage, event_name: &str, stamp: &str) -> BoothResult<PathBuf> {
        ensure_save_dir(&self.save_dir)?;
        let path = strip_path(&self.save_dir, event_name, stamp);
        self.sink.write(image, &path)?;
        Ok(std::fs::canonicalize(&path).unwrap_or(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use image::Rgb;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes through to a real JPEG file and records print jobs.
    struct RecordingSink {
        inner: SystemOutputSink,
        target: Option<PrintTarget>,
        fail_print: bool,
        printed: Arc<Mutex<Vec<String>>>,
    }

    impl OutputSink for RecordingSink {
        fn write(&self, image: &RgbImage, path: &Path) -> BoothResult<()> {
            self.inner.write(image, path)
        }

        fn choose_print_target(&self) -> Option<PrintTarget> {
            self.target.clone()
        }

        fn print(&self, _image: &RgbImage, target: &PrintTarget) -> BoothResult<()> {
            if self.fail_print {
                return Err(BoothError::PrintFailure(PRINT_FAILED_MESSAGE.to_string()));
            }
            self.printed.lock().unwrap().push(target.name.clone());
            Ok(())
        }
    }

    fn recording_sink(
        target: Option<&str>,
        fail_print: bool,
    ) -> (Box<dyn OutputSink>, Arc<Mutex<Vec<String>>>) {
        let printed = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            inner: SystemOutputSink::new(&ConfigBuilder::new().build().unwrap()),
            target: target.map(|name| PrintTarget { name: name.to_string() }),
            fail_print,
            printed: Arc::clone(&printed),
        };
        (Box::new(sink), printed)
    }

    fn sample_strip() -> RgbImage {
        RgbImage::from_pixel(180, 120, Rgb([200, 40, 90]))
    }

    #[test]
    fn test_parse_default_printer() {
        assert_eq!(
            parse_default_printer("system default destination: Canon_SELPHY\n"),
            Some("Canon_SELPHY".to_string())
        );
        assert_eq!(parse_default_printer("no system default destination\n"), None);
        assert_eq!(parse_default_printer(""), None);
    }

    #[test]
    fn test_print_args() {
        let sink = SystemOutputSink::new(&ConfigBuilder::new().build().unwrap());
        let target = PrintTarget {
            name: "booth".to_string(),
        };
        let args = sink.print_args(&target, Path::new("/tmp/strip.jpg"));
        assert_eq!(
            args,
            vec!["-d", "booth", "-o", "landscape", "-o", "media=4x6", "-o", "fit-to-page", "/tmp/strip.jpg"]
        );
    }

    fn spool_files() -> Vec<PathBuf> {
        let prefix = format!("photobooth_print_{}_", std::process::id());
        std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .map_or(false, |name| name.to_string_lossy().starts_with(&prefix))
            })
            .collect()
    }

    #[test]
    fn test_print_cleans_up_spool_file() {
        let mut config = ConfigBuilder::new().build().unwrap();
        let target = PrintTarget {
            name: "booth".to_string(),
        };

        config.print.print_program = "true".to_string();
        SystemOutputSink::new(&config).print(&sample_strip(), &target).unwrap();
        assert!(spool_files().is_empty());

        config.print.print_program = "false".to_string();
        let err = SystemOutputSink::new(&config)
            .print(&sample_strip(), &target)
            .unwrap_err();
        assert!(matches!(err, BoothError::PrintFailure(_)));
        assert!(spool_files().is_empty());

        // Already gone is not worth a warning
        remove_spool_file(&std::env::temp_dir().join("photobooth_print_missing.jpg"));
    }

    #[test]
    fn test_write_creates_readable_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("strip.jpg");
        let sink = SystemOutputSink::new(&ConfigBuilder::new().build().unwrap());

        sink.write(&sample_strip(), &path).unwrap();

        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (180, 120));
    }

    #[test]
    fn test_dispatch_saves_and_prints() {
        let temp_dir = TempDir::new().unwrap();
        let save_dir = temp_dir.path().join("photos");
        let (sink, printed) = recording_sink(Some("Booth_Printer"), false);
        let dispatcher = OutputDispatcher::new(sink, &save_dir, true);

        let report = dispatcher.dispatch(&sample_strip(), "Alex & Taylor!!", "20240309_141503");

        let saved = report.saved_path().unwrap();
        assert!(saved.is_absolute());
        assert!(saved.ends_with("alex___taylor___strip_20240309_141503.jpg"));
        assert!(save_dir.is_dir());
        assert!(report.is_printed());
        assert_eq!(*printed.lock().unwrap(), vec!["Booth_Printer".to_string()]);

        let text = report.notification();
        assert!(text.starts_with("Saved strip to: "));
        assert!(text.ends_with("Print sent to Booth_Printer"));
    }

    #[test]
    fn test_print_runs_even_when_save_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let (sink, printed) = recording_sink(Some("Booth_Printer"), false);
        let dispatcher = OutputDispatcher::new(sink, blocker.join("photos"), true);

        let report = dispatcher.dispatch(&sample_strip(), "", "20240309_141503");

        assert!(matches!(report.saved, Err(BoothError::IoFailure { .. })));
        assert!(report.is_printed());
        assert_eq!(printed.lock().unwrap().len(), 1);
        assert!(report.notification().contains("Unable to access the save folder."));
    }

    #[test]
    fn test_missing_printer_is_reported_separately() {
        let temp_dir = TempDir::new().unwrap();
        let (sink, _) = recording_sink(None, false);
        let dispatcher = OutputDispatcher::new(sink, temp_dir.path(), true);

        let report = dispatcher.dispatch(&sample_strip(), "Sam", "20240309_141503");

        assert!(report.saved.is_ok());
        assert!(matches!(report.printed, PrintOutcome::NoTarget));
        assert!(report.notification().ends_with(NO_PRINTER_MESSAGE));
    }

    #[test]
    fn test_failed_print_keeps_saved_strip() {
        let temp_dir = TempDir::new().unwrap();
        let (sink, _) = recording_sink(Some("Booth_Printer"), true);
        let dispatcher = OutputDispatcher::new(sink, temp_dir.path(), true);

        let report = dispatcher.dispatch(&sample_strip(), "Sam", "20240309_141503");

        assert!(report.saved_path().unwrap().is_file());
        assert!(matches!(report.printed, PrintOutcome::Failed(BoothError::PrintFailure(_))));
        assert!(report.notification().ends_with(PRINT_FAILED_MESSAGE));
    }

    #[test]
    fn test_disabled_printing_only_saves() {
        let temp_dir = TempDir::new().unwrap();
        let (sink, printed) = recording_sink(Some("Booth_Printer"), false);
        let dispatcher = OutputDispatcher::new(sink, temp_dir.path(), false);

        let report = dispatcher.dispatch(&sample_strip(), "Sam", "20240309_141503");

        assert!(matches!(report.printed, PrintOutcome::Disabled));
        assert!(printed.lock().unwrap().is_empty());
        assert!(!report.notification().contains('\n'));
    }
}
