use anyhow::Result;
use chrono::NaiveDate;
use crossbeam::channel::{self, Receiver, Sender};
use image::RgbImage;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::compose::StripComposer;
use crate::config::Config;
use crate::dispatcher::EventDispatcher;
use crate::error::{BoothError, BoothResult};
use crate::events::{event_channel, EventSender};
use crate::frame_source::{DeviceHandle, FrameSource};
use crate::output::{DispatchReport, OutputDispatcher};
use crate::preview::PreviewLoop;
use crate::sequencer::{CaptureSequencer, CaptureSession, CaptureTiming, SessionOutcome, SessionStart};
use crate::theme::{TextStyleId, ThemeId};
use crate::view::{BoothView, READY_MESSAGE};

/// Selections made at the booth, held in memory for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoothSettings {
    pub theme: ThemeId,
    pub text_style: TextStyleId,
    pub event_name: String,
}

impl BoothSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            theme: config.theme_id()?,
            text_style: config.text_style_id()?,
            event_name: config.strip.event_name.clone(),
        })
    }
}

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Info(String),
    Error { summary: String, detail: String },
}

impl Notification {
    fn from_error(error: &BoothError) -> Self {
        Notification::Error {
            summary: error.user_message().to_string(),
            detail: error.to_string(),
        }
    }
}

/// Wires the frame source, sequencer, composer and output together.
///
/// Background tasks only send events; `pump` applies them on the caller's
/// side and runs composition and output when a session completes.
pub struct PhotoBooth {
    config: Config,
    settings: BoothSettings,
    source: Option<Arc<dyn FrameSource>>,
    sequencer: CaptureSequencer,
    preview: Option<PreviewLoop>,
    composer: StripComposer,
    output: OutputDispatcher,
    events: EventSender,
    dispatcher: EventDispatcher,
    view: BoothView,
    last_strip: Option<RgbImage>,
    fixed_date: Option<NaiveDate>,
    reports: Sender<DispatchReport>,
    report_rx: Receiver<DispatchReport>,
    pending_output: Vec<JoinHandle<()>>,
}

impl PhotoBooth {
    pub fn new(config: Config) -> Result<Self> {
        let composer = StripComposer::from_config(&config)?;
        let output = OutputDispatcher::from_config(&config);
        Self::with_parts(config, composer, output)
    }

    pub fn with_parts(config: Config, composer: StripComposer, output: OutputDispatcher) -> Result<Self> {
        let settings = BoothSettings::from_config(&config)?;
        let (events, receiver) = event_channel();
        let sequencer = CaptureSequencer::new(CaptureTiming::from(&config), events.clone());
        let view = BoothView::new(settings.theme, &settings.event_name);
        let (reports, report_rx) = channel::unbounded();

        log::info!(
            "Booth ready: theme {}, style {}, saving to {}",
            settings.theme,
            settings.text_style,
            output.save_dir().display()
        );

        Ok(Self {
            config,
            settings,
            source: None,
            sequencer,
            preview: None,
            composer,
            output,
            events,
            dispatcher: EventDispatcher::new(receiver),
            view,
            last_strip: None,
            fixed_date: None,
            reports,
            report_rx,
            pending_output: Vec::new(),
        })
    }

    pub fn settings(&self) -> &BoothSettings {
        &self.settings
    }

    pub fn view(&self) -> &BoothView {
        &self.view
    }

    /// The most recently composed strip.
    pub fn last_strip(&self) -> Option<&RgbImage> {
        self.last_strip.as_ref()
    }

    pub fn set_theme(&mut self, theme: ThemeId) {
        self.settings.theme = theme;
        self.view.set_selection(theme, &self.settings.event_name);
    }

    pub fn set_text_style(&mut self, style: TextStyleId) {
        self.settings.text_style = style;
    }

    pub fn set_event_name(&mut self, name: &str) {
        self.settings.event_name = name.to_string();
        self.view.set_selection(self.settings.theme, name);
    }

    pub fn set_save_dir(&mut self, dir: impl Into<PathBuf>) {
        self.output.set_save_dir(dir);
    }

    pub fn save_dir(&self) -> &std::path::Path {
        self.output.save_dir()
    }

    /// Date printed on strips instead of today's.
    pub fn set_strip_date(&mut self, date: Option<NaiveDate>) {
        self.fixed_date = date;
    }

    /// Switch to `source`, closing the current one first.
    pub async fn use_source(&mut self, source: Arc<dyn FrameSource>, device: &DeviceHandle) -> BoothResult<()> {
        if self.sequencer.status().is_active() {
            return Err(BoothError::AlreadyInProgress);
        }

        self.release_source().await;

        source.open(device).await?;
        log::info!("Using camera {} ({})", device.name, device.id);
        self.source = Some(source);
        self.view.show_ready(READY_MESSAGE, true);
        Ok(())
    }

    /// Start publishing live preview frames from the current source.
    pub fn start_preview(&mut self) -> BoothResult<()> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| BoothError::DeviceUnavailable("no camera selected".to_string()))?;

        if self.preview.as_ref().map_or(false, PreviewLoop::is_running) {
            return Ok(());
        }
        self.preview = Some(PreviewLoop::spawn(
            source,
            self.config.preview_interval(),
            self.events.clone(),
        ));
        Ok(())
    }

    pub fn begin_session(&mut self) -> BoothResult<SessionStart> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| BoothError::DeviceUnavailable("no camera selected".to_string()))?;
        self.sequencer.start_session(source)
    }

    /// Apply pending events and finish completed sessions.
    ///
    /// Saving and printing run on a blocking task; their report shows up in
    /// a later call.
    pub fn pump(&mut self) -> Vec<Notification> {
        let finished = self.dispatcher.drain(&mut self.view);
        let mut notifications: Vec<Notification> = finished
            .into_iter()
            .filter_map(|outcome| match outcome {
                SessionOutcome::Complete(session) => self.finish_session(&session),
                SessionOutcome::Aborted { error, captured, .. } => {
                    log::warn!("Session aborted with {} shot(s) kept for display", captured.len());
                    Some(Notification::from_error(&error))
                }
            })
            .collect();

        self.pending_output.retain(|task| !task.is_finished());
        notifications.extend(
            self.report_rx
                .try_iter()
                .map(|report| Notification::Info(report.notification())),
        );
        notifications
    }

    /// Compose the strip, then hand it to the output dispatcher.
    fn finish_session(&mut self, session: &CaptureSession) -> Option<Notification> {
        let theme = self.settings.theme.definition();
        let style = self.settings.text_style.definition();
        let event_name = &self.settings.event_name;

        let composed = match self.fixed_date {
            Some(date) => self.composer.compose(session.frames(), theme, style, event_name, date),
            None => self.composer.compose_today(session.frames(), theme, style, event_name),
        };
        let strip = match composed {
            Ok(strip) => strip,
            Err(e) => {
                log::error!("Composing session {} failed: {}", session.stamp, e);
                return Some(Notification::from_error(&e));
            }
        };

        let output = self.output.clone();
        let reports = self.reports.clone();
        let image = strip.clone();
        let event_name = event_name.clone();
        let stamp = session.stamp.clone();
        let job = move || {
            let report = output.dispatch(&image, &event_name, &stamp);
            if reports.send(report).is_err() {
                log::debug!("Booth gone before output of {} was reported", stamp);
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => self.pending_output.push(handle.spawn_blocking(job)),
            Err(_) => job(),
        }
        self.last_strip = Some(strip);
        None
    }

    /// Stop background tasks and release the camera.
    ///
    /// Strips still being saved or printed are finished first; call `pump`
    /// afterwards to collect their reports.
    pub async fn shutdown(&mut self) {
        self.sequencer.shutdown().await;
        self.release_source().await;
        for task in self.pending_output.drain(..) {
            if let Err(e) = task.await {
                log::warn!("Output task ended abnormally: {}", e);
            }
        }
        self.dispatcher.drain(&mut self.view);
        log::info!("Booth shut down");
    }

    async fn release_source(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.stop().await;
        }
        if let Some(source) = self.source.take() {
            source.close().await;
        }
    }
}
