use anyhow::Result;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use photobooth::config::CameraBackend;
use photobooth::{
    Config, DeviceHandle, FrameSource, Notification, PhotoBooth, SessionStart, SyntheticFrameSource, TextStyleId,
    ThemeId,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("📸 Starting PhotoBooth");

    let config = Config::load()?;
    info!(
        "Configuration loaded: {}x{} capture, saving to {}",
        config.camera.width,
        config.camera.height,
        config.output.save_dir.display()
    );

    let mut booth = PhotoBooth::new(config.clone())?;
    let result = run(&mut booth, &config).await;
    if let Err(e) = &result {
        log::error!("Booth stopped: {:#}", e);
    }

    booth.shutdown().await;
    // Strips saved during shutdown report here
    let remaining = booth.pump();
    print_notifications(&booth, remaining);
    info!("PhotoBooth shut down gracefully");
    result
}

async fn run(booth: &mut PhotoBooth, config: &Config) -> Result<()> {
    let (source, device) = select_source(config).await;
    if let Err(e) = booth.use_source(Arc::clone(&source), &device).await {
        log::warn!("{}: {}. Running with the test pattern.", e.user_message(), e);
        let fallback: Arc<dyn FrameSource> =
            Arc::new(SyntheticFrameSource::test_pattern(config.camera.width, config.camera.height));
        booth
            .use_source(fallback, &DeviceHandle::new("synthetic", "Test Pattern"))
            .await?;
    }
    booth.start_preview()?;

    print_selection(booth);
    if let Some(message) = booth.view().instruction() {
        println!("{}", message);
    }
    println!("Press Enter to begin a session, or type q to quit.");
    println!("{}", COMMAND_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(16));
    let mut last_countdown = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let input = match line? {
                    Some(input) => input,
                    None => break,
                };
                match Command::parse(&input) {
                    Command::Quit => break,
                    Command::Start => match booth.begin_session() {
                        Ok(SessionStart::Started { stamp }) => {
                            println!("{}", booth.view().headline());
                            info!("Session {} started", stamp);
                        }
                        Ok(SessionStart::Ignored) => println!("A session is already running."),
                        Err(e) => println!("{} ({})", e.user_message(), e),
                    },
                    command => apply_selection(booth, command),
                }
            }
            _ = ticker.tick() => {
                let notifications = booth.pump();
                print_notifications(booth, notifications);

                let countdown = booth.view().countdown();
                if countdown != last_countdown {
                    if let Some(value) = countdown {
                        println!("{}...", value);
                    }
                    last_countdown = countdown;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

const COMMAND_HELP: &str = "Other commands: theme [key], style <key>, event <name>, dir <path>";

/// One line typed at the booth terminal.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Start,
    Quit,
    Theme(Option<&'a str>),
    Style(&'a str),
    Event(&'a str),
    SaveDir(&'a str),
    Help,
}

impl<'a> Command<'a> {
    fn parse(input: &'a str) -> Self {
        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Command::Quit;
        }
        let (word, rest) = match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (input, ""),
        };
        match word.to_ascii_lowercase().as_str() {
            "theme" if rest.is_empty() => Command::Theme(None),
            "theme" => Command::Theme(Some(rest)),
            "style" | "dir" if rest.is_empty() => Command::Help,
            "style" => Command::Style(rest),
            "event" => Command::Event(rest),
            "dir" => Command::SaveDir(rest),
            "help" => Command::Help,
            _ => Command::Start,
        }
    }
}

fn apply_selection(booth: &mut PhotoBooth, command: Command<'_>) {
    if command != Command::Help && booth.view().is_busy() {
        println!("Wait for the current session to finish.");
        return;
    }
    match command {
        Command::Theme(key) => {
            let theme = match key {
                None => booth.settings().theme.next(),
                Some(key) => match ThemeId::from_key(key) {
                    Some(theme) => theme,
                    None => {
                        let keys: Vec<_> = ThemeId::all().iter().map(ThemeId::key).collect();
                        println!("Unknown theme '{}'. Choose one of: {}", key, keys.join(", "));
                        return;
                    }
                },
            };
            booth.set_theme(theme);
        }
        Command::Style(key) => match TextStyleId::from_key(key) {
            Some(style) => booth.set_text_style(style),
            None => {
                let keys: Vec<_> = TextStyleId::all().iter().map(TextStyleId::key).collect();
                println!("Unknown text style '{}'. Choose one of: {}", key, keys.join(", "));
                return;
            }
        },
        Command::Event(name) => booth.set_event_name(name),
        Command::SaveDir(dir) => booth.set_save_dir(dir),
        Command::Help => {
            println!("{}", COMMAND_HELP);
            return;
        }
        Command::Start | Command::Quit => return,
    }
    print_selection(booth);
}

fn print_selection(booth: &PhotoBooth) {
    let settings = booth.settings();
    let theme = settings.theme.definition();
    println!(
        "{} {} ({}, {} text), saving to {}",
        theme.emoji,
        theme.format_statement(&settings.event_name),
        theme.display_name,
        settings.text_style,
        booth.save_dir().display()
    );
    println!("{}", booth.view().headline());
}

fn print_notifications(booth: &PhotoBooth, notifications: Vec<Notification>) {
    for notification in notifications {
        match notification {
            Notification::Info(text) => println!("{}", text),
            Notification::Error { summary, detail } => println!("{} {}", summary, detail),
        }
        if let Some(message) = booth.view().instruction() {
            println!("{}", message);
        }
    }
}

/// Pick the frame source the configuration asks for.
async fn select_source(config: &Config) -> (Arc<dyn FrameSource>, DeviceHandle) {
    let test_pattern = || -> (Arc<dyn FrameSource>, DeviceHandle) {
        (
            Arc::new(SyntheticFrameSource::test_pattern(config.camera.width, config.camera.height)),
            DeviceHandle::new("synthetic", "Test Pattern"),
        )
    };

    match config.camera.backend {
        CameraBackend::TestPattern => test_pattern(),
        CameraBackend::Command => command_source(config).await.unwrap_or_else(test_pattern),
    }
}

#[cfg(feature = "camera")]
async fn command_source(config: &Config) -> Option<(Arc<dyn FrameSource>, DeviceHandle)> {
    use photobooth::camera_controller::CommandFrameSource;

    let source = CommandFrameSource::new(&config.camera);
    let devices = source.list_available().await;
    let device = match &config.camera.device {
        Some(id) => devices
            .into_iter()
            .find(|device| &device.id == id)
            .unwrap_or_else(|| DeviceHandle::new(id.clone(), id.clone())),
        None => match devices.into_iter().next() {
            Some(device) => device,
            None => {
                log::warn!("No camera detected");
                return None;
            }
        },
    };
    Some((Arc::new(source), device))
}

#[cfg(not(feature = "camera"))]
async fn command_source(_config: &Config) -> Option<(Arc<dyn FrameSource>, DeviceHandle)> {
    log::warn!("Built without camera support");
    None
}
