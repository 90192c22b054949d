pub mod booth;
#[cfg(feature = "camera")]
pub mod camera_controller;
pub mod compose;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod fonts;
pub mod frame_source;
pub mod layout;
pub mod output;
pub mod preview;
pub mod sequencer;
pub mod session;
pub mod theme;
pub mod view;

pub use booth::{BoothSettings, Notification, PhotoBooth};
pub use compose::StripComposer;
pub use config::Config;
pub use error::{BoothError, BoothResult};
pub use frame_source::{DeviceHandle, Frame, FrameSource, SyntheticFrameSource};
pub use sequencer::{CaptureSequencer, CaptureSession, CapturedFrame, SessionOutcome, SessionStart};
pub use theme::{TextStyleId, ThemeId};
