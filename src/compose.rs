use chrono::{Local, NaiveDate};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect as PixelRect;
use rusttype::{Font, Scale};

use crate::config::Config;
use crate::error::{BoothError, BoothResult};
use crate::fonts;
use crate::layout::{Rect, StripLayout, PADDING, TOP_BAR_HEIGHT};
use crate::sequencer::{CapturedFrame, SHOTS_PER_SESSION};
use crate::theme::{ThemeDefinition, ThemePalette, TextStyleDefinition};

/// Date shown in the strip header, e.g. "Oct 18, 2026".
pub const STRIP_DATE_FORMAT: &str = "%b %d, %Y";

const BORDER_WIDTH: u32 = 12;
const MAT_MARGIN: f32 = 6.0;
const HEADER_RULE_HEIGHT: u32 = 4;

/// Renders five captured frames into a themed 1800x1200 strip.
pub struct StripComposer {
    layout: StripLayout,
    font: Option<Font<'static>>,
    font_size: f32,
    accent_override: Option<Rgb<u8>>,
}

impl StripComposer {
    /// Composer without a font; header text is skipped.
    pub fn new() -> BoothResult<Self> {
        Ok(Self {
            layout: StripLayout::standard()?,
            font: None,
            font_size: 48.0,
            accent_override: None,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let font = match fonts::load_font(&config.strip.font) {
            Ok(font) => Some(font),
            Err(e) => {
                log::warn!("Strip text disabled: {}", e);
                None
            }
        };

        let mut composer = Self::new()?
            .with_font_size(config.strip.font_size)
            .with_accent(config.accent_override()?);
        composer.font = font;
        Ok(composer)
    }

    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_accent(mut self, accent: Option<Rgb<u8>>) -> Self {
        self.accent_override = accent;
        self
    }

    pub fn layout(&self) -> &StripLayout {
        &self.layout
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Compose with today's local date in the header.
    pub fn compose_today(
        &self,
        frames: &[CapturedFrame],
        theme: &ThemeDefinition,
        style: &TextStyleDefinition,
        event_name: &str,
    ) -> BoothResult<RgbImage> {
        self.compose(frames, theme, style, event_name, Local::now().date_naive())
    }

    /// Build the strip. Identical inputs give pixel-identical output.
    pub fn compose(
        &self,
        frames: &[CapturedFrame],
        theme: &ThemeDefinition,
        style: &TextStyleDefinition,
        event_name: &str,
        date: NaiveDate,
    ) -> BoothResult<RgbImage> {
        if frames.len() != SHOTS_PER_SESSION {
            return Err(BoothError::InsufficientFrames {
                expected: SHOTS_PER_SESSION,
                actual: frames.len(),
            });
        }
        for (index, frame) in frames.iter().enumerate() {
            if frame.ordinal != index {
                return Err(BoothError::CompositionFailed(format!(
                    "frame at position {} has ordinal {}",
                    index, frame.ordinal
                )));
            }
            if frame.image.width() == 0 || frame.image.height() == 0 {
                return Err(BoothError::CompositionFailed(format!(
                    "frame {} is empty",
                    index
                )));
            }
        }

        let palette = self.palette_for(theme);
        let mut canvas = RgbImage::from_pixel(
            self.layout.canvas_width,
            self.layout.canvas_height,
            palette.background,
        );
        self.paint_frame(&mut canvas, &palette);

        let hero = &frames[0].image;
        let hero_rect = self.layout.hero_placement(hero.width(), hero.height());
        place_photo(&mut canvas, hero, hero_rect, palette.photo_mat)?;

        for (slot, frame) in frames[1..].iter().enumerate() {
            let rect = self
                .layout
                .thumb_placement(slot, frame.image.width(), frame.image.height());
            place_photo(&mut canvas, &frame.image, rect, palette.photo_mat)?;
        }

        let label = style.apply(event_name);
        let date_text = date.format(STRIP_DATE_FORMAT).to_string();
        self.paint_header_text(&mut canvas, &palette, &label, &date_text);

        log::debug!(
            "Composed {} strip for '{}' ({}x{})",
            theme.key,
            label,
            canvas.width(),
            canvas.height()
        );
        Ok(canvas)
    }

    fn palette_for(&self, theme: &ThemeDefinition) -> ThemePalette {
        let mut palette = theme.palette;
        if let Some(accent) = self.accent_override {
            palette.accent = accent;
        }
        palette
    }

    /// Accent border around the canvas and a rule under the header.
    fn paint_frame(&self, canvas: &mut RgbImage, palette: &ThemePalette) {
        let (width, height) = canvas.dimensions();
        for inset in 0..BORDER_WIDTH {
            if width <= inset * 2 || height <= inset * 2 {
                break;
            }
            let rect = PixelRect::at(inset as i32, inset as i32)
                .of_size(width - inset * 2, height - inset * 2);
            draw_hollow_rect_mut(canvas, rect, palette.accent);
        }

        let rule_y = (PADDING + TOP_BAR_HEIGHT).round() as i32;
        let rule_width = self.layout.main_width.round() as u32;
        if rule_width > 0 {
            let rule = PixelRect::at(PADDING as i32, rule_y).of_size(rule_width, HEADER_RULE_HEIGHT);
            draw_filled_rect_mut(canvas, rule, palette.accent);
        }
    }

    fn paint_header_text(&self, canvas: &mut RgbImage, palette: &ThemePalette, label: &str, date: &str) {
        let font = match &self.font {
            Some(font) => font,
            None => return,
        };
        let scale = Scale::uniform(self.font_size);

        let (_, label_height) = text_size(scale, font, label);
        let (label_x, label_y) = self.layout.event_label_origin;
        let label_y = label_y + (TOP_BAR_HEIGHT - label_height as f32) / 2.0;
        draw_text_mut(
            canvas,
            palette.text,
            label_x.round() as i32,
            label_y.round() as i32,
            scale,
            font,
            label,
        );

        // Date is right-aligned inside its box
        let date_scale = Scale::uniform(self.font_size * 0.6);
        let (date_width, date_height) = text_size(date_scale, font, date);
        let date_box = self.layout.date_box;
        let date_x = (date_box.right() - date_width as f32).max(date_box.x);
        let date_y = date_box.y + (date_box.height - date_height as f32) / 2.0;
        draw_text_mut(
            canvas,
            palette.text,
            date_x.round() as i32,
            date_y.round() as i32,
            date_scale,
            font,
            date,
        );
    }
}

/// Scale `photo` into `rect` and paste it on a mat.
fn place_photo(canvas: &mut RgbImage, photo: &RgbImage, rect: Rect, mat: Rgb<u8>) -> BoothResult<()> {
    let width = rect.width.round() as u32;
    let height = rect.height.round() as u32;
    if width == 0 || height == 0 {
        return Err(BoothError::CompositionFailed(format!(
            "photo scaled to nothing ({}x{})",
            rect.width, rect.height
        )));
    }

    let mat_rect = PixelRect::at(
        (rect.x - MAT_MARGIN).round() as i32,
        (rect.y - MAT_MARGIN).round() as i32,
    )
    .of_size(width + (MAT_MARGIN * 2.0) as u32, height + (MAT_MARGIN * 2.0) as u32);
    draw_filled_rect_mut(canvas, mat_rect, mat);

    let scaled = imageops::resize(photo, width, height, FilterType::Triangle);
    imageops::overlay(canvas, &scaled, rect.x.round() as i64, rect.y.round() as i64);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CANVAS_WIDTH;
    use crate::theme::{TextStyleId, ThemeId};
    use std::sync::Arc;

    const COLORS: [[u8; 3]; 5] = [
        [220, 20, 60],
        [30, 144, 255],
        [50, 205, 50],
        [255, 215, 0],
        [138, 43, 226],
    ];

    fn solid_frames(width: u32, height: u32) -> Vec<CapturedFrame> {
        COLORS
            .iter()
            .enumerate()
            .map(|(ordinal, color)| CapturedFrame {
                ordinal,
                image: Arc::new(RgbImage::from_pixel(width, height, Rgb(*color))),
            })
            .collect()
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn close_to(pixel: &Rgb<u8>, expected: [u8; 3]) -> bool {
        pixel
            .0
            .iter()
            .zip(expected.iter())
            .all(|(a, b)| (*a as i16 - *b as i16).abs() <= 2)
    }

    #[test]
    fn test_output_is_fixed_size() {
        let composer = StripComposer::new().unwrap();
        let strip = composer
            .compose(
                &solid_frames(640, 480),
                ThemeId::BirthdayCelebration.definition(),
                TextStyleId::Modern.definition(),
                "Sam",
                test_date(),
            )
            .unwrap();
        assert_eq!(strip.dimensions(), (1800, 1200));
    }

    #[test]
    fn test_fewer_frames_is_insufficient() {
        let composer = StripComposer::new().unwrap();
        let frames = solid_frames(64, 48);

        for count in 0..SHOTS_PER_SESSION {
            let err = composer
                .compose(
                    &frames[..count],
                    ThemeId::WeddingElegance.definition(),
                    TextStyleId::Script.definition(),
                    "",
                    test_date(),
                )
                .unwrap_err();
            assert!(matches!(
                err,
                BoothError::InsufficientFrames { expected: 5, actual } if actual == count
            ));
        }
    }

    #[test]
    fn test_empty_frame_fails_composition() {
        let composer = StripComposer::new().unwrap();
        let mut frames = solid_frames(64, 48);
        frames[2].image = Arc::new(RgbImage::new(0, 0));

        let err = composer
            .compose(
                &frames,
                ThemeId::BrideGlam.definition(),
                TextStyleId::Classic.definition(),
                "Jo",
                test_date(),
            )
            .unwrap_err();
        assert!(matches!(err, BoothError::CompositionFailed(_)));
    }

    #[test]
    fn test_out_of_order_frames_are_rejected() {
        let composer = StripComposer::new().unwrap();
        let mut frames = solid_frames(64, 48);
        frames.swap(1, 2);

        let result = composer.compose(
            &frames,
            ThemeId::GroomClassic.definition(),
            TextStyleId::Classic.definition(),
            "Jo",
            test_date(),
        );
        assert!(matches!(result, Err(BoothError::CompositionFailed(_))));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let composer = StripComposer::new().unwrap();
        let frames = solid_frames(320, 240);
        let theme = ThemeId::WeddingElegance.definition();
        let style = TextStyleId::Script.definition();

        let first = composer.compose(&frames, theme, style, "Ana", test_date()).unwrap();
        let second = composer.compose(&frames, theme, style, "Ana", test_date()).unwrap();
        assert!(first.as_raw() == second.as_raw());
    }

    #[test]
    fn test_themes_are_visually_distinct() {
        let composer = StripComposer::new().unwrap();
        let frames = solid_frames(320, 240);
        let style = TextStyleId::Modern.definition();

        let birthday = composer
            .compose(&frames, ThemeId::BirthdayCelebration.definition(), style, "", test_date())
            .unwrap();
        let groom = composer
            .compose(&frames, ThemeId::GroomClassic.definition(), style, "", test_date())
            .unwrap();
        assert_ne!(birthday.get_pixel(CANVAS_WIDTH / 2, 20), groom.get_pixel(CANVAS_WIDTH / 2, 20));
        assert!(birthday.as_raw() != groom.as_raw());
    }

    #[test]
    fn test_accent_override_paints_border() {
        let composer = StripComposer::new()
            .unwrap()
            .with_accent(Some(Rgb([1, 2, 3])));
        let strip = composer
            .compose(
                &solid_frames(64, 48),
                ThemeId::BirthdayCelebration.definition(),
                TextStyleId::Modern.definition(),
                "",
                test_date(),
            )
            .unwrap();
        assert_eq!(*strip.get_pixel(0, 0), Rgb([1, 2, 3]));
        assert_eq!(*strip.get_pixel(1799, 1199), Rgb([1, 2, 3]));
    }

    #[test]
    fn test_hero_and_thumbnails_land_in_capture_order() {
        let composer = StripComposer::new().unwrap();
        let layout = composer.layout().clone();
        let strip = composer
            .compose(
                &solid_frames(640, 480),
                ThemeId::BirthdayCelebration.definition(),
                TextStyleId::Modern.definition(),
                "Sam",
                test_date(),
            )
            .unwrap();

        let (hx, hy) = layout.hero_placement(640, 480).center();
        assert!(close_to(strip.get_pixel(hx as u32, hy as u32), COLORS[0]));

        for slot in 0..4 {
            let (tx, ty) = layout.thumb_placement(slot, 640, 480).center();
            assert!(
                close_to(strip.get_pixel(tx as u32, ty as u32), COLORS[slot + 1]),
                "thumbnail {} has the wrong frame",
                slot
            );
        }
    }

    /// Pixels that differ between two strips of the same size.
    fn ink(
        with_text: &RgbImage,
        plain: &RgbImage,
        x_range: std::ops::Range<u32>,
        y_range: std::ops::Range<u32>,
    ) -> usize {
        y_range
            .flat_map(|y| x_range.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| with_text.get_pixel(x, y) != plain.get_pixel(x, y))
            .count()
    }

    #[test]
    fn test_strip_date_format() {
        assert_eq!(test_date().format(STRIP_DATE_FORMAT).to_string(), "Mar 09, 2024");
    }

    #[test]
    fn test_header_text_is_painted_in_its_boxes() {
        let font = match fonts::load_font("DejaVuSans") {
            Ok(font) => font,
            Err(e) => {
                eprintln!("Skipping header text test, no font available: {}", e);
                return;
            }
        };
        let plain_composer = StripComposer::new().unwrap();
        let composer = StripComposer::new().unwrap().with_font(font);
        assert!(composer.has_font());
        assert!(!plain_composer.has_font());

        let frames = solid_frames(640, 480);
        let theme = ThemeId::WeddingElegance.definition();
        let compose_with = |composer: &StripComposer, style: TextStyleId, name: &str| {
            composer
                .compose(&frames, theme, style.definition(), name, test_date())
                .unwrap()
        };

        let plain = compose_with(&plain_composer, TextStyleId::Modern, "Sam");
        let modern = compose_with(&composer, TextStyleId::Modern, "Sam");

        let date_box = composer.layout().date_box;
        let (box_left, box_right) = (date_box.x as u32, date_box.right().round() as u32);
        let (box_top, box_bottom) = (date_box.y as u32, date_box.bottom().round() as u32);
        assert!(ink(&modern, &plain, box_left..box_right, box_top..box_bottom) > 0);
        // Right-aligned text stays inside the box
        assert_eq!(
            ink(&modern, &plain, box_right + 1..CANVAS_WIDTH - BORDER_WIDTH, box_top..box_bottom),
            0
        );

        let rule_y = (PADDING + TOP_BAR_HEIGHT) as u32;
        assert!(ink(&modern, &plain, BORDER_WIDTH..900, BORDER_WIDTH..rule_y) > 0);

        // Modern upper-cases the name, Script keeps it as typed
        let script_upper = compose_with(&composer, TextStyleId::Script, "SAM");
        assert!(script_upper.as_raw() == modern.as_raw());
        let classic = compose_with(&composer, TextStyleId::Classic, "Sam");
        assert!(classic.as_raw() != modern.as_raw());
    }
}
