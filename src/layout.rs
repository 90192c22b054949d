use crate::error::{BoothError, BoothResult};

pub const CANVAS_WIDTH: u32 = 1800;
pub const CANVAS_HEIGHT: u32 = 1200;

pub const PADDING: f32 = 48.0;
pub const TOP_BAR_HEIGHT: f32 = 90.0;
pub const BETWEEN_SECTIONS: f32 = 28.0;
pub const THUMB_ROW_HEIGHT: f32 = 200.0;
pub const MIN_THUMB_ROW_HEIGHT: f32 = 170.0;
pub const THUMB_SHRINK_STEP: f32 = 30.0;
pub const MIN_HERO_HEIGHT: f32 = 360.0;
pub const THUMB_SPACING: f32 = 18.0;
pub const HERO_FILL: f32 = 0.95;
pub const DATE_BOX_WIDTH: f32 = 320.0;
/// Inset of the header labels from the padded edge
pub const LABEL_INSET: f32 = 10.0;

pub const THUMB_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Largest rect with the source aspect ratio that fits inside `self`, centred.
    pub fn fit_centered(&self, src_width: u32, src_height: u32) -> Rect {
        let (width, height) = fit_size(src_width, src_height, self.width, self.height);
        Rect::new(
            self.x + (self.width - width) / 2.0,
            self.y + (self.height - height) / 2.0,
            width,
            height,
        )
    }
}

/// Scale a source size to fit within a box, preserving aspect ratio.
pub fn fit_size(src_width: u32, src_height: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    if src_width == 0 || src_height == 0 {
        return (0.0, 0.0);
    }
    let width_ratio = max_width / src_width as f32;
    let height_ratio = max_height / src_height as f32;
    let scale = width_ratio.min(height_ratio);
    (src_width as f32 * scale, src_height as f32 * scale)
}

/// Geometric plan for one strip canvas: header, hero photo and thumbnail row.
#[derive(Debug, Clone, PartialEq)]
pub struct StripLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub thumb_row_height: f32,
    /// Full width between the paddings
    pub main_width: f32,
    /// Area the hero photo is centred in
    pub main_area: Rect,
    /// Bounding box the hero is scaled into (95% of the main area)
    pub hero_box: Rect,
    pub thumb_row: Rect,
    pub event_label_origin: (f32, f32),
    pub date_box: Rect,
}

impl StripLayout {
    pub fn standard() -> BoothResult<Self> {
        Self::for_canvas(CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    pub fn for_canvas(canvas_width: u32, canvas_height: u32) -> BoothResult<Self> {
        let w = canvas_width as f32;
        let h = canvas_height as f32;

        let main_width = w - PADDING * 2.0;
        let mut thumb_row_height = THUMB_ROW_HEIGHT;
        let mut main_height = hero_space(h, thumb_row_height);

        if main_height < MIN_HERO_HEIGHT {
            thumb_row_height = (thumb_row_height - THUMB_SHRINK_STEP).max(MIN_THUMB_ROW_HEIGHT);
            main_height = hero_space(h, thumb_row_height);
        }

        if main_width <= 0.0 || main_height <= 0.0 {
            return Err(BoothError::CompositionFailed(format!(
                "canvas {}x{} is too small for the strip layout",
                canvas_width, canvas_height
            )));
        }

        let main_top = PADDING + TOP_BAR_HEIGHT + BETWEEN_SECTIONS;
        let main_area = Rect::new(PADDING, main_top, main_width, main_height);

        let hero_width = main_width * HERO_FILL;
        let hero_height = main_height * HERO_FILL;
        let hero_box = Rect::new(
            PADDING + (main_width - hero_width) / 2.0,
            main_top + (main_height - hero_height) / 2.0,
            hero_width,
            hero_height,
        );

        let thumb_row = Rect::new(
            PADDING,
            main_area.bottom() + BETWEEN_SECTIONS,
            main_width,
            thumb_row_height,
        );

        let label_y = PADDING - 8.0;
        let date_box = Rect::new(
            w - PADDING - DATE_BOX_WIDTH - LABEL_INSET,
            label_y,
            DATE_BOX_WIDTH,
            TOP_BAR_HEIGHT,
        );

        Ok(Self {
            canvas_width,
            canvas_height,
            thumb_row_height,
            main_width,
            main_area,
            hero_box,
            thumb_row,
            event_label_origin: (PADDING + LABEL_INSET, label_y),
            date_box,
        })
    }

    /// Width of each of the four thumbnail slots.
    pub fn thumb_width(&self) -> f32 {
        (self.main_width - THUMB_SPACING * (THUMB_COUNT as f32 - 1.0)) / THUMB_COUNT as f32
    }

    /// Slot box for thumbnail `index` (0-based, left to right).
    pub fn thumb_slot(&self, index: usize) -> Rect {
        let thumb_width = self.thumb_width();
        Rect::new(
            self.thumb_row.x + (thumb_width + THUMB_SPACING) * index as f32,
            self.thumb_row.y,
            thumb_width,
            self.thumb_row_height,
        )
    }

    pub fn thumb_slots(&self) -> Vec<Rect> {
        (0..THUMB_COUNT).map(|i| self.thumb_slot(i)).collect()
    }

    /// Where a hero frame of the given size lands on the canvas.
    pub fn hero_placement(&self, src_width: u32, src_height: u32) -> Rect {
        let (width, height) = fit_size(src_width, src_height, self.hero_box.width, self.hero_box.height);
        Rect::new(
            self.main_area.x + (self.main_area.width - width) / 2.0,
            self.main_area.y + (self.main_area.height - height) / 2.0,
            width,
            height,
        )
    }

    /// Where thumbnail `index` of the given size lands on the canvas.
    pub fn thumb_placement(&self, index: usize, src_width: u32, src_height: u32) -> Rect {
        self.thumb_slot(index).fit_centered(src_width, src_height)
    }
}

fn hero_space(canvas_height: f32, thumb_row_height: f32) -> f32 {
    canvas_height
        - PADDING
        - TOP_BAR_HEIGHT
        - BETWEEN_SECTIONS
        - thumb_row_height
        - BETWEEN_SECTIONS
        - PADDING
}
