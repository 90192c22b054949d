use image::Rgb;
use std::fmt;

/// Substituted for a blank event name in headlines, statements and the strip.
pub const DEFAULT_EVENT_NAME: &str = "Your Event";

const NAME_SLOT: &str = "{name}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeId {
    BirthdayCelebration,
    WeddingElegance,
    BrideGlam,
    GroomClassic,
}

impl ThemeId {
    pub fn all() -> &'static [ThemeId] {
        &[
            ThemeId::BirthdayCelebration,
            ThemeId::WeddingElegance,
            ThemeId::BrideGlam,
            ThemeId::GroomClassic,
        ]
    }

    pub fn key(&self) -> &'static str {
        self.definition().key
    }

    pub fn from_key(key: &str) -> Option<ThemeId> {
        THEMES
            .iter()
            .find(|theme| theme.key.eq_ignore_ascii_case(key.trim()))
            .map(|theme| theme.id)
    }

    pub fn definition(&self) -> &'static ThemeDefinition {
        // The table is indexed by declaration order.
        &THEMES[*self as usize]
    }

    pub fn next(&self) -> ThemeId {
        let all = Self::all();
        let current_index = all.iter().position(|id| id == self).unwrap_or(0);
        all[(current_index + 1) % all.len()]
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.definition().display_name)
    }
}

/// Colours used when painting a strip canvas for a theme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemePalette {
    pub background: Rgb<u8>,
    pub accent: Rgb<u8>,
    pub text: Rgb<u8>,
    pub photo_mat: Rgb<u8>,
}

#[derive(Debug)]
pub struct ThemeDefinition {
    pub id: ThemeId,
    pub key: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub emoji: &'static str,
    statement_template: &'static str,
    headline_template: &'static str,
    pub style_tags: &'static [&'static str],
    pub palette: ThemePalette,
}

impl ThemeDefinition {
    /// Short line shown on theme cards, e.g. "Happy Birthday, Sam!".
    pub fn format_statement(&self, event_name: &str) -> String {
        fill_name_slot(self.statement_template, event_name)
    }

    /// Longer title shown above the live preview while capturing.
    pub fn format_headline(&self, event_name: &str) -> String {
        fill_name_slot(self.headline_template, event_name)
    }
}

fn fill_name_slot(template: &str, event_name: &str) -> String {
    template.replacen(NAME_SLOT, &display_event_name(event_name), 1)
}

/// Trimmed event name, or [`DEFAULT_EVENT_NAME`] when blank.
pub fn display_event_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_EVENT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

pub static THEMES: [ThemeDefinition; 4] = [
    ThemeDefinition {
        id: ThemeId::BirthdayCelebration,
        key: "birthday-celebration",
        display_name: "Birthday Celebration",
        description: "Sparkling confetti bursts with bold neon type for parties of all ages.",
        emoji: "\u{1F389}",
        statement_template: "Happy Birthday, {name}!",
        headline_template: "{name}'s Birthday Bash",
        style_tags: &["frame-card-birthday", "template-canvas-birthday", "statement-bar-birthday"],
        palette: ThemePalette {
            background: Rgb([255, 247, 214]),
            accent: Rgb([236, 72, 153]),
            text: Rgb([76, 29, 149]),
            photo_mat: Rgb([255, 255, 255]),
        },
    },
    ThemeDefinition {
        id: ThemeId::WeddingElegance,
        key: "wedding-elegance",
        display_name: "Wedding Elegance",
        description: "Soft florals and metallic ribbons for timeless romance.",
        emoji: "\u{1F48D}",
        statement_template: "Best Wishes to {name}",
        headline_template: "The Wedding of {name}",
        style_tags: &["frame-card-wedding", "template-canvas-wedding", "statement-bar-wedding"],
        palette: ThemePalette {
            background: Rgb([250, 248, 243]),
            accent: Rgb([191, 155, 92]),
            text: Rgb([68, 64, 60]),
            photo_mat: Rgb([255, 255, 255]),
        },
    },
    ThemeDefinition {
        id: ThemeId::BrideGlam,
        key: "bride-glam",
        display_name: "Bride Glam",
        description: "Blush highlights and delicate lace accents for the bride's keepsake strip.",
        emoji: "\u{1F470}",
        statement_template: "Radiant Bride {name}",
        headline_template: "{name}'s Bridal Spotlight",
        style_tags: &["frame-card-bride", "template-canvas-bride", "statement-bar-bride"],
        palette: ThemePalette {
            background: Rgb([253, 232, 238]),
            accent: Rgb([219, 112, 147]),
            text: Rgb([112, 26, 60]),
            photo_mat: Rgb([255, 250, 250]),
        },
    },
    ThemeDefinition {
        id: ThemeId::GroomClassic,
        key: "groom-classic",
        display_name: "Groom Classic",
        description: "Sleek midnight tones and suit-tailored lines for the groom's crew.",
        emoji: "\u{1F935}",
        statement_template: "Cheers to {name}",
        headline_template: "{name}'s Groom Squad",
        style_tags: &["frame-card-groom", "template-canvas-groom", "statement-bar-groom"],
        palette: ThemePalette {
            background: Rgb([17, 24, 39]),
            accent: Rgb([148, 163, 184]),
            text: Rgb([241, 245, 249]),
            photo_mat: Rgb([226, 232, 240]),
        },
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextStyleId {
    Script,
    Modern,
    Classic,
}

impl TextStyleId {
    pub fn all() -> &'static [TextStyleId] {
        &[TextStyleId::Script, TextStyleId::Modern, TextStyleId::Classic]
    }

    pub fn key(&self) -> &'static str {
        self.definition().key
    }

    pub fn from_key(key: &str) -> Option<TextStyleId> {
        TEXT_STYLES
            .iter()
            .find(|style| style.key.eq_ignore_ascii_case(key.trim()))
            .map(|style| style.id)
    }

    pub fn definition(&self) -> &'static TextStyleDefinition {
        &TEXT_STYLES[*self as usize]
    }
}

impl fmt::Display for TextStyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.definition().display_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTransform {
    None,
    Uppercase,
}

#[derive(Debug)]
pub struct TextStyleDefinition {
    pub id: TextStyleId,
    pub key: &'static str,
    pub display_name: &'static str,
    pub style_tag: &'static str,
    pub transform: TextTransform,
}

impl TextStyleDefinition {
    /// Event name as it is painted on the strip.
    pub fn apply(&self, raw_event_name: &str) -> String {
        let name = display_event_name(raw_event_name);
        match self.transform {
            TextTransform::None => name,
            TextTransform::Uppercase => name.to_uppercase(),
        }
    }
}

pub static TEXT_STYLES: [TextStyleDefinition; 3] = [
    TextStyleDefinition {
        id: TextStyleId::Script,
        key: "script",
        display_name: "Elegant Script",
        style_tag: "template-event-script",
        transform: TextTransform::None,
    },
    TextStyleDefinition {
        id: TextStyleId::Modern,
        key: "modern",
        display_name: "Modern Sans",
        style_tag: "template-event-modern",
        transform: TextTransform::Uppercase,
    },
    TextStyleDefinition {
        id: TextStyleId::Classic,
        key: "classic",
        display_name: "Classic Serif",
        style_tag: "template-event-classic",
        transform: TextTransform::None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_birthday_statement() {
        let theme = ThemeId::BirthdayCelebration.definition();
        assert_eq!(theme.format_statement(""), "Happy Birthday, Your Event!");
        assert_eq!(theme.format_statement("Sam"), "Happy Birthday, Sam!");
        assert_eq!(theme.format_statement("   "), "Happy Birthday, Your Event!");
    }

    #[test]
    fn test_headlines_trim_name() {
        assert_eq!(
            ThemeId::WeddingElegance.definition().format_headline("  Alex & Taylor "),
            "The Wedding of Alex & Taylor"
        );
        assert_eq!(
            ThemeId::GroomClassic.definition().format_headline("Jordan"),
            "Jordan's Groom Squad"
        );
    }

    #[test]
    fn test_table_order_matches_ids() {
        for id in ThemeId::all() {
            assert_eq!(id.definition().id, *id);
        }
        for id in TextStyleId::all() {
            assert_eq!(id.definition().id, *id);
        }
    }

    #[test]
    fn test_lookup_by_key() {
        assert_eq!(ThemeId::from_key("bride-glam"), Some(ThemeId::BrideGlam));
        assert_eq!(ThemeId::from_key("Groom-Classic"), Some(ThemeId::GroomClassic));
        assert_eq!(ThemeId::from_key("halloween"), None);
        assert_eq!(TextStyleId::from_key("modern"), Some(TextStyleId::Modern));
    }

    #[test]
    fn test_theme_cycling() {
        assert_eq!(ThemeId::BirthdayCelebration.next(), ThemeId::WeddingElegance);
        assert_eq!(ThemeId::GroomClassic.next(), ThemeId::BirthdayCelebration);
    }

    #[test]
    fn test_modern_style_uppercases() {
        assert_eq!(TextStyleId::Modern.definition().apply(" Sam "), "SAM");
        assert_eq!(TextStyleId::Script.definition().apply(" Sam "), "Sam");
        assert_eq!(TextStyleId::Modern.definition().apply(""), "YOUR EVENT");
    }

    #[test]
    fn test_palettes_are_distinct() {
        for (i, a) in THEMES.iter().enumerate() {
            for b in THEMES.iter().skip(i + 1) {
                assert_ne!(a.palette.background, b.palette.background);
            }
        }
    }
}
