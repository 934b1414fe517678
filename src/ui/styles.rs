use crossterm::style::{Attribute, Attributes, Color, ContentStyle};

// ── Text colors ──
pub const DIM: Color = Color::Rgb { r: 102, g: 102, b: 102 };
pub const MUTED: Color = Color::Rgb { r: 136, g: 136, b: 136 };
pub const BRIGHT: Color = Color::Rgb { r: 232, g: 232, b: 232 };

// ── Accent colors ──
pub const BLUE: Color = Color::Rgb { r: 96, g: 165, b: 250 };
pub const GREEN: Color = Color::Rgb { r: 74, g: 222, b: 128 };
pub const YELLOW: Color = Color::Rgb { r: 250, g: 204, b: 21 };
pub const RED: Color = Color::Rgb { r: 248, g: 113, b: 113 };
pub const PURPLE: Color = Color::Rgb { r: 167, g: 139, b: 250 };

// ── Diff colors ──
pub const ADD_BG: Color = Color::Rgb { r: 16, g: 62, b: 40 };
pub const ADD_TEXT: Color = Color::Rgb { r: 120, g: 240, b: 160 };
pub const DEL_BG: Color = Color::Rgb { r: 68, g: 16, b: 24 };
pub const DEL_TEXT: Color = Color::Rgb { r: 255, g: 140, b: 140 };
pub const HUNK_BG: Color = Color::Rgb { r: 28, g: 28, b: 60 };

// ── Composed styles ──

fn style(fg: Color, bg: Option<Color>, bold: bool) -> ContentStyle {
    let mut s = ContentStyle::new();
    s.foreground_color = Some(fg);
    s.background_color = bg;
    if bold {
        s.attributes = Attributes::from(Attribute::Bold);
    }
    s
}

pub fn fg(color: Color) -> ContentStyle {
    style(color, None, false)
}

pub fn add_style() -> ContentStyle {
    style(ADD_TEXT, Some(ADD_BG), false)
}

pub fn del_style() -> ContentStyle {
    style(DEL_TEXT, Some(DEL_BG), false)
}

pub fn hunk_header_style() -> ContentStyle {
    style(PURPLE, Some(HUNK_BG), false)
}

pub fn status_added() -> ContentStyle {
    style(GREEN, None, true)
}

pub fn status_deleted() -> ContentStyle {
    style(RED, None, true)
}

pub fn status_modified() -> ContentStyle {
    style(YELLOW, None, true)
}

pub fn comment_style() -> ContentStyle {
    style(YELLOW, None, false)
}

pub fn resolved_style() -> ContentStyle {
    style(GREEN, None, false)
}

/// Apply `style` to `text`, or return it unchanged when color is off
pub fn paint(text: &str, style: ContentStyle, color: bool) -> String {
    if color {
        style.apply(text).to_string()
    } else {
        text.to_string()
    }
}
