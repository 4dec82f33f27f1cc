use serde::Serialize;

use super::font::{FontHandle, FontSource, GlyphMetrics};
use super::region::OrientedRegion;

pub const MIN_FONT_SIZE: i64 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedLine {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
}

/// One glyph per row; glyph `i` sits at `start_y + i * font_size`.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = ""))]
pub struct VerticalLayout<F> {
    #[serde(skip)]
    pub font: F,
    pub font_size: u32,
    pub start_x: i32,
    pub start_y: i32,
    pub glyphs: Vec<char>,
}

impl<F> VerticalLayout<F> {
    pub fn glyph_positions(&self) -> impl Iterator<Item = (char, i32, i32)> + '_ {
        let step = i64::from(self.font_size);
        self.glyphs.iter().enumerate().map(move |(idx, ch)| {
            let y = i64::from(self.start_y) + idx as i64 * step;
            (*ch, self.start_x, saturate_i32(y))
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = ""))]
pub struct HorizontalLayout<F> {
    #[serde(skip)]
    pub font: F,
    pub font_size: u32,
    pub line_height: u32,
    pub lines: Vec<PlacedLine>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "orientation", rename_all = "lowercase", bound(serialize = ""))]
pub enum LayoutResult<F = FontHandle> {
    Vertical(VerticalLayout<F>),
    Horizontal(HorizontalLayout<F>),
}

impl<F> LayoutResult<F> {
    pub fn font(&self) -> &F {
        match self {
            LayoutResult::Vertical(layout) => &layout.font,
            LayoutResult::Horizontal(layout) => &layout.font,
        }
    }

    pub fn font_size(&self) -> u32 {
        match self {
            LayoutResult::Vertical(layout) => layout.font_size,
            LayoutResult::Horizontal(layout) => layout.font_size,
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, LayoutResult::Vertical(_))
    }
}

pub fn layout<S: FontSource>(oriented: &OrientedRegion, fonts: &S) -> LayoutResult<S::Font> {
    if oriented.is_vertical {
        LayoutResult::Vertical(layout_vertical(oriented, fonts))
    } else {
        LayoutResult::Horizontal(layout_horizontal(oriented, fonts))
    }
}

fn layout_vertical<S: FontSource>(oriented: &OrientedRegion, fonts: &S) -> VerticalLayout<S::Font> {
    let region = &oriented.region;
    let (x, y, w, h) = geometry(oriented);
    let count = region.char_count().max(1) as i64;
    // The lower bound wins when `w - 2` drops below it.
    let font_size = (h / count).min(w - 2).max(MIN_FONT_SIZE);
    let font = fonts.resolve(saturate_u32(font_size));

    VerticalLayout {
        font,
        font_size: saturate_u32(font_size),
        start_x: saturate_i32(x + (w - font_size).div_euclid(2)),
        start_y: saturate_i32(y),
        glyphs: region.text.chars().collect(),
    }
}

fn layout_horizontal<S: FontSource>(
    oriented: &OrientedRegion,
    fonts: &S,
) -> HorizontalLayout<S::Font> {
    let region = &oriented.region;
    let (x, y, w, h) = geometry(oriented);
    let count = region.char_count().max(1) as i64;
    let font_size = h.min(w / count).max(MIN_FONT_SIZE);
    let font = fonts.resolve(saturate_u32(font_size));

    let wrapped = wrap_greedy(&region.text, w, &font);
    let line_height = font.line_height();
    let block_height = i64::from(line_height) * wrapped.len() as i64;
    let start_y = y + (h - block_height).div_euclid(2);

    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(idx, text)| {
            let width = font.text_width(&text);
            PlacedLine {
                x: saturate_i32(x + (w - i64::from(width)).div_euclid(2)),
                y: saturate_i32(start_y + idx as i64 * i64::from(line_height)),
                width,
                text,
            }
        })
        .collect();

    HorizontalLayout {
        font,
        font_size: saturate_u32(font_size),
        line_height,
        lines,
    }
}

/// Breaks before any character that would push the line past `max_width`.
/// A single character wider than the box still gets a line of its own.
fn wrap_greedy<M: GlyphMetrics>(text: &str, max_width: i64, font: &M) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        let mut candidate = current.clone();
        candidate.push(ch);
        if i64::from(font.text_width(&candidate)) > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push(ch);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn geometry(oriented: &OrientedRegion) -> (i64, i64, i64, i64) {
    let bbox = oriented.region.bbox;
    (
        i64::from(bbox.x),
        i64::from(bbox.y),
        i64::from(bbox.w),
        i64::from(bbox.h),
    )
}

fn saturate_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn saturate_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}
