mod bitmap;
mod composite;
mod debug;
mod error;
mod filter;
mod font;
mod layout;
mod region;
mod render;

pub use debug::{
    DebugConfig, build_debug_config, render_bbox_svg, render_svg_bytes, write_debug_dump,
};
pub use error::OverlayError;
pub use filter::{filter_target_script, is_target_script};
pub use font::{
    DEFAULT_FONT_PATH, FontHandle, FontResolver, FontSource, GlyphMetrics, MAX_FONT_PX,
    OutlineFont,
};
pub use layout::{HorizontalLayout, LayoutResult, MIN_FONT_SIZE, PlacedLine, VerticalLayout, layout};
pub use region::{OrientedRegion, Region, RegionDescriptor, classify, normalize, parse_bbox};
pub use render::{OverlayEngine, PlannedRegion, image_format_from_mime};

pub use bitmap::BitmapFont;
pub use composite::composite;

use anyhow::{Result, anyhow};
use tiny_skia::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BBoxPx {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub fill: Color,
    pub text: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill: Color::WHITE,
            text: Color::BLACK,
        }
    }
}

impl OverlayStyle {
    pub fn from_hex(fill: &str, text: &str) -> Result<Self> {
        Ok(Self {
            fill: parse_hex_color(fill)?,
            text: parse_hex_color(text)?,
        })
    }
}

/// Parses `#rrggbb` or `#rgb` into an opaque color.
pub fn parse_hex_color(value: &str) -> Result<Color> {
    let trimmed = value.trim();
    let hex = trimmed
        .strip_prefix('#')
        .ok_or_else(|| anyhow!("color must start with '#': '{}'", value))?;
    if !hex.is_ascii() {
        return Err(anyhow!("invalid hex digits in color: '{}'", value));
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => hex.to_string(),
        _ => return Err(anyhow!("unsupported color format: '{}'", value)),
    };
    let channel = |idx: usize| {
        u8::from_str_radix(&expanded[idx..idx + 2], 16)
            .map_err(|_| anyhow!("invalid hex digits in color: '{}'", value))
    };
    Ok(Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, 255))
}
