use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{FillRule, Paint, PathBuilder, PixmapMut, Transform};
use tracing::{debug, warn};
use ttf_parser::{Face, OutlineBuilder, name_id};
use usvg::fontdb;

use super::bitmap::BitmapFont;

pub const DEFAULT_FONT_PATH: &str = "static/simhei.ttf";
pub const MAX_FONT_PX: u32 = 2048;

// Glyph whose ink bottom defines the nominal line height.
const REFERENCE_GLYPH: char = '口';

/// Measurements the layout engine needs from a resolved font.
pub trait GlyphMetrics {
    fn pixel_size(&self) -> u32;
    fn text_width(&self, text: &str) -> u32;
    fn line_height(&self) -> u32;
}

pub trait FontSource {
    type Font: GlyphMetrics + Clone;

    fn resolve(&self, pixel_size: u32) -> Self::Font;
}

struct FaceData {
    data: Vec<u8>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    reference_bottom: Option<i16>,
    space_advance: u16,
    family: Option<String>,
}

impl FaceData {
    fn parse(data: Vec<u8>, preferred_index: Option<u32>) -> Result<Self> {
        let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        let indices: Vec<u32> = match preferred_index {
            Some(index) => std::iter::once(index).chain(0..count).collect(),
            None => (0..count).collect(),
        };
        let mut last_error = None;
        for index in indices {
            let face = match Face::parse(&data, index) {
                Ok(face) => face,
                Err(err) => {
                    last_error = Some(err);
                    continue;
                }
            };
            let units_per_em = face.units_per_em().max(1);
            let space_advance = face
                .glyph_index(' ')
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(units_per_em / 2);
            let reference_bottom = face
                .glyph_index(REFERENCE_GLYPH)
                .and_then(|id| face.glyph_bounding_box(id))
                .map(|bbox| bbox.y_min);
            let ascender = face.ascender();
            let descender = face.descender();
            let family = extract_family_name(&face);
            return Ok(Self {
                face_index: index,
                units_per_em,
                ascender,
                descender,
                reference_bottom,
                space_advance,
                family,
                data,
            });
        }
        match last_error {
            Some(err) => Err(anyhow!("failed to parse font data ({})", err)),
            None => Err(anyhow!("font collection is empty")),
        }
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.face_index).ok()
    }
}

/// A parsed outline face bound to one pixel size.
#[derive(Clone)]
pub struct OutlineFont {
    face: Arc<FaceData>,
    pixel_size: u32,
}

impl std::fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFont")
            .field("family", &self.face.family)
            .field("pixel_size", &self.pixel_size)
            .finish()
    }
}

impl OutlineFont {
    fn scale(&self) -> f32 {
        self.pixel_size as f32 / f32::from(self.face.units_per_em)
    }

    pub fn family(&self) -> Option<&str> {
        self.face.family.as_deref()
    }

    pub fn ascent(&self) -> i32 {
        (f32::from(self.face.ascender) * self.scale()).round() as i32
    }

    fn advance_units(&self, face: &Face<'_>, ch: char) -> u32 {
        if ch == ' ' {
            return u32::from(self.face.space_advance);
        }
        face.glyph_index(ch)
            .and_then(|glyph| face.glyph_hor_advance(glyph))
            .map(u32::from)
            .unwrap_or(u32::from(self.face.space_advance))
    }

    /// Draws `text` with its line box's top-left corner at `(x, y)`.
    pub fn draw_text(
        &self,
        pixmap: &mut PixmapMut<'_>,
        x: i32,
        y: i32,
        text: &str,
        paint: &Paint<'_>,
    ) {
        let Some(face) = self.face.face() else {
            return;
        };
        let scale = self.scale();
        let baseline = y as f32 + f32::from(self.face.ascender) * scale;
        let mut pen_x = x as f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            if let Some(glyph) = face.glyph_index(ch) {
                let mut builder = GlyphPathBuilder {
                    builder: PathBuilder::new(),
                    origin_x: pen_x,
                    origin_y: baseline,
                    scale,
                };
                if face.outline_glyph(glyph, &mut builder).is_some() {
                    if let Some(path) = builder.builder.finish() {
                        pixmap.fill_path(
                            &path,
                            paint,
                            FillRule::Winding,
                            Transform::identity(),
                            None,
                        );
                    }
                }
            }
            pen_x += self.advance_units(&face, ch) as f32 * scale;
        }
    }
}

impl GlyphMetrics for OutlineFont {
    fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    fn text_width(&self, text: &str) -> u32 {
        let Some(face) = self.face.face() else {
            return 0;
        };
        let advance: u32 = text
            .chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| self.advance_units(&face, ch))
            .fold(0u32, u32::saturating_add);
        (advance as f32 * self.scale()).ceil() as u32
    }

    fn line_height(&self) -> u32 {
        let bottom = self.face.reference_bottom.unwrap_or(self.face.descender);
        let units = i32::from(self.face.ascender) - i32::from(bottom);
        (units.max(1) as f32 * self.scale()).ceil() as u32
    }
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (px, py) = self.point(x, y);
        self.builder.move_to(px, py);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (px, py) = self.point(x, y);
        self.builder.line_to(px, py);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (cx, cy) = self.point(x1, y1);
        let (px, py) = self.point(x, y);
        self.builder.quad_to(cx, cy, px, py);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1x, c1y) = self.point(x1, y1);
        let (c2x, c2y) = self.point(x2, y2);
        let (px, py) = self.point(x, y);
        self.builder.cubic_to(c1x, c1y, c2x, c2y, px, py);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Either the preferred outline face or the built-in bitmap face.
#[derive(Debug, Clone)]
pub enum FontHandle {
    Preferred(OutlineFont),
    Default(BitmapFont),
}

impl FontHandle {
    pub fn is_default(&self) -> bool {
        matches!(self, FontHandle::Default(_))
    }

    pub fn ascent(&self) -> i32 {
        match self {
            FontHandle::Preferred(font) => font.ascent(),
            FontHandle::Default(_) => 0,
        }
    }

    pub fn draw_text(
        &self,
        pixmap: &mut PixmapMut<'_>,
        x: i32,
        y: i32,
        text: &str,
        paint: &Paint<'_>,
    ) {
        match self {
            FontHandle::Preferred(font) => font.draw_text(pixmap, x, y, text, paint),
            FontHandle::Default(font) => font.draw_text(pixmap, x, y, text, paint),
        }
    }
}

impl GlyphMetrics for FontHandle {
    fn pixel_size(&self) -> u32 {
        match self {
            FontHandle::Preferred(font) => font.pixel_size(),
            FontHandle::Default(font) => font.pixel_size(),
        }
    }

    fn text_width(&self, text: &str) -> u32 {
        match self {
            FontHandle::Preferred(font) => font.text_width(text),
            FontHandle::Default(font) => font.text_width(text),
        }
    }

    fn line_height(&self) -> u32 {
        match self {
            FontHandle::Preferred(font) => font.line_height(),
            FontHandle::Default(font) => font.line_height(),
        }
    }
}

/// Loads the preferred face once; every later size request either binds that
/// face or falls back to the built-in font.
#[derive(Clone, Default)]
pub struct FontResolver {
    preferred: Option<Arc<FaceData>>,
}

impl std::fmt::Debug for FontResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontResolver")
            .field("family", &self.family())
            .finish()
    }
}

impl FontResolver {
    pub fn builtin() -> Self {
        Self { preferred: None }
    }

    pub fn load(font_path: Option<&Path>, families: &[String]) -> Self {
        match load_preferred_face(font_path, families) {
            Ok(face) => {
                debug!(
                    "overlay font: {} (reference glyph {})",
                    face.family.as_deref().unwrap_or("unnamed"),
                    if face.reference_bottom.is_some() { "present" } else { "missing" }
                );
                Self {
                    preferred: Some(Arc::new(face)),
                }
            }
            Err(err) => {
                warn!("overlay font unavailable, using built-in font: {:#}", err);
                Self::builtin()
            }
        }
    }

    pub fn from_font_data(data: Vec<u8>) -> Result<Self> {
        let face = FaceData::parse(data, None)?;
        Ok(Self {
            preferred: Some(Arc::new(face)),
        })
    }

    pub fn has_preferred(&self) -> bool {
        self.preferred.is_some()
    }

    pub fn family(&self) -> Option<&str> {
        self.preferred.as_ref().and_then(|face| face.family.as_deref())
    }

    pub fn font_data(&self) -> Option<&[u8]> {
        self.preferred.as_ref().map(|face| face.data.as_slice())
    }

    pub fn resolve(&self, pixel_size: u32) -> FontHandle {
        match &self.preferred {
            Some(face) if (1..=MAX_FONT_PX).contains(&pixel_size) => {
                FontHandle::Preferred(OutlineFont {
                    face: Arc::clone(face),
                    pixel_size,
                })
            }
            _ => FontHandle::Default(BitmapFont::new(pixel_size)),
        }
    }
}

impl FontSource for FontResolver {
    type Font = FontHandle;

    fn resolve(&self, pixel_size: u32) -> FontHandle {
        FontResolver::resolve(self, pixel_size)
    }
}

fn load_preferred_face(font_path: Option<&Path>, families: &[String]) -> Result<FaceData> {
    let mut errors = Vec::new();
    if let Some(path) = font_path {
        match load_face_from_path(path) {
            Ok(face) => return Ok(face),
            Err(err) => errors.push(format!("{:#}", err)),
        }
    }

    if !families.is_empty() {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        for family in families {
            match load_face_from_family(&db, family) {
                Ok(face) => return Ok(face),
                Err(err) => errors.push(format!("{:#}", err)),
            }
        }
    }

    if errors.is_empty() {
        Err(anyhow!("no font path or family configured"))
    } else {
        Err(anyhow!(errors.join("; ")))
    }
}

fn load_face_from_path(path: &Path) -> Result<FaceData> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    FaceData::parse(data, None).with_context(|| format!("failed to parse font: {}", path.display()))
}

fn load_face_from_family(db: &fontdb::Database, family: &str) -> Result<FaceData> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    FaceData::parse(data, Some(face_index))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
