use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use resvg::render;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::Pixmap;
use tracing::debug;
use usvg::{Options, Tree, fontdb};

use super::render::{PlannedRegion, decode_pixmap, image_format_from_mime};

const VERTICAL_STROKE: &str = "#ff6d00";
const HORIZONTAL_STROKE: &str = "#00c853";

#[derive(Debug, Clone)]
pub struct DebugConfig {
    output_dir: PathBuf,
    base_name: String,
}

impl DebugConfig {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_regions.png", self.base_name))
    }

    pub fn json_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_regions.json", self.base_name))
    }
}

pub fn build_debug_config(src_path: Option<&Path>) -> Result<DebugConfig> {
    let (dir, base) = if let Some(path) = src_path {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let base = path
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or("input");
        (dir, base.to_string())
    } else {
        (default_debug_dir(), "stdin".to_string())
    };

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create debug dir: {}", dir.display()))?;
    Ok(DebugConfig {
        output_dir: dir,
        base_name: sanitize_filename_component(&base),
    })
}

/// Writes the bbox preview image and the JSON layout plan. Labels use
/// `font_data` when given, so they match the overlay face.
pub fn write_debug_dump(
    config: &DebugConfig,
    image_bytes: &[u8],
    plan: &[PlannedRegion],
    font_data: Option<&[u8]>,
) -> Result<(PathBuf, PathBuf)> {
    let (pixmap, format) = decode_pixmap(image_bytes)?;
    let mime = infer::get(image_bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or_else(|| format.to_mime_type());
    let svg = render_bbox_svg(image_bytes, mime, pixmap.width(), pixmap.height(), plan);
    let bytes = render_svg_bytes(&svg, "image/png", font_data)?;
    let output_path = config.output_path();
    std::fs::write(&output_path, bytes).with_context(|| {
        format!("failed to write region debug image: {}", output_path.display())
    })?;

    let json_path = config.json_path();
    let json = serde_json::to_vec_pretty(plan)?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("failed to write region debug json: {}", json_path.display()))?;
    debug!("wrote region debug dump {}", output_path.display());
    Ok((output_path, json_path))
}

pub fn render_bbox_svg(
    image_bytes: &[u8],
    image_mime: &str,
    width: u32,
    height: u32,
    plan: &[PlannedRegion],
) -> String {
    let encoded = BASE64.encode(image_bytes);
    let data_uri = format!("data:{};base64,{}", image_mime, encoded);

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    for region in plan {
        let stroke = if region.is_vertical {
            VERTICAL_STROKE
        } else {
            HORIZONTAL_STROKE
        };
        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="{stroke}" stroke-width="2"/>"#,
            x = region.bbox.x,
            y = region.bbox.y,
            w = region.bbox.w,
            h = region.bbox.h,
        ));
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="12" fill="{stroke}" font-family="sans-serif">#{index}</text>"#,
            x = region.bbox.x,
            y = region.bbox.y.saturating_sub(2).max(12),
            index = region.index,
        ));
    }

    svg.push_str("</svg>");
    svg
}

pub fn render_svg_bytes(
    svg: &str,
    output_mime: &str,
    font_data: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if let Some(data) = font_data {
        db.load_font_data(data.to_vec());
        // The provided face was loaded last; make it the sans-serif default.
        let family = db
            .faces()
            .last()
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone());
        if let Some(family) = family {
            db.set_sans_serif_family(family);
        }
    }
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let image = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from SVG"))?;
    let format = image_format_from_mime(output_mime)
        .ok_or_else(|| anyhow!("unsupported output image mime '{}'", output_mime))?;
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut cursor, format)
        .with_context(|| "failed to encode image from SVG")?;
    Ok(bytes)
}

fn default_debug_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Path::new(&home).join(".ocr-overlay-rust/.cache/overlay");
        }
    }
    Path::new(".ocr-overlay-rust/.cache/overlay").to_path_buf()
}

fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else if ch.is_whitespace() {
            out.push('_');
        }
    }
    if out.is_empty() {
        "input".to_string()
    } else {
        out
    }
}
