use anyhow::{Context, Result};
use image::{DynamicImage, ImageError, ImageFormat, RgbImage};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;
use tiny_skia::{IntSize, Pixmap, PixmapMut};
use tracing::debug;

use super::composite::composite;
use super::error::OverlayError;
use super::font::FontResolver;
use super::layout::{LayoutResult, layout};
use super::region::{OrientedRegion, RegionDescriptor, classify, normalize};
use super::{BBoxPx, OverlayStyle};
use crate::settings::Settings;

/// A region that survived normalization, with the layout it will be drawn with.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedRegion {
    pub index: usize,
    pub bbox: BBoxPx,
    pub text: String,
    pub is_vertical: bool,
    pub layout: LayoutResult,
}

#[derive(Debug, Clone)]
pub struct OverlayEngine {
    fonts: FontResolver,
    style: OverlayStyle,
}

impl OverlayEngine {
    pub fn new(fonts: FontResolver, style: OverlayStyle) -> Self {
        Self { fonts, style }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let style =
            OverlayStyle::from_hex(&settings.overlay_fill_color, &settings.overlay_text_color)
                .with_context(|| "invalid overlay colors in settings")?;
        let fonts = FontResolver::load(
            settings.overlay_font_path.as_deref().map(Path::new),
            &settings.overlay_font_families,
        );
        Ok(Self::new(fonts, style))
    }

    pub fn fonts(&self) -> &FontResolver {
        &self.fonts
    }

    fn oriented_regions<'a>(
        &'a self,
        regions: &'a [RegionDescriptor],
    ) -> impl Iterator<Item = (usize, OrientedRegion)> + 'a {
        regions.iter().enumerate().filter_map(|(index, descriptor)| {
            normalize(descriptor.bounding_box.as_deref(), descriptor.text.as_deref())
                .map(|region| (index, classify(region)))
        })
    }

    pub fn plan(&self, regions: &[RegionDescriptor]) -> Vec<PlannedRegion> {
        self.oriented_regions(regions)
            .map(|(index, oriented)| {
                let layout = layout(&oriented, &self.fonts);
                PlannedRegion {
                    index,
                    bbox: oriented.region.bbox,
                    is_vertical: oriented.is_vertical,
                    text: oriented.region.text,
                    layout,
                }
            })
            .collect()
    }

    /// Draws every usable region in order and returns how many were applied.
    pub fn overlay_pixmap(
        &self,
        pixmap: &mut PixmapMut<'_>,
        regions: &[RegionDescriptor],
    ) -> usize {
        let mut applied = 0;
        for (index, oriented) in self.oriented_regions(regions) {
            let planned = layout(&oriented, &self.fonts);
            debug!(
                "region #{}: {} layout at {}px",
                index,
                if planned.is_vertical() { "vertical" } else { "horizontal" },
                planned.font_size()
            );
            composite(pixmap, &oriented, &planned, &self.style);
            applied += 1;
        }
        debug!(
            "applied {} region(s), skipped {}",
            applied,
            regions.len() - applied
        );
        applied
    }

    pub fn overlay(
        &self,
        image_bytes: &[u8],
        regions: &[RegionDescriptor],
    ) -> Result<Vec<u8>, OverlayError> {
        let (mut pixmap, format) = decode_pixmap(image_bytes)?;
        self.overlay_pixmap(&mut pixmap.as_mut(), regions);
        encode_pixmap(&pixmap, format)
    }
}

pub(crate) fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    let sniffed = infer::get(bytes).and_then(|kind| image_format_from_mime(kind.mime_type()));
    match sniffed {
        Some(format) => Ok(format),
        None => image::guess_format(bytes),
    }
}

pub(crate) fn decode_pixmap(bytes: &[u8]) -> Result<(Pixmap, ImageFormat), OverlayError> {
    let format = sniff_format(bytes).map_err(OverlayError::Decode)?;
    let image =
        image::load_from_memory_with_format(bytes, format).map_err(OverlayError::Decode)?;
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let size = IntSize::from_wh(width, height).ok_or(OverlayError::EmptyImage { width, height })?;
    let mut data = Vec::with_capacity(rgb.as_raw().len() / 3 * 4);
    for px in rgb.pixels() {
        data.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    let pixmap = Pixmap::from_vec(data, size).ok_or(OverlayError::EmptyImage { width, height })?;
    Ok((pixmap, format))
}

pub(crate) fn encode_pixmap(pixmap: &Pixmap, format: ImageFormat) -> Result<Vec<u8>, OverlayError> {
    let mut raw = Vec::with_capacity(pixmap.pixels().len() * 3);
    for px in pixmap.pixels() {
        let color = px.demultiply();
        raw.extend_from_slice(&[color.red(), color.green(), color.blue()]);
    }
    let image = RgbImage::from_raw(pixmap.width(), pixmap.height(), raw).ok_or(
        OverlayError::EmptyImage {
            width: pixmap.width(),
            height: pixmap.height(),
        },
    )?;
    let image = DynamicImage::ImageRgb8(image);
    let mut result = write_image(&image, format);
    for convert in ENCODE_FALLBACKS {
        if !matches!(result, Err(ImageError::Unsupported(_))) {
            break;
        }
        result = write_image(&convert(&image), format);
    }
    result.map_err(|err| match err {
        ImageError::Unsupported(_) => {
            OverlayError::UnsupportedFormat(format!("{:?}", format).to_lowercase())
        }
        other => OverlayError::Encode(other),
    })
}

// Color types tried in order when an encoder rejects RGB8
// (farbfeld only writes RGBA16, Radiance HDR and OpenEXR want floats).
const ENCODE_FALLBACKS: [fn(&DynamicImage) -> DynamicImage; 3] = [
    |image| DynamicImage::ImageRgba8(image.to_rgba8()),
    |image| DynamicImage::ImageRgba16(image.to_rgba16()),
    |image| DynamicImage::ImageRgb32F(image.to_rgb32f()),
];

fn write_image(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format)?;
    Ok(bytes)
}

pub fn image_format_from_mime(mime: &str) -> Option<ImageFormat> {
    match mime {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" => Some(ImageFormat::Jpeg),
        "image/jpg" => Some(ImageFormat::Jpeg),
        "image/gif" => Some(ImageFormat::Gif),
        "image/webp" => Some(ImageFormat::WebP),
        "image/bmp" => Some(ImageFormat::Bmp),
        "image/tiff" => Some(ImageFormat::Tiff),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, image::Rgb(color));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    fn engine() -> OverlayEngine {
        OverlayEngine::new(FontResolver::builtin(), OverlayStyle::default())
    }

    #[test]
    fn maps_known_mimes() {
        assert_eq!(image_format_from_mime("image/jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(image_format_from_mime("image/svg+xml"), None);
    }

    #[test]
    fn sniffs_png_container() {
        let bytes = png_bytes(2, 2, [1, 2, 3]);
        assert_eq!(sniff_format(&bytes).expect("format"), ImageFormat::Png);
        assert!(sniff_format(b"definitely not an image").is_err());
    }

    #[test]
    fn decode_then_encode_preserves_pixels() {
        let bytes = png_bytes(3, 2, [10, 20, 30]);
        let (pixmap, format) = decode_pixmap(&bytes).expect("decode");
        assert_eq!(format, ImageFormat::Png);
        assert_eq!((pixmap.width(), pixmap.height()), (3, 2));
        let encoded = encode_pixmap(&pixmap, format).expect("encode");
        let decoded = image::load_from_memory(&encoded).expect("reload").to_rgb8();
        assert!(decoded.pixels().all(|px| px.0 == [10, 20, 30]));
    }

    #[test]
    fn formats_without_rgb8_encoders_keep_their_container() {
        let image: image::ImageBuffer<image::Rgba<u16>, Vec<u16>> =
            image::ImageBuffer::from_pixel(32, 32, image::Rgba([5000, 6000, 7000, 65535]));
        let source = DynamicImage::ImageRgba16(image);
        let untouched = source.to_rgb8().get_pixel(0, 31).0;
        let mut bytes = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Farbfeld)
            .expect("encode farbfeld");
        let output = engine()
            .overlay(&bytes, &[RegionDescriptor::new("0,0,32,4", "字")])
            .expect("overlay");
        assert_eq!(image::guess_format(&output).expect("format"), ImageFormat::Farbfeld);
        let decoded = image::load_from_memory(&output).expect("reload").to_rgb8();
        assert_eq!(decoded.dimensions(), (32, 32));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(decoded.get_pixel(0, 31).0, untouched);
    }

    #[test]
    fn undecodable_bytes_report_decode_error() {
        let err = engine()
            .overlay(b"\x89PNG\r\n\x1a\ncorrupt", &[])
            .expect_err("must fail");
        assert!(err.is_decode(), "{err}");
        let err = engine().overlay(&[], &[]).expect_err("must fail");
        assert!(err.is_decode(), "{err}");
    }

    #[test]
    fn plan_keeps_input_indices_of_surviving_regions() {
        let regions = vec![
            RegionDescriptor::new("bad", "你好"),
            RegionDescriptor::new("0,0,40,200", "一二三四"),
            RegionDescriptor::new("10,10,100,20", "hello"),
            RegionDescriptor::new("0,0,300,30", "你好世界"),
        ];
        let plan = engine().plan(&regions);
        let indices: Vec<_> = plan.iter().map(|region| region.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(plan[0].is_vertical);
        assert_eq!(plan[0].layout.font_size(), 38);
        assert!(!plan[1].is_vertical);
    }

    #[test]
    fn overlay_pixmap_counts_applied_regions() {
        let mut pixmap = Pixmap::new(50, 50).expect("pixmap");
        let regions = vec![
            RegionDescriptor::new("0,0,10,10", "字"),
            RegionDescriptor {
                bounding_box: None,
                text: Some("字".to_string()),
            },
        ];
        assert_eq!(engine().overlay_pixmap(&mut pixmap.as_mut(), &regions), 1);
    }
}
