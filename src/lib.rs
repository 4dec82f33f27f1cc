use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod logging;
pub mod overlay;
pub mod settings;
mod test_util;

pub use overlay::{
    FontHandle, FontResolver, LayoutResult, OverlayEngine, OverlayError, OverlayStyle,
    RegionDescriptor,
};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub data_path: Option<PathBuf>,
    pub regions_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    pub debug_regions: bool,
}

/// Reads the region file, overlays `input` and returns the re-encoded image.
pub fn run(config: &Config, input: &[u8]) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Err(anyhow!("image input is empty"));
    }
    let mut settings = settings::load_settings(config.settings_path.as_deref())?;
    if let Some(path) = config.font_path.as_ref() {
        settings.overlay_font_path = Some(path.to_string_lossy().to_string());
    }

    let regions = load_regions(&config.regions_path)?;
    let engine = OverlayEngine::from_settings(&settings)?;

    if config.debug_regions {
        let debug = overlay::build_debug_config(config.data_path.as_deref())?;
        let plan = engine.plan(&regions);
        let (image_path, _) =
            overlay::write_debug_dump(&debug, input, &plan, engine.fonts().font_data())?;
        eprintln!("debug: wrote region overlay {}", image_path.display());
    }

    let output = engine
        .overlay(input, &regions)
        .with_context(|| "failed to overlay translated regions")?;
    info!("overlaid {} region descriptor(s)", regions.len());
    Ok(output)
}

pub fn load_regions(path: &Path) -> Result<Vec<RegionDescriptor>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read regions: {}", path.display()))?;
    RegionDescriptor::parse_list(&content)
        .with_context(|| format!("failed to parse regions: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, image::Rgb([90, 90, 90]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .expect("encode jpeg");
        bytes
    }

    #[test]
    fn run_keeps_the_container_format() {
        with_temp_home(|home| {
            let regions = home.join("regions.json");
            std::fs::write(
                &regions,
                r#"{"resRegions":[{"boundingBox":"0,0,32,16","tranContent":"你好"}]}"#,
            )
            .expect("write regions");
            let config = Config {
                regions_path: regions,
                font_path: Some(home.join("missing.ttf")),
                ..Config::default()
            };
            let output = run(&config, &jpeg_bytes(40, 30)).expect("run");
            assert_eq!(
                image::guess_format(&output).expect("format"),
                ImageFormat::Jpeg
            );
        });
    }

    #[test]
    fn run_writes_debug_dump_with_preferred_font() {
        with_temp_home(|home| {
            let regions = home.join("regions.json");
            std::fs::write(&regions, r#"[{"boundingBox":"2,12,30,16","tranContent":"你好"}]"#)
                .expect("write regions");
            let source = home.join("scan.jpg");
            let input = jpeg_bytes(40, 30);
            std::fs::write(&source, &input).expect("write source");
            let config = Config {
                data_path: Some(source),
                regions_path: regions,
                font_path: Some(crate::test_util::fixture_font_path()),
                debug_regions: true,
                ..Config::default()
            };
            run(&config, &input).expect("run");
            let preview = image::open(home.join("scan_regions.png")).expect("preview");
            assert_eq!((preview.width(), preview.height()), (40, 30));
            assert!(home.join("scan_regions.json").is_file());
        });
    }

    #[test]
    fn run_rejects_empty_input() {
        let err = run(&Config::default(), &[]).expect_err("must fail");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn run_surfaces_decode_errors() {
        with_temp_home(|home| {
            let regions = home.join("regions.json");
            std::fs::write(&regions, "[]").expect("write regions");
            let config = Config {
                regions_path: regions,
                ..Config::default()
            };
            let err = run(&config, b"garbage").expect_err("must fail");
            let overlay_err = err
                .downcast_ref::<OverlayError>()
                .expect("overlay error in chain");
            assert!(overlay_err.is_decode());
        });
    }

    #[test]
    fn load_regions_reports_the_path() {
        let err = load_regions(Path::new("no/such/regions.json")).expect_err("must fail");
        assert!(err.to_string().contains("no/such/regions.json"));
    }
}
