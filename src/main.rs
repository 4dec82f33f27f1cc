use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "ocr-overlay-rust",
    version,
    about = "Redraw translated text over the regions of an image"
)]
struct Cli {
    /// Image to overlay (reads stdin when omitted)
    #[arg(short = 'd', long = "data")]
    data: Option<PathBuf>,

    /// Region descriptors as JSON (array or {"resRegions": [...]})
    #[arg(short = 'R', long = "regions")]
    regions: PathBuf,

    /// Output image path (writes stdout when omitted)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<PathBuf>,

    /// Preferred font file (overrides settings)
    #[arg(long = "font-path")]
    font_path: Option<PathBuf>,

    /// Write a region preview image and layout JSON
    #[arg(long = "debug-regions")]
    debug_regions: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ocr_overlay_rust::logging::init(cli.verbose)?;

    let input = match cli.data.as_ref() {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read image: {}", path.display()))?,
        None => {
            if io::stdin().is_terminal() {
                return Err(anyhow!("no image given: pass --data or pipe image bytes"));
            }
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
    };

    let config = ocr_overlay_rust::Config {
        data_path: cli.data,
        regions_path: cli.regions,
        settings_path: cli.read_settings,
        font_path: cli.font_path,
        debug_regions: cli.debug_regions,
    };
    let output = ocr_overlay_rust::run(&config, &input)?;

    match cli.output {
        Some(path) => std::fs::write(&path, output)
            .with_context(|| format!("failed to write output: {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&output)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
