use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::overlay::DEFAULT_FONT_PATH;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub overlay_text_color: String,
    pub overlay_fill_color: String,
    pub overlay_font_path: Option<String>,
    pub overlay_font_families: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overlay_text_color: "#000000".to_string(),
            overlay_fill_color: "#ffffff".to_string(),
            overlay_font_path: Some(DEFAULT_FONT_PATH.to_string()),
            overlay_font_families: vec![
                "SimHei".to_string(),
                "Noto Sans CJK SC".to_string(),
                "Source Han Sans SC".to_string(),
                "WenQuanYi Micro Hei".to_string(),
            ],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    overlay: Option<OverlaySettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    text_color: Option<String>,
    fill_color: Option<String>,
    font_path: Option<String>,
    font_families: Option<Vec<String>>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        let Some(overlay) = incoming.overlay else {
            return;
        };
        if let Some(color) = overlay.text_color {
            if !color.trim().is_empty() {
                self.overlay_text_color = color;
            }
        }
        if let Some(color) = overlay.fill_color {
            if !color.trim().is_empty() {
                self.overlay_fill_color = color;
            }
        }
        if let Some(path) = overlay.font_path {
            if !path.trim().is_empty() {
                self.overlay_font_path = Some(path);
            }
        }
        if let Some(families) = overlay.font_families {
            let families: Vec<String> = families
                .into_iter()
                .filter(|family| !family.trim().is_empty())
                .collect();
            if !families.is_empty() {
                self.overlay_font_families = families;
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".ocr-overlay-rust"))
        }
    })
}
