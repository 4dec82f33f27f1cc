use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::BBoxPx;
use super::filter::filter_target_script;

/// Raw record handed over by the translation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegionDescriptor {
    #[serde(rename = "boundingBox", default, deserialize_with = "lenient_string")]
    pub bounding_box: Option<String>,
    #[serde(
        rename = "tranContent",
        alias = "text",
        default,
        deserialize_with = "lenient_string"
    )]
    pub text: Option<String>,
}

impl RegionDescriptor {
    pub fn new(bounding_box: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            bounding_box: Some(bounding_box.into()),
            text: Some(text.into()),
        }
    }

    /// Accepts either a bare array of descriptors or an object with a
    /// `resRegions` array.
    pub fn parse_list(json: &str) -> Result<Vec<RegionDescriptor>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Document {
            List(Vec<RegionDescriptor>),
            Response {
                #[serde(rename = "resRegions", default)]
                regions: Vec<RegionDescriptor>,
            },
        }

        let document: Document =
            serde_json::from_str(json).with_context(|| "failed to parse region descriptors")?;
        Ok(match document {
            Document::List(regions) => regions,
            Document::Response { regions } => regions,
        })
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => Some(text),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub bbox: BBoxPx,
    pub text: String,
}

impl Region {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrientedRegion {
    pub region: Region,
    pub is_vertical: bool,
}

/// Parses `x,y,w,h`. Anything but four non-negative integers is rejected.
pub fn parse_bbox(raw: &str) -> Option<BBoxPx> {
    let mut values = [0u32; 4];
    let mut parts = raw.split(',');
    for slot in values.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    let [x, y, w, h] = values;
    Some(BBoxPx { x, y, w, h })
}

pub fn normalize(raw_box: Option<&str>, raw_text: Option<&str>) -> Option<Region> {
    let raw_box = match raw_box.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => {
            debug!("skipping region: missing bounding box");
            return None;
        }
    };
    let Some(bbox) = parse_bbox(raw_box) else {
        debug!("skipping region: malformed bounding box '{}'", raw_box);
        return None;
    };
    let text = filter_target_script(raw_text.unwrap_or_default());
    if text.is_empty() {
        debug!("skipping region at {}: no target-script text", raw_box);
        return None;
    }
    Some(Region { bbox, text })
}

pub fn classify(region: Region) -> OrientedRegion {
    let is_vertical = u64::from(region.bbox.h) > 2 * u64::from(region.bbox.w);
    OrientedRegion {
        region,
        is_vertical,
    }
}
