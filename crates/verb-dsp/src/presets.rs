//! Named parameter sets.
//!
//! The JSON files under `presets/` are embedded at build time; extra
//! directories can be loaded at runtime with `load_dir`. A preset file is a
//! plain `VerbParams` document with an optional `_meta` block carrying the
//! category and description.

use std::path::Path;

use log::{debug, warn};

use crate::error::VerbError;
use crate::params::VerbParams;

include!(concat!(env!("OUT_DIR"), "/embedded_presets.rs"));

/// A loaded preset with name and parsed params.
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: String,
    pub category: String,
    pub description: String,
    pub params: VerbParams,
}

impl Preset {
    /// Parse one preset document.
    pub fn from_json(name: &str, json: &str) -> Result<Self, VerbError> {
        let params = VerbParams::from_json(json)?;
        let (category, description) = extract_meta(params.meta.as_ref());
        Ok(Self {
            name: name.to_string(),
            category,
            description,
            params,
        })
    }
}

/// Presets compiled into the crate, sorted by category then name.
pub fn embedded() -> Vec<Preset> {
    let mut presets = Vec::new();
    for (name, json) in EMBEDDED_PRESETS {
        match Preset::from_json(name, json) {
            Ok(p) => presets.push(p),
            Err(e) => warn!("skipping embedded preset '{name}': {e}"),
        }
    }
    sort(&mut presets);
    debug!("loaded {} embedded presets", presets.len());
    presets
}

/// Look up an embedded preset by name (case-insensitive).
pub fn find(name: &str) -> Result<Preset, VerbError> {
    embedded()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| VerbError::UnknownPreset(name.to_string()))
}

/// Load every `*.json` preset in `dir`. Unreadable or malformed files are skipped.
pub fn load_dir(dir: &Path) -> Result<Vec<Preset>, VerbError> {
    let mut presets = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let json = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                warn!("skipping preset {}: {e}", path.display());
                continue;
            }
        };
        match Preset::from_json(&name, &json) {
            Ok(p) => presets.push(p),
            Err(e) => warn!("skipping preset {}: {e}", path.display()),
        }
    }
    sort(&mut presets);
    debug!("loaded {} presets from {}", presets.len(), dir.display());
    Ok(presets)
}

/// Load a single preset file; the name is the file stem.
pub fn load_file(path: &Path) -> Result<Preset, VerbError> {
    let json = std::fs::read_to_string(path)?;
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("custom");
    Preset::from_json(name, &json)
}

fn sort(presets: &mut [Preset]) {
    presets.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
}

fn extract_meta(meta: Option<&serde_json::Value>) -> (String, String) {
    let field = |key: &str| {
        meta.and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    (
        field("category").unwrap_or_else(|| "Uncategorized".to_string()),
        field("description").unwrap_or_default(),
    )
}
