//! Paint styles, their property-bag form, and per-tool style defaults
//! persisted in `styles.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{app_config_path, config_env_dirs, ConfigPathError, APP_DIR};
use crate::geometry::Rgba;

const STYLE_CONFIG_FILE: &str = "styles.json";

/// In-memory property bag, keyed by field name.
pub type PropertyBag = serde_json::Map<String, serde_json::Value>;

pub type StyleResult<T> = std::result::Result<T, StyleError>;

#[derive(Debug, Error)]
pub enum StyleError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("failed to read style defaults: {path}")]
    ReadConfig { path: PathBuf, source: io::Error },
    #[error("failed to write style defaults: {path}")]
    WriteConfig { path: PathBuf, source: io::Error },
    #[error("failed to parse style properties")]
    Parse(#[from] serde_json::Error),
    #[error("property bag is not an object")]
    NotAnObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaintStyle {
    pub pen_color: Rgba,
    pub pen_width: f64,
    #[serde(default)]
    pub brush_color: Option<Rgba>,
}

impl PaintStyle {
    pub const fn stroke(pen_color: Rgba, pen_width: f64) -> Self {
        Self {
            pen_color,
            pen_width,
            brush_color: None,
        }
    }

    pub const fn filled(pen_color: Rgba, pen_width: f64, brush_color: Rgba) -> Self {
        Self {
            pen_color,
            pen_width,
            brush_color: Some(brush_color),
        }
    }

    pub const fn with_brush(self, brush_color: Option<Rgba>) -> Self {
        Self {
            pen_color: self.pen_color,
            pen_width: self.pen_width,
            brush_color,
        }
    }

    pub fn to_properties(&self) -> StyleResult<PropertyBag> {
        to_property_bag(self)
    }

    pub fn from_properties(properties: &PropertyBag) -> StyleResult<Self> {
        from_property_bag(properties)
    }

    pub fn to_config_text(&self) -> StyleResult<String> {
        to_config_text(self)
    }

    pub fn from_config_text(text: &str) -> StyleResult<Self> {
        from_config_text(text)
    }
}

impl Default for PaintStyle {
    fn default() -> Self {
        Self::stroke(Rgba::BLACK, 1.0)
    }
}

pub(crate) fn to_property_bag<T: Serialize>(value: &T) -> StyleResult<PropertyBag> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StyleError::NotAnObject),
    }
}

pub(crate) fn from_property_bag<T: DeserializeOwned>(
    properties: &PropertyBag,
) -> StyleResult<T> {
    Ok(serde_json::from_value(serde_json::Value::Object(
        properties.clone(),
    ))?)
}

/// Same fields as the property bag, in the form written to config files.
pub(crate) fn to_config_text<T: Serialize>(value: &T) -> StyleResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub(crate) fn from_config_text<T: DeserializeOwned>(text: &str) -> StyleResult<T> {
    Ok(serde_json::from_str(text)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleTool {
    Rectangle,
    Redaction,
    Square,
    Link,
}

impl StyleTool {
    pub const fn builtin_style(self) -> PaintStyle {
        match self {
            Self::Rectangle => PaintStyle::stroke(Rgba::BLACK, 1.0),
            Self::Redaction => PaintStyle::filled(Rgba::BLACK, 0.0, Rgba::BLACK),
            Self::Square => PaintStyle::filled(Rgba::RED, 1.0, Rgba::RED.with_alpha(64)),
            Self::Link => PaintStyle::stroke(Rgba::BLUE, 1.0),
        }
    }
}

/// Per-tool overrides; unset tools fall back to the built-in style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleDefaults {
    #[serde(default)]
    pub rectangle: Option<PaintStyle>,
    #[serde(default)]
    pub redaction: Option<PaintStyle>,
    #[serde(default)]
    pub square: Option<PaintStyle>,
    #[serde(default)]
    pub link: Option<PaintStyle>,
}

impl StyleDefaults {
    fn slot(&self, tool: StyleTool) -> Option<PaintStyle> {
        match tool {
            StyleTool::Rectangle => self.rectangle,
            StyleTool::Redaction => self.redaction,
            StyleTool::Square => self.square,
            StyleTool::Link => self.link,
        }
    }

    pub fn style_for(&self, tool: StyleTool) -> PaintStyle {
        self.slot(tool).unwrap_or_else(|| tool.builtin_style())
    }

    pub fn set_style(&mut self, tool: StyleTool, style: PaintStyle) {
        let slot = match tool {
            StyleTool::Rectangle => &mut self.rectangle,
            StyleTool::Redaction => &mut self.redaction,
            StyleTool::Square => &mut self.square,
            StyleTool::Link => &mut self.link,
        };
        *slot = Some(style);
    }
}

pub fn load_style_defaults() -> StyleResult<StyleDefaults> {
    let (xdg_config_home, home) = config_env_dirs();
    load_style_defaults_with(xdg_config_home.as_deref(), home.as_deref())
}

pub fn save_style_defaults(defaults: &StyleDefaults) -> StyleResult<()> {
    let (xdg_config_home, home) = config_env_dirs();
    save_style_defaults_with(defaults, xdg_config_home.as_deref(), home.as_deref())
}

fn load_style_defaults_with(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> StyleResult<StyleDefaults> {
    let path = style_config_path_with(xdg_config_home, home)?;
    if !path.exists() {
        return Ok(StyleDefaults::default());
    }

    let serialized = fs::read_to_string(&path).map_err(|source| StyleError::ReadConfig {
        path: path.clone(),
        source,
    })?;
    from_config_text(&serialized)
}

fn save_style_defaults_with(
    defaults: &StyleDefaults,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> StyleResult<()> {
    let path = style_config_path_with(xdg_config_home, home)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StyleError::WriteConfig {
            path: path.clone(),
            source,
        })?;
    }

    let serialized = to_config_text(defaults)?;
    fs::write(&path, serialized).map_err(|source| StyleError::WriteConfig {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "saved style defaults");
    Ok(())
}

fn style_config_path_with(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> StyleResult<PathBuf> {
    app_config_path(APP_DIR, STYLE_CONFIG_FILE, xdg_config_home, home).map_err(|error| {
        match error {
            ConfigPathError::MissingHomeDirectory => StyleError::MissingHomeDirectory,
        }
    })
}
