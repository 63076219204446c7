//! Source settings.
//!
//! Hosts hand settings over as a JSON object ([`SettingsMap`]). Parsing is
//! lenient per key: a missing or mistyped value keeps what was there before,
//! so one bad key never resets the rest of the source.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::Color;
use crate::tool::{ToolKind, ToolState};

pub type SettingsMap = serde_json::Map<String, Value>;

pub const MIN_CANVAS_DIMENSION: u32 = 10;
pub const MAX_CANVAS_DIMENSION: u32 = 10000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawSettings {
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default)]
    pub tool: u32,
    /// Packed `0xAABBGGRR`.
    #[serde(default = "default_tool_color")]
    pub tool_color: u32,
    #[serde(default = "default_tool_alpha")]
    pub tool_alpha: f32,
    #[serde(default = "default_size")]
    pub tool_size: f32,
    #[serde(default)]
    pub tool_image_file: String,
    #[serde(default = "default_true")]
    pub show_cursor: bool,
    #[serde(default = "default_cursor_color")]
    pub cursor_color: u32,
    #[serde(default = "default_size")]
    pub cursor_size: f32,
    #[serde(default)]
    pub cursor_file: String,
    #[serde(default = "default_max_undo")]
    pub max_undo: u32,
    #[serde(default = "default_true")]
    pub enable_selection: bool,
    #[serde(default = "default_true")]
    pub enable_stamps: bool,
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
            tool: 0,
            tool_color: default_tool_color(),
            tool_alpha: default_tool_alpha(),
            tool_size: default_size(),
            tool_image_file: String::new(),
            show_cursor: true,
            cursor_color: default_cursor_color(),
            cursor_size: default_size(),
            cursor_file: String::new(),
            max_undo: default_max_undo(),
            enable_selection: true,
            enable_stamps: true,
        }
    }
}

fn default_dimension() -> u32 {
    200
}

fn default_tool_color() -> u32 {
    0xFF0000FF
}

fn default_tool_alpha() -> f32 {
    100.0
}

fn default_size() -> f32 {
    10.0
}

fn default_cursor_color() -> u32 {
    0xFFFFFF00
}

fn default_max_undo() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl DrawSettings {
    pub fn from_map(map: &SettingsMap) -> Self {
        let mut settings = Self::default();
        settings.merge_map(map);
        settings
    }

    /// Applies every well-typed key of `map`; other keys are ignored.
    pub fn merge_map(&mut self, map: &SettingsMap) {
        merge_u32(map, "width", &mut self.width);
        merge_u32(map, "height", &mut self.height);
        merge_u32(map, "tool", &mut self.tool);
        merge_packed_color(map, "tool_color", &mut self.tool_color);
        merge_f32(map, "tool_alpha", &mut self.tool_alpha);
        merge_f32(map, "tool_size", &mut self.tool_size);
        merge_string(map, "tool_image_file", &mut self.tool_image_file);
        merge_bool(map, "show_cursor", &mut self.show_cursor);
        merge_packed_color(map, "cursor_color", &mut self.cursor_color);
        merge_f32(map, "cursor_size", &mut self.cursor_size);
        merge_string(map, "cursor_file", &mut self.cursor_file);
        merge_u32(map, "max_undo", &mut self.max_undo);
        merge_bool(map, "enable_selection", &mut self.enable_selection);
        merge_bool(map, "enable_stamps", &mut self.enable_stamps);
    }

    pub fn to_map(&self) -> SettingsMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => SettingsMap::new(),
        }
    }

    pub fn defaults() -> SettingsMap {
        Self::default().to_map()
    }

    /// Width and height clamped to the supported range.
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.width.clamp(MIN_CANVAS_DIMENSION, MAX_CANVAS_DIMENSION),
            self.height.clamp(MIN_CANVAS_DIMENSION, MAX_CANVAS_DIMENSION),
        )
    }

    /// The tool the source actually uses: gated tool families fall back to
    /// [`ToolKind::None`].
    pub fn effective_tool(&self) -> ToolKind {
        let kind = ToolKind::from_id(i64::from(self.tool));
        if kind.is_selection() && !self.enable_selection {
            return ToolKind::None;
        }
        if kind.uses_image() && !self.enable_stamps {
            return ToolKind::None;
        }
        kind
    }

    pub fn tool_state(&self) -> ToolState {
        ToolState {
            kind: self.effective_tool(),
            color: Color::from_packed(self.tool_color),
            alpha: self.tool_alpha.clamp(-100.0, 100.0),
            size: self.tool_size.max(0.0),
        }
    }

    /// Cursor color; alpha is always opaque.
    pub fn cursor_color(&self) -> Color {
        Color::from_packed(self.cursor_color).with_alpha(255)
    }

    pub fn tool_image_path(&self) -> Option<&str> {
        non_empty(&self.tool_image_file)
    }

    pub fn cursor_image_path(&self) -> Option<&str> {
        non_empty(&self.cursor_file)
    }
}

fn non_empty(path: &str) -> Option<&str> {
    let path = path.trim();
    (!path.is_empty()).then_some(path)
}

fn merge_u32(map: &SettingsMap, key: &str, slot: &mut u32) {
    let parsed = match map.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            .and_then(|v| u32::try_from(v).ok()),
        _ => None,
    };
    if let Some(value) = parsed {
        *slot = value;
    }
}

fn merge_f32(map: &SettingsMap, key: &str, slot: &mut f32) {
    if let Some(value) = map.get(key).and_then(Value::as_f64) {
        if value.is_finite() {
            *slot = value as f32;
        }
    }
}

fn merge_bool(map: &SettingsMap, key: &str, slot: &mut bool) {
    if let Some(value) = map.get(key).and_then(Value::as_bool) {
        *slot = value;
    }
}

fn merge_string(map: &SettingsMap, key: &str, slot: &mut String) {
    if let Some(value) = map.get(key).and_then(Value::as_str) {
        *slot = value.to_owned();
    }
}

/// Packed colors arrive as integers, sometimes sign-extended from 32 bits.
fn merge_packed_color(map: &SettingsMap, key: &str, slot: &mut u32) {
    if let Some(value) = map.get(key).and_then(parse_packed_color) {
        *slot = value;
    }
}

pub(crate) fn parse_packed_color(value: &Value) -> Option<u32> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(v) = n.as_u64() {
        return u32::try_from(v).ok();
    }
    n.as_i64()
        .filter(|v| *v >= i64::from(i32::MIN))
        .map(|v| v as i32 as u32)
}

/// Describes one editable setting for a host properties view.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: PropertyKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Int { min: i64, max: i64, step: i64 },
    Float {
        min: f64,
        max: f64,
        step: f64,
        suffix: &'static str,
    },
    Bool,
    Color,
    List(Vec<(&'static str, i64)>),
    Path { filter: &'static str },
    Button,
}

const IMAGE_FILTER: &str = "Image files (*.bmp *.tga *.png *.jpeg *.jpg *.gif)";

pub fn properties() -> Vec<Property> {
    let tools = ToolKind::ALL
        .iter()
        .map(|kind| (kind.label(), i64::from(kind.id())))
        .collect();
    let dimension = PropertyKind::Int {
        min: i64::from(MIN_CANVAS_DIMENSION),
        max: i64::from(MAX_CANVAS_DIMENSION),
        step: 1,
    };
    vec![
        Property {
            name: "width",
            description: "Width",
            kind: dimension.clone(),
        },
        Property {
            name: "height",
            description: "Height",
            kind: dimension,
        },
        Property {
            name: "tool",
            description: "Tool",
            kind: PropertyKind::List(tools),
        },
        Property {
            name: "tool_color",
            description: "Tool color",
            kind: PropertyKind::Color,
        },
        Property {
            name: "tool_alpha",
            description: "Tool alpha",
            kind: PropertyKind::Float {
                min: -100.0,
                max: 100.0,
                step: 0.1,
                suffix: "%",
            },
        },
        Property {
            name: "tool_size",
            description: "Tool size",
            kind: PropertyKind::Float {
                min: 0.0,
                max: 1000.0,
                step: 0.1,
                suffix: "px",
            },
        },
        Property {
            name: "tool_image_file",
            description: "Tool image",
            kind: PropertyKind::Path {
                filter: IMAGE_FILTER,
            },
        },
        Property {
            name: "show_cursor",
            description: "Show cursor",
            kind: PropertyKind::Bool,
        },
        Property {
            name: "cursor_color",
            description: "Cursor color",
            kind: PropertyKind::Color,
        },
        Property {
            name: "cursor_size",
            description: "Cursor size",
            kind: PropertyKind::Float {
                min: 0.0,
                max: 100.0,
                step: 0.1,
                suffix: "px",
            },
        },
        Property {
            name: "cursor_file",
            description: "Cursor image",
            kind: PropertyKind::Path {
                filter: IMAGE_FILTER,
            },
        },
        Property {
            name: "max_undo",
            description: "Maximum undo",
            kind: PropertyKind::Int {
                min: 0,
                max: 10000,
                step: 1,
            },
        },
        Property {
            name: "enable_selection",
            description: "Enable selection tools",
            kind: PropertyKind::Bool,
        },
        Property {
            name: "enable_stamps",
            description: "Enable stamp and image tools",
            kind: PropertyKind::Bool,
        },
        Property {
            name: "clear",
            description: "Clear",
            kind: PropertyKind::Button,
        },
    ]
}
