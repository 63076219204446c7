//! Remote control: procedure payloads, the source registry and vendor
//! requests.
//!
//! The registry is an explicit context object. Hosts that route requests
//! to "the" draw source set a default and leave out the `source` key.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use serde::Serialize;
use serde_json::Value;

use crate::color::Color;
use crate::error::{DrawError, DrawResult};
use crate::events::{EventBus, SourceEvent, Subscription};
use crate::graphics::GraphicsBackend;
use crate::settings::{parse_packed_color, SettingsMap};
use crate::source::DrawSource;
use crate::tool::ToolKind;

/// Arguments of a procedure call, a JSON object.
pub type CallData = serde_json::Map<String, Value>;

/// Payload of the `draw` procedure. Every field is optional; absent or
/// mistyped keys come out as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawRequest {
    pub tool: Option<ToolKind>,
    pub from_x: Option<f32>,
    pub from_y: Option<f32>,
    pub to_x: Option<f32>,
    pub to_y: Option<f32>,
    /// Fully transparent colors are promoted to opaque.
    pub color: Option<Color>,
    pub alpha: Option<f32>,
    pub size: Option<f32>,
}

impl DrawRequest {
    pub fn from_call_data(data: &CallData) -> Self {
        let number = |key: &str| {
            data.get(key)
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite())
                .map(|value| value as f32)
        };
        let color = data
            .get("tool_color")
            .and_then(parse_packed_color)
            .map(Color::from_packed)
            .map(|color| {
                if color.alpha() == 0 {
                    color.with_alpha(255)
                } else {
                    color
                }
            });
        Self {
            tool: data.get("tool").and_then(Value::as_i64).map(ToolKind::from_id),
            from_x: number("from_x"),
            from_y: number("from_y"),
            to_x: number("to_x"),
            to_y: number("to_y"),
            color,
            alpha: number("tool_alpha").map(|alpha| alpha.clamp(-100.0, 100.0)),
            size: number("tool_size").map(|size| size.max(0.0)),
        }
    }
}

pub type SharedSource<B> = Arc<Mutex<DrawSource<B>>>;

/// Locks a shared source. A panic on another thread does not make the source
/// unusable.
pub fn lock_source<B: GraphicsBackend>(source: &SharedSource<B>) -> MutexGuard<'_, DrawSource<B>> {
    source.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct VendorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl VendorResponse {
    fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn failed(error: &DrawError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            version: None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub struct SourceRegistry<B: GraphicsBackend> {
    sources: AHashMap<String, SharedSource<B>>,
    default_source: Option<String>,
    events: EventBus,
}

impl<B: GraphicsBackend> Default for SourceRegistry<B> {
    fn default() -> Self {
        Self {
            sources: AHashMap::new(),
            default_source: None,
            events: EventBus::new(),
        }
    }
}

impl<B: GraphicsBackend> SourceRegistry<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Adds a source under `name`, replacing any source of that name. The
    /// first source registered becomes the default.
    pub fn register(&mut self, name: impl Into<String>, source: DrawSource<B>) -> SharedSource<B> {
        let name = name.into();
        let shared = Arc::new(Mutex::new(source));
        if self.sources.insert(name.clone(), Arc::clone(&shared)).is_some() {
            tracing::debug!(name, "replaced draw source");
        }
        if self.default_source.is_none() {
            self.default_source = Some(name.clone());
        }
        tracing::info!(name, "draw source registered");
        self.events.emit(SourceEvent::SourceCreated { name });
        shared
    }

    pub fn remove(&mut self, name: &str) -> Option<SharedSource<B>> {
        let removed = self.sources.remove(name)?;
        if self.default_source.as_deref() == Some(name) {
            self.default_source = None;
        }
        tracing::info!(name, "draw source removed");
        self.events.emit(SourceEvent::SourceDestroyed {
            name: name.to_owned(),
        });
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<SharedSource<B>> {
        self.sources.get(name).cloned()
    }

    pub fn default_source(&self) -> Option<&str> {
        self.default_source.as_deref()
    }

    pub fn set_default(&mut self, name: &str) -> DrawResult<()> {
        if !self.sources.contains_key(name) {
            return Err(DrawError::SourceNotFound(name.to_owned()));
        }
        self.default_source = Some(name.to_owned());
        Ok(())
    }

    /// Looks up `name`, or the default source when no name is given.
    pub fn resolve(&self, name: Option<&str>) -> DrawResult<SharedSource<B>> {
        match name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| DrawError::SourceNotFound(name.to_owned())),
            None => {
                let name = self.default_source.as_deref().ok_or(DrawError::NoDefaultSource)?;
                self.get(name)
                    .ok_or_else(|| DrawError::SourceNotFound(name.to_owned()))
            }
        }
    }

    pub fn update_source(&self, name: &str, settings: &SettingsMap) -> DrawResult<()> {
        let source = self.resolve(Some(name))?;
        lock_source(&source).update(settings);
        self.events.emit(SourceEvent::SourceUpdated {
            name: name.to_owned(),
        });
        Ok(())
    }

    pub fn scene_changed(&self) {
        self.events.emit(SourceEvent::SceneChanged);
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    /// Answers a vendor request. `clear` and `draw` act on the source named
    /// by the optional `source` key, or the default source.
    pub fn handle_vendor_request(&self, request: &str, data: &CallData) -> Value {
        tracing::debug!(request, "vendor request");
        let response = match self.dispatch(request, data) {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, request, "vendor request failed");
                VendorResponse::failed(&error)
            }
        };
        response.to_value()
    }

    fn dispatch(&self, request: &str, data: &CallData) -> DrawResult<VendorResponse> {
        match request {
            "version" => Ok(VendorResponse {
                version: Some(env!("CARGO_PKG_VERSION").to_owned()),
                ..VendorResponse::ok()
            }),
            "clear" | "draw" => {
                let name = data.get("source").and_then(Value::as_str);
                let source = self.resolve(name)?;
                lock_source(&source).call(request, data)?;
                Ok(VendorResponse::ok())
            }
            other => Err(DrawError::UnknownProcedure(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call_data(value: Value) -> CallData {
        match value {
            Value::Object(map) => map,
            _ => CallData::new(),
        }
    }

    #[test]
    fn draw_request_reads_known_keys() {
        let request = DrawRequest::from_call_data(&call_data(json!({
            "tool": 3,
            "from_x": 10,
            "from_y": 12.5,
            "to_x": "far",
            "tool_color": 0xFF00FF00u32,
            "tool_size": 4.0,
        })));
        assert_eq!(request.tool, Some(ToolKind::Line));
        assert_eq!(request.from_x, Some(10.0));
        assert_eq!(request.from_y, Some(12.5));
        assert_eq!(request.to_x, None);
        assert_eq!(request.color, Some(Color::rgb(0, 255, 0)));
        assert_eq!(request.alpha, None);
        assert_eq!(request.size, Some(4.0));
    }

    #[test]
    fn transparent_color_is_promoted_to_opaque() {
        let request = DrawRequest::from_call_data(&call_data(json!({ "tool_color": 0x000000FF })));
        assert_eq!(request.color, Some(Color::rgba(255, 0, 0, 255)));
    }

    #[test]
    fn unknown_tool_ids_fall_back_to_none() {
        let request = DrawRequest::from_call_data(&call_data(json!({ "tool": 99 })));
        assert_eq!(request.tool, Some(ToolKind::None));
    }

    #[test]
    fn response_omits_absent_fields() {
        assert_eq!(VendorResponse::ok().to_value(), json!({ "success": true }));
        let failed = VendorResponse::failed(&DrawError::NoDefaultSource);
        assert_eq!(failed.to_value()["success"], json!(false));
        assert!(failed.to_value()["error"].is_string());
    }
}
