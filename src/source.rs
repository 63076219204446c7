//! The draw source: a paintable canvas exposed to a host as a video source.
//!
//! [`DrawSource`] wires the pieces together. Pointer and key callbacks go
//! through [`PointerState`], whose steps are run against the [`History`] and
//! the [`CanvasBuffers`] inside one graphics-context acquisition. Rendering
//! composes the front buffer with previews and the cursor into a separate
//! output texture, so the canvas itself only ever changes through commits,
//! clears and history.
//!
//! Host callbacks never fail. Errors from the graphics layer are logged and
//! the canvas is left as it was.

use std::path::Path;
use std::time::Duration;

use crate::canvas::CanvasBuffers;
use crate::color::Color;
use crate::control::{CallData, DrawRequest};
use crate::effect::{CursorDraw, CursorParams, EffectPass, PassParams};
use crate::error::{DrawError, DrawResult};
use crate::graphics::{Graphics, GraphicsBackend, TextureHandle};
use crate::history::History;
use crate::image_asset::{AnimatedImage, ImageCache};
use crate::interaction::{
    key_command, GesturePhase, GestureStep, GestureSteps, KeyCommand, Modifiers, MouseButton,
    Point, PointerState, Selection, Stroke,
};
use crate::settings::{DrawSettings, SettingsMap};
use crate::tool::{ToolKind, ToolState};

/// Pointer position in canvas pixels plus the modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseEvent {
    pub x: f32,
    pub y: f32,
    pub modifiers: Modifiers,
}

impl MouseEvent {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeyEvent {
    /// The character the key produces, if any. Modifier-only presses have none.
    pub key: Option<char>,
    pub modifiers: Modifiers,
}

struct CursorOverlay<T> {
    visible: bool,
    color: Color,
    size: f32,
    path: Option<String>,
    animation: Option<AnimatedImage>,
    texture: Option<T>,
}

impl<T> Default for CursorOverlay<T> {
    fn default() -> Self {
        Self {
            visible: true,
            color: Color::from_packed(0xFFFFFF00).with_alpha(255),
            size: 10.0,
            path: None,
            animation: None,
            texture: None,
        }
    }
}

struct ToolImage<T> {
    path: String,
    texture: T,
}

pub struct DrawSource<B: GraphicsBackend> {
    graphics: Graphics<B>,
    settings: DrawSettings,
    tool: ToolState,
    cursor: CursorOverlay<B::Texture>,
    tool_image: Option<ToolImage<B::Texture>>,
    canvas: CanvasBuffers<B::Texture>,
    history: History<B::Texture>,
    pointer: PointerState,
    output: Option<B::Texture>,
    images: ImageCache,
}

impl<B: GraphicsBackend> DrawSource<B> {
    pub fn new(graphics: Graphics<B>, settings: &SettingsMap) -> Self {
        let settings = DrawSettings::from_map(settings);
        let (width, height) = settings.canvas_size();
        let mut source = Self {
            graphics,
            settings: DrawSettings::default(),
            tool: ToolState::default(),
            cursor: CursorOverlay::default(),
            tool_image: None,
            canvas: CanvasBuffers::new(),
            history: History::new(settings.max_undo as usize),
            pointer: PointerState::new(width, height),
            output: None,
            images: ImageCache::default(),
        };
        let graphics = source.graphics.clone();
        let mut backend = graphics.enter();
        source.apply_settings(&mut backend, settings);
        source
    }

    pub fn defaults() -> SettingsMap {
        DrawSettings::defaults()
    }

    pub fn properties() -> Vec<crate::settings::Property> {
        crate::settings::properties()
    }

    /// Applies changed settings. Keys that are missing or mistyped keep their
    /// current value.
    pub fn update(&mut self, settings: &SettingsMap) {
        let mut next = self.settings.clone();
        next.merge_map(settings);
        let graphics = self.graphics.clone();
        let mut backend = graphics.enter();
        self.apply_settings(&mut backend, next);
    }

    fn apply_settings(&mut self, backend: &mut B, next: DrawSettings) {
        let (width, height) = next.canvas_size();
        let next_tool = next.tool_state();

        if next_tool.kind != self.tool.kind {
            self.terminate_gesture();
        }

        if !self.canvas.is_allocated() || self.canvas.size() != (width, height) {
            self.terminate_gesture();
            match self.canvas.resize(backend, width, height) {
                Ok(()) => {
                    // Entries of the old size can never be restored.
                    self.history.clear();
                    self.pointer.set_canvas_size(width, height);
                    self.pointer.reset_selection();
                    self.output = None;
                    tracing::info!(width, height, "draw canvas resized");
                }
                Err(error) => {
                    tracing::warn!(%error, "canvas resize failed, keeping previous buffers");
                }
            }
        }

        self.history.set_max_undo(next.max_undo as usize);
        self.tool = next_tool;
        self.cursor.visible = next.show_cursor;
        self.cursor.color = next.cursor_color();
        self.cursor.size = next.cursor_size.max(0.0);

        let loaded_tool_image = self.tool_image.as_ref().map(|image| image.path.as_str());
        if next.tool_image_path() != loaded_tool_image {
            self.load_tool_image(backend, next.tool_image_path());
        }
        if next.cursor_image_path() != self.cursor.path.as_deref() {
            self.load_cursor_image(backend, next.cursor_image_path());
        }

        self.settings = next;
    }

    fn load_tool_image(&mut self, backend: &mut B, path: Option<&str>) {
        self.tool_image = None;
        let Some(path) = path else {
            return;
        };
        let loaded = self.images.load(Path::new(path)).and_then(|image| {
            let frame = image.first_frame();
            backend.upload_texture(frame.width, frame.height, &frame.pixels)
        });
        match loaded {
            Ok(texture) => {
                tracing::debug!(path, "tool image loaded");
                self.tool_image = Some(ToolImage {
                    path: path.to_owned(),
                    texture,
                });
            }
            Err(error) => tracing::warn!(%error, path, "tool image unavailable"),
        }
    }

    fn load_cursor_image(&mut self, backend: &mut B, path: Option<&str>) {
        self.cursor.path = path.map(str::to_owned);
        self.cursor.animation = None;
        self.cursor.texture = None;
        let Some(path) = path else {
            return;
        };
        let image = match self.images.load(Path::new(path)) {
            Ok(image) => image,
            Err(error) => {
                tracing::warn!(%error, path, "cursor image unavailable");
                return;
            }
        };
        let animation = AnimatedImage::new(image);
        let frame = animation.current();
        match backend.upload_texture(frame.width, frame.height, &frame.pixels) {
            Ok(texture) => {
                self.cursor.texture = Some(texture);
                self.cursor.animation = Some(animation);
            }
            Err(error) => tracing::warn!(%error, path, "cursor image upload failed"),
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn settings(&self) -> &DrawSettings {
        &self.settings
    }

    pub fn tool(&self) -> &ToolState {
        &self.tool
    }

    pub fn graphics(&self) -> &Graphics<B> {
        &self.graphics
    }

    pub fn phase(&self) -> GesturePhase {
        self.pointer.phase
    }

    pub fn selection(&self) -> Selection {
        self.pointer.selection
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_len()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_len()
    }

    /// The current canvas raster, without previews or cursor.
    pub fn canvas_texture(&self) -> Option<&B::Texture> {
        self.canvas.front()
    }

    /// Composes the frame for display: the canvas plus the shape preview,
    /// the selection marquee and the cursor. Falls back to the bare canvas if
    /// composition fails. `None` only when the canvas has no buffers.
    pub fn video_render(&mut self) -> Option<&B::Texture> {
        let graphics = self.graphics.clone();
        let mut backend = graphics.enter();
        let size = self.canvas.size();

        if self.output.as_ref().map(TextureHandle::size) != Some(size) {
            self.output = None;
            match backend.create_render_target(size.0, size.1) {
                Ok(texture) => self.output = Some(texture),
                Err(error) => {
                    tracing::warn!(%error, "cannot create output texture");
                    return self.canvas.front();
                }
            }
        }

        let params = self.present_params();
        let front = self.canvas.front()?;
        let tool_image = self.tool_image.as_ref().map(|image| &image.texture);
        let cursor_image = self.cursor.texture.as_ref();
        let output = self.output.as_mut()?;
        let pass = EffectPass {
            source: front,
            params,
            tool_image,
            cursor_image,
        };
        match backend.draw_pass(&pass, output) {
            Ok(()) => self.output.as_ref(),
            Err(error) => {
                tracing::warn!(%error, "present pass failed");
                self.canvas.front()
            }
        }
    }

    fn present_params(&self) -> PassParams {
        let mode = if !self.cursor.visible || !self.pointer.hovering {
            CursorDraw::Hidden
        } else if self.cursor.texture.is_some() {
            CursorDraw::Image
        } else {
            CursorDraw::Circle
        };
        let cursor = CursorParams {
            mode,
            color: self.cursor.color,
            size: self.cursor.size,
        };
        PassParams::present(&self.tool, self.pointer.stroke(), cursor, self.canvas.size())
    }

    /// Advances an animated cursor image.
    pub fn video_tick(&mut self, seconds: f32) {
        let Ok(delta) = Duration::try_from_secs_f32(seconds) else {
            return;
        };
        let Some(animation) = self.cursor.animation.as_mut() else {
            return;
        };
        if !animation.tick(delta) {
            return;
        }
        let frame = animation.current();
        let Some(texture) = self.cursor.texture.as_mut() else {
            return;
        };
        let graphics = self.graphics.clone();
        let mut backend = graphics.enter();
        let result = if texture.size() == (frame.width, frame.height) {
            backend.update_texture(texture, &frame.pixels)
        } else {
            backend
                .upload_texture(frame.width, frame.height, &frame.pixels)
                .map(|replacement| *texture = replacement)
        };
        if let Err(error) = result {
            tracing::warn!(%error, "cursor frame upload failed");
        }
    }

    pub fn mouse_move(&mut self, event: MouseEvent, leave: bool) {
        // Mouse input always paints at full pressure.
        self.pointer.pressure = 1.0;
        let steps = self
            .pointer
            .motion(self.tool.kind, event.position(), event.modifiers, leave);
        self.run_steps(steps);
    }

    pub fn mouse_click(
        &mut self,
        event: MouseEvent,
        button: MouseButton,
        mouse_up: bool,
        _click_count: u32,
    ) {
        let steps = if mouse_up {
            self.pointer
                .release(self.tool.kind, button, event.position(), event.modifiers)
        } else {
            self.pointer.pressure = 1.0;
            self.pointer
                .press(self.tool.kind, button, event.position(), event.modifiers)
        };
        self.run_steps(steps);
    }

    pub fn key_click(&mut self, event: KeyEvent, key_up: bool) {
        self.pointer.modifiers = event.modifiers;
        if key_up {
            return;
        }
        match event.key.and_then(|key| key_command(key, event.modifiers)) {
            Some(KeyCommand::Undo) => self.undo(),
            Some(KeyCommand::Redo) => self.redo(),
            None => {}
        }
    }

    pub fn focus(&mut self, focused: bool) {
        if !focused {
            self.pointer.modifiers = Modifiers::default();
            self.pointer.hovering = false;
        }
        tracing::trace!(focused, "draw source focus changed");
    }

    /// Pen input: positive pressure presses or drags, zero releases.
    pub fn tablet(&mut self, x: f32, y: f32, pressure: f32) {
        let position = Point::new(x, y);
        let modifiers = self.pointer.modifiers;
        let kind = self.tool.kind;
        let steps = if pressure > 0.0 {
            self.pointer.pressure = pressure;
            if self.pointer.phase == GesturePhase::Up {
                let steps = self
                    .pointer
                    .press(kind, MouseButton::Left, position, modifiers);
                if self.pointer.phase == GesturePhase::Up {
                    // Rejected contact, e.g. outside the canvas.
                    self.pointer.pressure = 1.0;
                }
                steps
            } else {
                self.pointer.motion(kind, position, modifiers, false)
            }
        } else {
            let steps = self
                .pointer
                .release(kind, MouseButton::Left, position, modifiers);
            self.pointer.pressure = 1.0;
            steps
        };
        self.run_steps(steps);
    }

    /// Clears the canvas to transparent. The previous content is one undo
    /// away.
    pub fn clear(&mut self) {
        let graphics = self.graphics.clone();
        let mut backend = graphics.enter();
        self.terminate_gesture();
        self.history.snapshot(&mut *backend, &self.canvas);
        match self.canvas.clear(&mut *backend) {
            Ok(()) => tracing::info!("draw canvas cleared"),
            Err(error) => tracing::warn!(%error, "canvas clear failed"),
        }
    }

    pub fn undo(&mut self) {
        let graphics = self.graphics.clone();
        let _backend = graphics.enter();
        self.terminate_gesture();
        if self.history.undo(&mut self.canvas) {
            tracing::debug!(
                undo = self.history.undo_len(),
                redo = self.history.redo_len(),
                "undo"
            );
        }
    }

    pub fn redo(&mut self) {
        let graphics = self.graphics.clone();
        let _backend = graphics.enter();
        self.terminate_gesture();
        if self.history.redo(&mut self.canvas) {
            tracing::debug!(
                undo = self.history.undo_len(),
                redo = self.history.redo_len(),
                "redo"
            );
        }
    }

    /// Remote draw: one stroke from `from` to `to` with the given tool
    /// parameters, committed as its own undo step. Parameters that are not
    /// supplied keep their current values and the supplied ones stick.
    pub fn draw(&mut self, data: &CallData) {
        let request = DrawRequest::from_call_data(data);
        if let Some(tool) = request.tool {
            self.settings.tool = tool.id();
        }
        if let Some(color) = request.color {
            self.settings.tool_color = color.to_packed();
            if request.alpha.is_none() {
                self.settings.tool_alpha = f32::from(color.alpha()) / 255.0 * 100.0;
            }
        }
        if let Some(alpha) = request.alpha {
            self.settings.tool_alpha = alpha;
        }
        if let Some(size) = request.size {
            self.settings.tool_size = size;
        }
        let from = Point::new(
            request.from_x.unwrap_or(self.pointer.previous.x),
            request.from_y.unwrap_or(self.pointer.previous.y),
        );
        let to = Point::new(
            request.to_x.unwrap_or(self.pointer.current.x),
            request.to_y.unwrap_or(self.pointer.current.y),
        );

        let graphics = self.graphics.clone();
        let mut backend = graphics.enter();
        self.terminate_gesture();
        self.tool = self.settings.tool_state();
        self.pointer.previous = from;
        self.pointer.current = to;

        let kind = self.tool.kind;
        let paints = kind != ToolKind::None
            && !kind.is_selection()
            && (!kind.uses_image() || self.tool_image.is_some());
        if paints {
            let stroke = Stroke {
                selection: self.pointer.selection,
                ..Stroke::new(from, to)
            };
            self.history.snapshot(&mut *backend, &self.canvas);
            self.commit(&mut backend, stroke);
        }
        self.pointer.previous = to;
        tracing::debug!(tool = ?kind, ?from, ?to, paints, "remote draw");
    }

    /// Named procedure entry point.
    pub fn call(&mut self, name: &str, data: &CallData) -> DrawResult<()> {
        match name {
            "clear" => self.clear(),
            "undo" => self.undo(),
            "redo" => self.redo(),
            "draw" => self.draw(data),
            "tablet" => {
                let number = |key: &str| data.get(key).and_then(|value| value.as_f64());
                let x = number("posx").map_or(self.pointer.current.x, |v| v as f32);
                let y = number("posy").map_or(self.pointer.current.y, |v| v as f32);
                let pressure = number("pressure").map_or(0.0, |v| v as f32);
                self.tablet(x, y, pressure);
            }
            other => return Err(DrawError::UnknownProcedure(other.to_owned())),
        }
        Ok(())
    }

    /// Reads the canvas raster back as RGBA8 rows.
    pub fn canvas_pixels(&self) -> DrawResult<Vec<u8>> {
        let mut backend = self.graphics.enter();
        let front = self
            .canvas
            .front()
            .ok_or_else(|| DrawError::Readback("canvas has no buffers".into()))?;
        backend.read_pixels(front)
    }

    /// Renders a frame and reads it back as RGBA8 rows.
    pub fn frame_pixels(&mut self) -> DrawResult<Vec<u8>> {
        let graphics = self.graphics.clone();
        let frame = self
            .video_render()
            .ok_or_else(|| DrawError::Readback("canvas has no buffers".into()))?;
        let mut backend = graphics.enter();
        backend.read_pixels(frame)
    }

    fn run_steps(&mut self, steps: GestureSteps) {
        if steps.is_empty() {
            return;
        }
        let graphics = self.graphics.clone();
        let mut backend = graphics.enter();
        for step in steps {
            match step {
                GestureStep::Snapshot => self.history.snapshot(&mut *backend, &self.canvas),
                GestureStep::Apply(stroke) => self.commit(&mut backend, stroke),
                GestureStep::DiscardSnapshot => self.history.discard_latest(),
            }
        }
    }

    fn commit(&mut self, backend: &mut B, stroke: Stroke) {
        let params = PassParams::commit(&self.tool, stroke, self.canvas.size());
        let tool_image = self.tool_image.as_ref().map(|image| &image.texture);
        if let Err(error) = self.canvas.render_into(backend, &params, tool_image, None) {
            tracing::warn!(%error, tool = ?self.tool.kind, "tool pass failed, canvas unchanged");
        }
    }

    /// Ends any gesture in progress without committing it.
    fn terminate_gesture(&mut self) {
        for step in self.pointer.cancel() {
            if step == GestureStep::DiscardSnapshot {
                self.history.discard_latest();
            }
        }
    }
}

impl<B: GraphicsBackend> Drop for DrawSource<B> {
    fn drop(&mut self) {
        let graphics = self.graphics.clone();
        let _backend = graphics.enter();
        self.history.clear();
        self.canvas.release();
        self.output = None;
        self.tool_image = None;
        self.cursor.texture = None;
        tracing::debug!("draw source released");
    }
}
