//! A paintable canvas exposed as a video source.
//!
//! [`DrawSource`] owns a double-buffered canvas that tools paint into with a
//! single effect pass, a bounded undo/redo history of canvas snapshots and a
//! pointer state machine fed by host callbacks. Rendering runs on a
//! [`GraphicsBackend`]: [`WgpuBackend`] on a GPU, or [`SoftwareBackend`]
//! which evaluates the same pass on the CPU.
//!
//! ```
//! use drawsource::{DrawSource, Graphics, MouseButton, MouseEvent, SoftwareBackend};
//!
//! let graphics = Graphics::new(SoftwareBackend::new());
//! let mut settings = drawsource::SettingsMap::new();
//! settings.insert("tool".into(), 1.into());
//! let mut source = DrawSource::new(graphics, &settings);
//!
//! source.mouse_click(MouseEvent::new(10.0, 10.0), MouseButton::Left, false, 1);
//! source.mouse_move(MouseEvent::new(40.0, 40.0), false);
//! source.mouse_click(MouseEvent::new(40.0, 40.0), MouseButton::Left, true, 1);
//! assert_eq!(source.undo_depth(), 1);
//!
//! source.undo();
//! assert!(source.canvas_pixels().unwrap().iter().all(|&b| b == 0));
//! ```

pub use wgpu;

mod canvas;
mod color;
mod control;
mod effect;
mod error;
mod events;
pub mod graphics;
mod history;
mod image_asset;
pub mod interaction;
mod settings;
pub mod shading;
mod source;
mod tool;

pub use canvas::CanvasBuffers;
pub use color::Color;
pub use control::{
    lock_source, CallData, DrawRequest, SharedSource, SourceRegistry, VendorResponse,
};
pub use effect::{CursorDraw, CursorParams, EffectPass, PassKind, PassParams, ToolUniforms};
pub use error::{DrawError, DrawResult};
pub use events::{EventBus, SourceEvent, Subscription};
pub use graphics::{
    Graphics, GraphicsBackend, SoftwareBackend, SoftwareTexture, TextureHandle, WgpuBackend,
    WgpuTexture,
};
pub use history::History;
pub use image_asset::{AnimatedImage, DecodedImage, ImageCache, ImageFrame};
pub use interaction::{GesturePhase, Modifiers, MouseButton, Point, Selection, Stroke};
pub use settings::{
    properties, DrawSettings, Property, PropertyKind, SettingsMap, MAX_CANVAS_DIMENSION,
    MIN_CANVAS_DIMENSION,
};
pub use source::{DrawSource, KeyEvent, MouseEvent};
pub use tool::{ToolKind, ToolState};
