//! Graphics device access.
//!
//! A [`GraphicsBackend`] owns a device and the textures it creates. The
//! drawing core never touches textures outside a [`Graphics::enter`] scope,
//! so one backend can be shared between the render callback and the UI
//! callbacks of a host.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::effect::EffectPass;
use crate::error::DrawResult;

pub mod software;
pub mod wgpu_backend;

pub use software::{SoftwareBackend, SoftwareTexture};
pub use wgpu_backend::{WgpuBackend, WgpuTexture};

/// Textures know their own size.
pub trait TextureHandle: Send + 'static {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// Operations the drawing core needs from a device. All textures are RGBA8
/// with straight alpha.
pub trait GraphicsBackend: Send + 'static {
    type Texture: TextureHandle;

    /// Largest width or height a render target may have.
    fn max_texture_dimension(&self) -> u32;

    /// Creates a render target cleared to transparent black.
    fn create_render_target(&mut self, width: u32, height: u32) -> DrawResult<Self::Texture>;

    /// Creates a sampled texture from tightly packed RGBA8 rows.
    fn upload_texture(&mut self, width: u32, height: u32, rgba: &[u8])
        -> DrawResult<Self::Texture>;

    /// Replaces the contents of a texture created by `upload_texture`. The
    /// data must match the texture size.
    fn update_texture(&mut self, texture: &mut Self::Texture, rgba: &[u8]) -> DrawResult<()>;

    fn clear(&mut self, target: &mut Self::Texture) -> DrawResult<()>;

    /// Returns an independent copy usable as a render target or pass source.
    fn copy_texture(&mut self, source: &Self::Texture) -> DrawResult<Self::Texture>;

    /// Runs one tool pass. `pass.source` and `target` are always distinct.
    fn draw_pass(
        &mut self,
        pass: &EffectPass<'_, Self::Texture>,
        target: &mut Self::Texture,
    ) -> DrawResult<()>;

    /// Reads the texture back as tightly packed RGBA8 rows.
    fn read_pixels(&mut self, texture: &Self::Texture) -> DrawResult<Vec<u8>>;
}

/// Shared, serialized access to a backend.
pub struct Graphics<B> {
    inner: Arc<Mutex<B>>,
}

impl<B> Clone for Graphics<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: GraphicsBackend> Graphics<B> {
    pub fn new(backend: B) -> Self {
        Self {
            inner: Arc::new(Mutex::new(backend)),
        }
    }

    /// Acquires the graphics context. Texture work must happen while the
    /// returned guard is alive.
    pub fn enter(&self) -> MutexGuard<'_, B> {
        // A panic elsewhere leaves the device itself usable.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) fn validate_target_size(width: u32, height: u32, max_dimension: u32) -> DrawResult<()> {
    if width == 0 || height == 0 {
        return Err(crate::error::DrawError::render_target(
            width,
            height,
            "size must be non-zero",
        ));
    }
    if width > max_dimension || height > max_dimension {
        return Err(crate::error::DrawError::render_target(
            width,
            height,
            format!("exceeds maximum dimension {max_dimension}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_upload(width: u32, height: u32, rgba: &[u8]) -> DrawResult<()> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(crate::error::DrawError::render_target(
            width,
            height,
            format!("expected {expected} bytes of RGBA data, got {}", rgba.len()),
        ));
    }
    Ok(())
}
