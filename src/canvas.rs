use crate::effect::{EffectPass, PassParams};
use crate::error::DrawResult;
use crate::graphics::{GraphicsBackend, TextureHandle};

struct BufferPair<T> {
    buffer_a: T,
    buffer_b: T,
    a_is_front: bool,
}

impl<T> BufferPair<T> {
    fn front(&self) -> &T {
        if self.a_is_front {
            &self.buffer_a
        } else {
            &self.buffer_b
        }
    }

    fn front_mut(&mut self) -> &mut T {
        if self.a_is_front {
            &mut self.buffer_a
        } else {
            &mut self.buffer_b
        }
    }

    fn back_mut(&mut self) -> &mut T {
        if self.a_is_front {
            &mut self.buffer_b
        } else {
            &mut self.buffer_a
        }
    }

    /// Front for reading, back for writing.
    fn split(&mut self) -> (&T, &mut T) {
        if self.a_is_front {
            (&self.buffer_a, &mut self.buffer_b)
        } else {
            (&self.buffer_b, &mut self.buffer_a)
        }
    }

    fn flip(&mut self) {
        self.a_is_front = !self.a_is_front;
    }
}

/// The persistent raster: two same-sized render targets and a flag saying
/// which one is front. Passes read the front and write the back, then flip.
pub struct CanvasBuffers<T> {
    pair: Option<BufferPair<T>>,
    width: u32,
    height: u32,
}

impl<T: TextureHandle> Default for CanvasBuffers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TextureHandle> CanvasBuffers<T> {
    /// An empty canvas. Call [`CanvasBuffers::resize`] to allocate buffers.
    pub fn new() -> Self {
        Self {
            pair: None,
            width: 0,
            height: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_allocated(&self) -> bool {
        self.pair.is_some()
    }

    pub fn front(&self) -> Option<&T> {
        self.pair.as_ref().map(BufferPair::front)
    }

    /// Recreates both buffers blank at the new size, front reset to buffer A.
    /// On error the previous buffers and size are kept.
    pub fn resize<B>(&mut self, backend: &mut B, width: u32, height: u32) -> DrawResult<()>
    where
        B: GraphicsBackend<Texture = T>,
    {
        let buffer_a = backend.create_render_target(width, height)?;
        let buffer_b = backend.create_render_target(width, height)?;
        self.pair = Some(BufferPair {
            buffer_a,
            buffer_b,
            a_is_front: true,
        });
        self.width = width;
        self.height = height;
        tracing::debug!(width, height, "canvas buffers created");
        Ok(())
    }

    /// Runs one pass from front to back and flips. Without buffers this is a
    /// no-op; on a failed pass the front stays where it was.
    pub fn render_into<B>(
        &mut self,
        backend: &mut B,
        params: &PassParams,
        tool_image: Option<&T>,
        cursor_image: Option<&T>,
    ) -> DrawResult<()>
    where
        B: GraphicsBackend<Texture = T>,
    {
        let Some(pair) = self.pair.as_mut() else {
            return Ok(());
        };
        let (source, target) = pair.split();
        backend.draw_pass(
            &EffectPass {
                source,
                params: *params,
                tool_image,
                cursor_image,
            },
            target,
        )?;
        pair.flip();
        Ok(())
    }

    /// Clears the back buffer to transparent and flips.
    pub fn clear<B>(&mut self, backend: &mut B) -> DrawResult<()>
    where
        B: GraphicsBackend<Texture = T>,
    {
        let Some(pair) = self.pair.as_mut() else {
            return Ok(());
        };
        backend.clear(pair.back_mut())?;
        pair.flip();
        Ok(())
    }

    /// Installs `entry` as the front buffer and returns the texture it
    /// replaced. Entries of another size, or a canvas without buffers, hand
    /// the entry back as the error.
    pub fn swap_front(&mut self, entry: T) -> Result<T, T> {
        if entry.size() != self.size() {
            return Err(entry);
        }
        match self.pair.as_mut() {
            Some(pair) => Ok(std::mem::replace(pair.front_mut(), entry)),
            None => Err(entry),
        }
    }

    /// Drops both buffers.
    pub fn release(&mut self) {
        self.pair = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::SoftwareBackend;

    fn fill(backend: &mut SoftwareBackend, value: u8) -> crate::graphics::SoftwareTexture {
        backend.upload_texture(4, 4, &[value; 64]).unwrap()
    }

    #[test]
    fn failed_resize_keeps_previous_buffers() {
        let mut backend = SoftwareBackend::with_max_dimension(32);
        let mut canvas = CanvasBuffers::new();
        canvas.resize(&mut backend, 8, 8).unwrap();
        assert!(canvas.resize(&mut backend, 64, 8).is_err());
        assert_eq!(canvas.size(), (8, 8));
        assert!(canvas.front().is_some());
    }

    #[test]
    fn clear_flips_to_a_transparent_buffer() {
        let mut backend = SoftwareBackend::new();
        let mut canvas = CanvasBuffers::new();
        canvas.resize(&mut backend, 4, 4).unwrap();
        let red = fill(&mut backend, 200);
        canvas.swap_front(red).unwrap();

        canvas.clear(&mut backend).unwrap();
        assert_eq!(canvas.front().unwrap().pixels(), &[0u8; 64][..]);
    }

    #[test]
    fn swap_front_rejects_other_sizes() {
        let mut backend = SoftwareBackend::new();
        let mut canvas = CanvasBuffers::new();
        canvas.resize(&mut backend, 4, 4).unwrap();

        let wrong = backend.create_render_target(2, 2).unwrap();
        assert!(canvas.swap_front(wrong).is_err());

        let entry = fill(&mut backend, 7);
        let old = canvas.swap_front(entry).unwrap();
        assert_eq!(old.pixels(), &[0u8; 64][..]);
        assert_eq!(canvas.front().unwrap().pixels(), &[7u8; 64][..]);
    }

    #[test]
    fn canvas_without_buffers_ignores_passes() {
        let mut backend = SoftwareBackend::new();
        let mut canvas: CanvasBuffers<crate::graphics::SoftwareTexture> = CanvasBuffers::new();
        assert!(canvas.clear(&mut backend).is_ok());
        assert!(canvas.front().is_none());
    }
}
