use rayon::prelude::*;

use super::{validate_target_size, validate_upload, GraphicsBackend, TextureHandle};
use crate::effect::EffectPass;
use crate::error::{DrawError, DrawResult};
use crate::shading::{shade_row, PassInputs, Raster};

/// Default limit, matching the common 16k GPU texture limit.
pub const DEFAULT_MAX_DIMENSION: u32 = 16384;

/// A CPU texture: tightly packed straight-alpha RGBA8 rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SoftwareTexture {
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn raster(&self) -> Raster<'_> {
        Raster::new(self.width, self.height, &self.pixels)
    }
}

impl TextureHandle for SoftwareTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Reference backend that runs the tool pass on the CPU, one row per rayon
/// task. Its output is deterministic, which makes it the backend of choice
/// for tests and headless hosts without an adapter.
#[derive(Debug, Clone)]
pub struct SoftwareBackend {
    max_dimension: u32,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl GraphicsBackend for SoftwareBackend {
    type Texture = SoftwareTexture;

    fn max_texture_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> DrawResult<SoftwareTexture> {
        validate_target_size(width, height, self.max_dimension)?;
        Ok(SoftwareTexture {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        })
    }

    fn upload_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> DrawResult<SoftwareTexture> {
        validate_target_size(width, height, self.max_dimension)?;
        validate_upload(width, height, rgba)?;
        Ok(SoftwareTexture {
            width,
            height,
            pixels: rgba.to_vec(),
        })
    }

    fn update_texture(&mut self, texture: &mut SoftwareTexture, rgba: &[u8]) -> DrawResult<()> {
        validate_upload(texture.width, texture.height, rgba)?;
        texture.pixels.copy_from_slice(rgba);
        Ok(())
    }

    fn clear(&mut self, target: &mut SoftwareTexture) -> DrawResult<()> {
        target.pixels.fill(0);
        Ok(())
    }

    fn copy_texture(&mut self, source: &SoftwareTexture) -> DrawResult<SoftwareTexture> {
        Ok(source.clone())
    }

    fn draw_pass(
        &mut self,
        pass: &EffectPass<'_, SoftwareTexture>,
        target: &mut SoftwareTexture,
    ) -> DrawResult<()> {
        if pass.source.size() != target.size() {
            return Err(DrawError::Pass(format!(
                "source is {}x{} but target is {}x{}",
                pass.source.width, pass.source.height, target.width, target.height
            )));
        }

        let inputs = PassInputs {
            source: pass.source.raster(),
            tool_image: pass.tool_image.map(SoftwareTexture::raster),
            cursor_image: pass.cursor_image.map(SoftwareTexture::raster),
        };
        let params = pass.params;
        let row_bytes = target.width as usize * 4;

        target
            .pixels
            .par_chunks_exact_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| shade_row(y as u32, row, &params, &inputs));
        Ok(())
    }

    fn read_pixels(&mut self, texture: &SoftwareTexture) -> DrawResult<Vec<u8>> {
        Ok(texture.pixels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::PassParams;
    use crate::interaction::{Point, Stroke};
    use crate::tool::{ToolKind, ToolState};

    #[test]
    fn rejects_zero_and_oversized_targets() {
        let mut backend = SoftwareBackend::with_max_dimension(64);
        assert!(backend.create_render_target(0, 10).is_err());
        assert!(backend.create_render_target(65, 10).is_err());
        let target = backend.create_render_target(64, 1).unwrap();
        assert_eq!(target.pixels().len(), 256);
    }

    #[test]
    fn upload_checks_data_length() {
        let mut backend = SoftwareBackend::new();
        assert!(backend.upload_texture(2, 2, &[0; 15]).is_err());
        let mut texture = backend.upload_texture(2, 2, &[7; 16]).unwrap();
        backend.update_texture(&mut texture, &[9; 16]).unwrap();
        assert_eq!(backend.read_pixels(&texture).unwrap(), vec![9; 16]);
    }

    #[test]
    fn pass_with_no_tool_copies_the_source() {
        let mut backend = SoftwareBackend::new();
        let pattern: Vec<u8> = (0..8 * 8 * 4).map(|i| (i % 251) as u8).collect();
        let source = backend.upload_texture(8, 8, &pattern).unwrap();
        let mut target = backend.create_render_target(8, 8).unwrap();

        let params = PassParams::commit(
            &ToolState::default(),
            Stroke::new(Point::new(1.0, 1.0), Point::new(4.0, 4.0)),
            (8, 8),
        );
        backend
            .draw_pass(
                &EffectPass {
                    source: &source,
                    params,
                    tool_image: None,
                    cursor_image: None,
                },
                &mut target,
            )
            .unwrap();
        assert_eq!(target.pixels(), source.pixels());
    }

    #[test]
    fn mismatched_pass_sizes_fail() {
        let mut backend = SoftwareBackend::new();
        let source = backend.create_render_target(4, 4).unwrap();
        let mut target = backend.create_render_target(5, 4).unwrap();
        let tool = ToolState {
            kind: ToolKind::Pencil,
            ..ToolState::default()
        };
        let pass = EffectPass {
            source: &source,
            params: PassParams::commit(&tool, Stroke::new(Point::INVALID, Point::new(1.0, 1.0)), (4, 4)),
            tool_image: None,
            cursor_image: None,
        };
        assert!(matches!(
            backend.draw_pass(&pass, &mut target),
            Err(DrawError::Pass(_))
        ));
    }
}
