//! Parameters of the full-canvas tool pass.
//!
//! Every pass reads one source texture and writes every pixel of a distinct
//! target. What it draws is decided by [`PassParams`]: a commit pass paints a
//! stroke into the canvas, a present pass composes previews, the selection
//! marquee and the cursor over the front buffer for display.
//!
//! [`ToolUniforms`] is the GPU-side encoding of the same parameters. Its
//! layout is shared with `graphics/draw.wgsl` and must stay 128 bytes.

use crate::color::Color;
use crate::interaction::{GesturePhase, Stroke};
use crate::tool::{ToolKind, ToolState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PassKind {
    /// Writes a stroke into the back buffer.
    Commit = 0,
    /// Composes the displayed frame. Never feeds back into the canvas.
    Present = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum CursorDraw {
    #[default]
    Hidden = 0,
    Circle = 1,
    Image = 2,
}

/// Cursor overlay for a present pass. It is drawn at the stroke's `to`
/// position, which is the pointer position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorParams {
    pub mode: CursorDraw,
    pub color: Color,
    /// Circle diameter in pixels.
    pub size: f32,
}

impl Default for CursorParams {
    fn default() -> Self {
        Self {
            mode: CursorDraw::Hidden,
            color: Color::from_packed(0xFFFFFF00),
            size: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassParams {
    pub kind: PassKind,
    pub canvas_size: (u32, u32),
    pub tool: ToolKind,
    /// Normalized RGB with the signed opacity in the last lane.
    pub color: [f32; 4],
    /// Effective diameter, pressure already applied.
    pub size: f32,
    pub stroke: Stroke,
    pub cursor: CursorParams,
}

impl PassParams {
    pub fn commit(tool: &ToolState, stroke: Stroke, canvas_size: (u32, u32)) -> Self {
        let size = if tool.kind.paints_on_move() {
            tool.size * stroke.pressure.max(0.0)
        } else {
            tool.size
        };
        Self {
            kind: PassKind::Commit,
            canvas_size,
            tool: tool.kind,
            color: tool.signed_color(),
            size: size.max(0.0),
            stroke,
            cursor: CursorParams::default(),
        }
    }

    pub fn present(
        tool: &ToolState,
        stroke: Stroke,
        cursor: CursorParams,
        canvas_size: (u32, u32),
    ) -> Self {
        Self {
            kind: PassKind::Present,
            cursor,
            ..Self::commit(tool, stroke, canvas_size)
        }
    }

    /// Encodes the parameters for the GPU pass. Image sizes are `(0, 0)` when
    /// the corresponding texture is absent.
    pub fn uniforms(
        &self,
        tool_image_size: (u32, u32),
        cursor_image_size: (u32, u32),
    ) -> ToolUniforms {
        ToolUniforms {
            tool_color: self.color,
            cursor_color: self.cursor.color.normalize(),
            canvas_size: [self.canvas_size.0 as f32, self.canvas_size.1 as f32],
            mouse: self.stroke.to.to_array(),
            mouse_previous: self.stroke.from.to_array(),
            select_from: self.stroke.selection.from.to_array(),
            select_to: self.stroke.selection.to.to_array(),
            tool_image_size: [tool_image_size.0 as f32, tool_image_size.1 as f32],
            cursor_image_size: [cursor_image_size.0 as f32, cursor_image_size.1 as f32],
            tool_size: self.size,
            cursor_size: self.cursor.size,
            tool: self.tool.id(),
            tool_mode: self.stroke.phase as u32,
            draw_cursor: self.cursor.mode as u32,
            shift_down: u32::from(self.stroke.shift),
            pass_kind: self.kind as u32,
            _padding: [0; 3],
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.stroke.phase
    }
}

/// One pass invocation: the source texture, its parameters and the optional
/// images it may sample.
pub struct EffectPass<'a, T> {
    pub source: &'a T,
    pub params: PassParams,
    pub tool_image: Option<&'a T>,
    pub cursor_image: Option<&'a T>,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ToolUniforms {
    pub tool_color: [f32; 4],
    pub cursor_color: [f32; 4],
    pub canvas_size: [f32; 2],
    pub mouse: [f32; 2],
    pub mouse_previous: [f32; 2],
    pub select_from: [f32; 2],
    pub select_to: [f32; 2],
    pub tool_image_size: [f32; 2],
    pub cursor_image_size: [f32; 2],
    pub tool_size: f32,
    pub cursor_size: f32,
    pub tool: u32,
    pub tool_mode: u32,
    pub draw_cursor: u32,
    pub shift_down: u32,
    pub pass_kind: u32,
    pub _padding: [u32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{Point, Selection};

    #[test]
    fn uniform_block_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<ToolUniforms>(), 128);
        assert_eq!(std::mem::offset_of!(ToolUniforms, tool_size), 88);
        assert_eq!(std::mem::offset_of!(ToolUniforms, pass_kind), 112);
    }

    #[test]
    fn pressure_scales_only_paint_on_move_tools() {
        let mut stroke = Stroke::new(Point::new(1.0, 1.0), Point::new(2.0, 2.0));
        stroke.pressure = 0.5;

        let pencil = ToolState {
            kind: ToolKind::Pencil,
            size: 8.0,
            ..ToolState::default()
        };
        assert_eq!(PassParams::commit(&pencil, stroke, (10, 10)).size, 4.0);

        let line = ToolState {
            kind: ToolKind::Line,
            ..pencil
        };
        assert_eq!(PassParams::commit(&line, stroke, (10, 10)).size, 8.0);
    }

    #[test]
    fn uniforms_carry_stroke_geometry() {
        let tool = ToolState {
            kind: ToolKind::SelectRect,
            ..ToolState::default()
        };
        let mut stroke = Stroke::new(Point::new(3.0, 4.0), Point::new(5.0, 6.0));
        stroke.phase = GesturePhase::Dragging;
        stroke.shift = true;
        stroke.selection = Selection::new(Point::new(1.0, 1.0), Point::new(9.0, 9.0));

        let uniforms = PassParams::commit(&tool, stroke, (64, 32)).uniforms((0, 0), (7, 7));
        assert_eq!(uniforms.canvas_size, [64.0, 32.0]);
        assert_eq!(uniforms.mouse_previous, [3.0, 4.0]);
        assert_eq!(uniforms.mouse, [5.0, 6.0]);
        assert_eq!(uniforms.select_to, [9.0, 9.0]);
        assert_eq!(uniforms.tool, 8);
        assert_eq!(uniforms.tool_mode, 2);
        assert_eq!(uniforms.shift_down, 1);
        assert_eq!(uniforms.cursor_image_size, [7.0, 7.0]);
    }
}
