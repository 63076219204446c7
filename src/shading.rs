//! Per-pixel rules of the tool pass.
//!
//! This is the reference the software backend executes directly and
//! `graphics/draw.wgsl` mirrors line for line. Colors are straight
//! (non-premultiplied) RGBA in `0.0..=1.0`. Pixel `(x, y)` is evaluated at its
//! center `(x + 0.5, y + 0.5)`; textures are fetched with nearest addressing.

use crate::effect::{CursorDraw, PassKind, PassParams};
use crate::interaction::{GesturePhase, Point, Selection, Stroke};
use crate::tool::ToolKind;

/// Output alpha at or below this is written as transparent black.
const ALPHA_EPSILON: f32 = 0.5 / 255.0;

const TRANSPARENT: [f32; 4] = [0.0; 4];
const DASH_BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const DASH_WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Borrowed straight-alpha RGBA8 pixels.
#[derive(Debug, Clone, Copy)]
pub struct Raster<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

impl<'a> Raster<'a> {
    pub fn new(width: u32, height: u32, pixels: &'a [u8]) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Texel fetch; anything outside the raster reads as transparent.
    pub fn load(&self, x: i64, y: i64) -> [f32; 4] {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return TRANSPARENT;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        match self.pixels.get(offset..offset + 4) {
            Some(texel) => [
                texel[0] as f32 / 255.0,
                texel[1] as f32 / 255.0,
                texel[2] as f32 / 255.0,
                texel[3] as f32 / 255.0,
            ],
            None => TRANSPARENT,
        }
    }
}

/// Textures visible to one pass.
#[derive(Debug, Clone, Copy)]
pub struct PassInputs<'a> {
    pub source: Raster<'a>,
    pub tool_image: Option<Raster<'a>>,
    pub cursor_image: Option<Raster<'a>>,
}

pub fn shade_pixel(x: u32, y: u32, params: &PassParams, inputs: &PassInputs<'_>) -> [f32; 4] {
    let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
    let dst = inputs.source.load(x as i64, y as i64);
    match params.kind {
        PassKind::Commit => commit_pixel(center, dst, params, inputs),
        PassKind::Present => present_pixel(center, dst, params, inputs),
    }
}

/// Shades one output row into `row` (RGBA8, `width * 4` bytes).
pub fn shade_row(y: u32, row: &mut [u8], params: &PassParams, inputs: &PassInputs<'_>) {
    for (x, out) in row.chunks_exact_mut(4).enumerate() {
        let shaded = shade_pixel(x as u32, y, params, inputs);
        for (channel, value) in out.iter_mut().zip(shaded) {
            *channel = (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        }
    }
}

fn commit_pixel(p: Point, dst: [f32; 4], params: &PassParams, inputs: &PassInputs<'_>) -> [f32; 4] {
    let stroke = &params.stroke;
    let opacity = params.color[3].abs().min(1.0);
    let erase = params.color[3] < 0.0;
    let rgb = [params.color[0], params.color[1], params.color[2]];
    let radius = params.size * 0.5;

    match params.tool {
        ToolKind::None => dst,
        ToolKind::Pencil => {
            if stroke_distance(p, stroke) <= radius {
                paint(dst, rgb, opacity, erase)
            } else {
                dst
            }
        }
        ToolKind::Brush => {
            let combined = brush_opacity(stroke_distance(p, stroke), params.size, opacity);
            if combined > 0.0 {
                paint(dst, rgb, combined, erase)
            } else {
                dst
            }
        }
        ToolKind::Line => {
            let end = constrain(params.tool, stroke.from, stroke.to, stroke.shift);
            if segment_distance(p, stroke.from, end) <= radius {
                paint(dst, rgb, opacity, erase)
            } else {
                dst
            }
        }
        ToolKind::RectOutline
        | ToolKind::RectFill
        | ToolKind::EllipseOutline
        | ToolKind::EllipseFill => {
            let end = constrain(params.tool, stroke.from, stroke.to, stroke.shift);
            if shape_covers(params.tool, p, stroke.from, end, radius) {
                paint(dst, rgb, opacity, erase)
            } else {
                dst
            }
        }
        ToolKind::SelectRect | ToolKind::SelectEllipse => {
            if stroke.phase == GesturePhase::Dragging {
                move_selection(p, dst, params.tool, stroke, &inputs.source)
            } else {
                dst
            }
        }
        ToolKind::Stamp => match &inputs.tool_image {
            Some(image) => stamp(p, dst, stroke.to, image, opacity, erase),
            None => dst,
        },
        ToolKind::Image => match &inputs.tool_image {
            Some(image) => {
                let end = constrain(params.tool, stroke.from, stroke.to, stroke.shift);
                stretch_image(p, dst, stroke.from, end, image, opacity, erase)
            }
            None => dst,
        },
    }
}

fn present_pixel(p: Point, dst: [f32; 4], params: &PassParams, inputs: &PassInputs<'_>) -> [f32; 4] {
    let stroke = &params.stroke;
    let tool = params.tool;
    let mut out = dst;

    if stroke.phase == GesturePhase::Down && tool.commits_on_release() {
        out = commit_pixel(p, out, params, inputs);
    }

    if tool.is_selection() {
        let marquee = match stroke.phase {
            GesturePhase::Up => stroke.selection,
            GesturePhase::Down => Selection::new(stroke.from, stroke.to),
            GesturePhase::Dragging => {
                out = move_selection(p, out, tool, stroke, &inputs.source);
                let (dx, dy) = rounded_delta(stroke);
                stroke.selection.translated(dx, dy)
            }
        };
        if on_marquee(tool, &marquee, p) {
            out = dash_color(p);
        }
    }

    match params.cursor.mode {
        CursorDraw::Hidden => {}
        CursorDraw::Circle => {
            if distance(p, stroke.to) <= params.cursor.size * 0.5 {
                out = over(out, params.cursor.color.normalize());
            }
        }
        CursorDraw::Image => {
            if let Some(image) = &inputs.cursor_image {
                out = stamp(p, out, stroke.to, image, 1.0, false);
            }
        }
    }
    out
}

/// Straight-alpha source-over.
pub fn over(dst: [f32; 4], src: [f32; 4]) -> [f32; 4] {
    let sa = src[3];
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3];
    let out_a = sa + da * (1.0 - sa);
    if out_a <= ALPHA_EPSILON {
        return TRANSPARENT;
    }
    let blend = |s: f32, d: f32| (s * sa + d * da * (1.0 - sa)) / out_a;
    [
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        out_a,
    ]
}

/// Removes `amount` of the destination's coverage, keeping its color.
pub fn erase(dst: [f32; 4], amount: f32) -> [f32; 4] {
    let out_a = dst[3] * (1.0 - amount.clamp(0.0, 1.0));
    if out_a <= ALPHA_EPSILON {
        TRANSPARENT
    } else {
        [dst[0], dst[1], dst[2], out_a]
    }
}

fn paint(dst: [f32; 4], rgb: [f32; 3], opacity: f32, erasing: bool) -> [f32; 4] {
    if erasing {
        erase(dst, opacity)
    } else {
        over(dst, [rgb[0], rgb[1], rgb[2], opacity])
    }
}

/// Combined opacity of `ceil(size)` concentric strokes of widths
/// `size, size - 1, ...`, each carrying `opacity / n`.
pub fn brush_opacity(distance: f32, size: f32, opacity: f32) -> f32 {
    let strokes = size.ceil().max(1.0);
    let reach = size - 2.0 * distance;
    if reach < 0.0 {
        return 0.0;
    }
    let covering = (reach.floor() + 1.0).min(strokes);
    1.0 - (1.0 - opacity / strokes).powf(covering)
}

/// Applies the Shift constraint of a tool to the stroke end point.
pub fn constrain(tool: ToolKind, from: Point, to: Point, shift: bool) -> Point {
    if !shift {
        return to;
    }
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    match tool {
        ToolKind::Line => {
            if dx.abs() >= dy.abs() {
                Point::new(to.x, from.y)
            } else {
                Point::new(from.x, to.y)
            }
        }
        ToolKind::RectOutline
        | ToolKind::RectFill
        | ToolKind::EllipseOutline
        | ToolKind::EllipseFill
        | ToolKind::Image => {
            let side = dx.abs().max(dy.abs());
            Point::new(from.x + side * sign(dx), from.y + side * sign(dy))
        }
        _ => to,
    }
}

fn sign(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

fn distance(a: Point, b: Point) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

pub fn segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let length_sq = abx * abx + aby * aby;
    if length_sq <= f32::EPSILON {
        return distance(p, a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / length_sq).clamp(0.0, 1.0);
    distance(p, Point::new(a.x + abx * t, a.y + aby * t))
}

/// Distance to a paint-on-move stroke: a dot when there is no previous point.
fn stroke_distance(p: Point, stroke: &Stroke) -> f32 {
    if stroke.from.is_valid() {
        segment_distance(p, stroke.from, stroke.to)
    } else {
        distance(p, stroke.to)
    }
}

fn bounds(a: Point, b: Point) -> (Point, Point) {
    Selection::new(a, b).bounds()
}

fn inside_rect(p: Point, min: Point, max: Point) -> bool {
    p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
}

fn inside_ellipse(p: Point, center: Point, rx: f32, ry: f32) -> bool {
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let nx = (p.x - center.x) / rx;
    let ny = (p.y - center.y) / ry;
    nx * nx + ny * ny <= 1.0
}

fn shape_covers(tool: ToolKind, p: Point, from: Point, to: Point, radius: f32) -> bool {
    let (min, max) = bounds(from, to);
    match tool {
        ToolKind::RectFill => inside_rect(p, min, max),
        ToolKind::RectOutline => {
            let outer = inside_rect(p, min.offset(-radius, -radius), max.offset(radius, radius));
            let inner = p.x > min.x + radius
                && p.x < max.x - radius
                && p.y > min.y + radius
                && p.y < max.y - radius;
            outer && !inner
        }
        ToolKind::EllipseFill | ToolKind::EllipseOutline => {
            let center = Point::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5);
            let rx = (max.x - min.x) * 0.5;
            let ry = (max.y - min.y) * 0.5;
            if tool == ToolKind::EllipseFill {
                inside_ellipse(p, center, rx, ry)
            } else {
                inside_ellipse(p, center, rx + radius, ry + radius)
                    && !inside_ellipse(p, center, rx - radius, ry - radius)
            }
        }
        _ => false,
    }
}

fn in_selection(tool: ToolKind, selection: &Selection, p: Point) -> bool {
    if selection.is_empty() {
        return false;
    }
    let (min, max) = selection.bounds();
    if tool == ToolKind::SelectEllipse {
        let center = Point::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5);
        inside_ellipse(p, center, (max.x - min.x) * 0.5, (max.y - min.y) * 0.5)
    } else {
        inside_rect(p, min, max)
    }
}

fn rounded_delta(stroke: &Stroke) -> (f32, f32) {
    let (dx, dy) = stroke.delta();
    (dx.round(), dy.round())
}

/// Moves the selected pixels by the stroke delta, leaving the vacated area
/// transparent.
fn move_selection(
    p: Point,
    dst: [f32; 4],
    tool: ToolKind,
    stroke: &Stroke,
    source: &Raster<'_>,
) -> [f32; 4] {
    let (dx, dy) = rounded_delta(stroke);
    let mut out = dst;
    if in_selection(tool, &stroke.selection, p) {
        out = TRANSPARENT;
    }
    let origin = p.offset(-dx, -dy);
    if in_selection(tool, &stroke.selection, origin) {
        let moved = source.load(origin.x.floor() as i64, origin.y.floor() as i64);
        out = over(out, moved);
    }
    out
}

fn on_marquee(tool: ToolKind, selection: &Selection, p: Point) -> bool {
    if selection.is_empty() {
        return false;
    }
    let (min, max) = selection.bounds();
    if tool == ToolKind::SelectEllipse {
        let center = Point::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5);
        let rx = (max.x - min.x) * 0.5;
        let ry = (max.y - min.y) * 0.5;
        inside_ellipse(p, center, rx + 1.0, ry + 1.0) && !inside_ellipse(p, center, rx, ry)
    } else {
        let outer = inside_rect(p, min.offset(-1.0, -1.0), max.offset(1.0, 1.0));
        let inner = p.x > min.x && p.x < max.x && p.y > min.y && p.y < max.y;
        outer && !inner
    }
}

fn dash_color(p: Point) -> [f32; 4] {
    let phase = (p.x.floor() as i64 + p.y.floor() as i64).div_euclid(4);
    if phase % 2 == 0 {
        DASH_BLACK
    } else {
        DASH_WHITE
    }
}

fn apply_texel(dst: [f32; 4], texel: [f32; 4], opacity: f32, erasing: bool) -> [f32; 4] {
    if erasing {
        erase(dst, texel[3] * opacity)
    } else {
        over(dst, [texel[0], texel[1], texel[2], texel[3] * opacity])
    }
}

/// Draws `image` at native size, centered on `center`.
fn stamp(
    p: Point,
    dst: [f32; 4],
    center: Point,
    image: &Raster<'_>,
    opacity: f32,
    erasing: bool,
) -> [f32; 4] {
    let left = center.x - (image.width / 2) as f32;
    let top = center.y - (image.height / 2) as f32;
    let tx = (p.x - left).floor();
    let ty = (p.y - top).floor();
    if tx < 0.0 || ty < 0.0 || tx >= image.width as f32 || ty >= image.height as f32 {
        return dst;
    }
    apply_texel(dst, image.load(tx as i64, ty as i64), opacity, erasing)
}

/// Draws `image` stretched over the rectangle spanned by `from` and `to`.
fn stretch_image(
    p: Point,
    dst: [f32; 4],
    from: Point,
    to: Point,
    image: &Raster<'_>,
    opacity: f32,
    erasing: bool,
) -> [f32; 4] {
    let (min, max) = bounds(from, to);
    let width = max.x - min.x;
    let height = max.y - min.y;
    if width <= 0.0 || height <= 0.0 || p.x < min.x || p.y < min.y || p.x >= max.x || p.y >= max.y
    {
        return dst;
    }
    let tx = ((p.x - min.x) / width * image.width as f32).floor();
    let ty = ((p.y - min.y) / height * image.height as f32).floor();
    let tx = tx.min(image.width.saturating_sub(1) as f32);
    let ty = ty.min(image.height.saturating_sub(1) as f32);
    apply_texel(dst, image.load(tx as i64, ty as i64), opacity, erasing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::effect::CursorParams;
    use crate::tool::ToolState;

    const SIZE: u32 = 16;

    fn blank() -> Vec<u8> {
        vec![0; (SIZE * SIZE * 4) as usize]
    }

    fn run(params: &PassParams, source: &[u8], tool_image: Option<Raster<'_>>) -> Vec<u8> {
        let inputs = PassInputs {
            source: Raster::new(SIZE, SIZE, source),
            tool_image,
            cursor_image: None,
        };
        let mut out = vec![0; source.len()];
        for (y, row) in out.chunks_exact_mut((SIZE * 4) as usize).enumerate() {
            shade_row(y as u32, row, params, &inputs);
        }
        out
    }

    fn pixel(buffer: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * SIZE + x) * 4) as usize;
        [
            buffer[offset],
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
        ]
    }

    fn tool(kind: ToolKind, size: f32, alpha: f32) -> ToolState {
        ToolState {
            kind,
            color: Color::rgb(255, 0, 0),
            alpha,
            size,
        }
    }

    #[test]
    fn over_keeps_destination_for_transparent_source() {
        let dst = [0.2, 0.4, 0.6, 0.8];
        assert_eq!(over(dst, [1.0, 1.0, 1.0, 0.0]), dst);
        assert_eq!(over(TRANSPARENT, [1.0, 0.0, 0.0, 1.0]), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn brush_is_strongest_at_the_center() {
        let center = brush_opacity(0.0, 6.0, 1.0);
        let edge = brush_opacity(2.9, 6.0, 1.0);
        assert!(center > edge);
        assert_eq!(brush_opacity(3.5, 6.0, 1.0), 0.0);
        assert!((brush_opacity(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pencil_dot_without_previous_point() {
        let stroke = Stroke::new(Point::INVALID, Point::new(8.0, 8.0));
        let params = PassParams::commit(&tool(ToolKind::Pencil, 4.0, 100.0), stroke, (SIZE, SIZE));
        let out = run(&params, &blank(), None);
        assert_eq!(pixel(&out, 8, 8), [255, 0, 0, 255]);
        assert_eq!(pixel(&out, 7, 7), [255, 0, 0, 255]);
        assert_eq!(pixel(&out, 12, 8), [0, 0, 0, 0]);
        assert_eq!(pixel(&out, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn pencil_segment_from_beyond_the_left_edge() {
        let stroke = Stroke::new(Point::new(-3.0, 8.0), Point::new(5.0, 8.0));
        assert!(stroke.from.is_valid());
        let params = PassParams::commit(&tool(ToolKind::Pencil, 2.0, 100.0), stroke, (SIZE, SIZE));
        let out = run(&params, &blank(), None);
        assert_eq!(pixel(&out, 0, 7)[3], 255);
        assert_eq!(pixel(&out, 2, 7)[3], 255);
        assert_eq!(pixel(&out, 8, 7)[3], 0);
    }

    #[test]
    fn eraser_clears_covered_pixels() {
        let source = vec![255; (SIZE * SIZE * 4) as usize];
        let stroke = Stroke::new(Point::new(2.0, 8.0), Point::new(14.0, 8.0));
        let params = PassParams::commit(&tool(ToolKind::Pencil, 2.0, -100.0), stroke, (SIZE, SIZE));
        let out = run(&params, &source, None);
        assert_eq!(pixel(&out, 8, 7), [0, 0, 0, 0]);
        assert_eq!(pixel(&out, 8, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn shift_locks_line_to_dominant_axis() {
        let mut stroke = Stroke::new(Point::new(2.0, 2.0), Point::new(14.0, 5.0));
        stroke.shift = true;
        assert_eq!(
            constrain(ToolKind::Line, stroke.from, stroke.to, true),
            Point::new(14.0, 2.0)
        );
        let params = PassParams::commit(&tool(ToolKind::Line, 2.0, 100.0), stroke, (SIZE, SIZE));
        let out = run(&params, &blank(), None);
        assert_eq!(pixel(&out, 12, 2)[3], 255);
        assert_eq!(pixel(&out, 12, 4)[3], 0);
    }

    #[test]
    fn shift_makes_rectangles_square() {
        assert_eq!(
            constrain(ToolKind::RectFill, Point::new(10.0, 10.0), Point::new(4.0, 12.0), true),
            Point::new(4.0, 16.0)
        );
    }

    #[test]
    fn rect_outline_leaves_the_inside_untouched() {
        let stroke = Stroke::new(Point::new(2.0, 2.0), Point::new(14.0, 14.0));
        let params = PassParams::commit(
            &tool(ToolKind::RectOutline, 2.0, 100.0),
            stroke,
            (SIZE, SIZE),
        );
        let out = run(&params, &blank(), None);
        assert_eq!(pixel(&out, 2, 8)[3], 255);
        assert_eq!(pixel(&out, 8, 8)[3], 0);
    }

    #[test]
    fn dragging_selection_moves_pixels() {
        let mut source = blank();
        let offset = ((4 * SIZE + 4) * 4) as usize;
        source[offset..offset + 4].copy_from_slice(&[0, 255, 0, 255]);

        let mut stroke = Stroke::new(Point::new(5.0, 5.0), Point::new(8.0, 7.0));
        stroke.phase = GesturePhase::Dragging;
        stroke.selection = Selection::new(Point::new(2.0, 2.0), Point::new(6.0, 6.0));
        let params = PassParams::commit(&tool(ToolKind::SelectRect, 1.0, 100.0), stroke, (SIZE, SIZE));
        let out = run(&params, &source, None);

        assert_eq!(pixel(&out, 4, 4), [0, 0, 0, 0]);
        assert_eq!(pixel(&out, 7, 6), [0, 255, 0, 255]);
    }

    #[test]
    fn stamp_is_centered_on_the_pointer() {
        let image = vec![255, 255, 0, 255].repeat(4);
        let raster = Raster::new(2, 2, &image);
        let stroke = Stroke::new(Point::new(8.0, 8.0), Point::new(8.0, 8.0));
        let params = PassParams::commit(&tool(ToolKind::Stamp, 1.0, 100.0), stroke, (SIZE, SIZE));
        let out = run(&params, &blank(), Some(raster));
        assert_eq!(pixel(&out, 7, 7), [255, 255, 0, 255]);
        assert_eq!(pixel(&out, 8, 8), [255, 255, 0, 255]);
        assert_eq!(pixel(&out, 9, 9), [0, 0, 0, 0]);
    }

    #[test]
    fn present_draws_cursor_and_marquee_without_touching_source() {
        let mut stroke = Stroke::new(Point::new(0.0, 0.0), Point::new(12.0, 12.0));
        stroke.phase = GesturePhase::Up;
        stroke.selection = Selection::new(Point::new(2.0, 2.0), Point::new(6.0, 6.0));
        let cursor = CursorParams {
            mode: CursorDraw::Circle,
            color: Color::rgb(0, 0, 255),
            size: 2.0,
        };
        let params = PassParams::present(
            &tool(ToolKind::SelectRect, 1.0, 100.0),
            stroke,
            cursor,
            (SIZE, SIZE),
        );
        let source = blank();
        let out = run(&params, &source, None);
        assert_eq!(pixel(&out, 12, 12), [0, 0, 255, 255]);
        assert_eq!(pixel(&out, 1, 1)[3], 255);
        assert_eq!(pixel(&out, 4, 4), [0, 0, 0, 0]);
    }
}
