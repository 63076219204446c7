use drawsource::{
    Color, DrawSource, GraphicsBackend, Modifiers, MouseButton, MouseEvent, SettingsMap,
};
use serde_json::{json, Value};

use crate::expectations::PixelExpectation;

// ── Tile layout ──────────────────────────────────────────────────────────────

const TILE_SIZE: u32 = 80;
const COLUMNS: u32 = 3;
const ROWS: u32 = 2;

pub const CANVAS_WIDTH: u32 = TILE_SIZE * COLUMNS;
pub const CANVAS_HEIGHT: u32 = TILE_SIZE * ROWS;

/// Undo entries the main scene creates.
pub const MAIN_SCENE_UNDO_STEPS: usize = 8;

const RED: Color = Color([255, 0, 0, 255]);
const GREEN: Color = Color([0, 255, 0, 255]);
const BLUE: Color = Color([0, 0, 255, 255]);
const YELLOW: Color = Color([255, 255, 0, 255]);
const MAGENTA: Color = Color([255, 0, 255, 255]);

/// Returns the pixel origin (top-left corner) of tile number `n` (1-based).
fn tile_origin(tile_number: u32) -> (f32, f32) {
    let index = tile_number - 1;
    let column = index % COLUMNS;
    let row = index / COLUMNS;
    ((column * TILE_SIZE) as f32, (row * TILE_SIZE) as f32)
}

fn at(origin: (f32, f32), x: f32, y: f32) -> (f32, f32) {
    (origin.0 + x, origin.1 + y)
}

fn pixel(origin: (f32, f32), x: u32, y: u32) -> (u32, u32) {
    (origin.0 as u32 + x, origin.1 as u32 + y)
}

fn object(value: Value) -> SettingsMap {
    match value {
        Value::Object(map) => map,
        _ => SettingsMap::new(),
    }
}

/// Settings for a source the main scene can be drawn on: a canvas of the
/// scene's size, enough history to undo every tile, no cursor.
pub fn scene_settings() -> SettingsMap {
    object(json!({
        "width": CANVAS_WIDTH,
        "height": CANVAS_HEIGHT,
        "max_undo": 20,
        "show_cursor": false,
    }))
}

fn select_tool<B: GraphicsBackend>(source: &mut DrawSource<B>, settings: Value) {
    source.update(&object(settings));
}

/// Press, optional intermediate moves, release. The modifiers apply to every
/// event.
fn drag<B: GraphicsBackend>(
    source: &mut DrawSource<B>,
    points: &[(f32, f32)],
    modifiers: Modifiers,
) {
    let Some((&first, rest)) = points.split_first() else {
        return;
    };
    let event = |(x, y): (f32, f32)| MouseEvent::new(x, y).with_modifiers(modifiers);
    source.mouse_click(event(first), MouseButton::Left, false, 1);
    for &point in rest {
        source.mouse_move(event(point), false);
    }
    let last = rest.last().copied().unwrap_or(first);
    source.mouse_click(event(last), MouseButton::Left, true, 1);
}

/// Scripts every tile on `source` and returns the canvas pixels expected
/// afterwards. `source` must use [`scene_settings`] and start blank.
pub fn build_main_scene<B: GraphicsBackend>(source: &mut DrawSource<B>) -> Vec<PixelExpectation> {
    let mut expectations: Vec<PixelExpectation> = Vec::new();

    expectations.extend(tile_01_pencil_stroke(source));
    expectations.extend(tile_02_rect_fill(source));
    expectations.extend(tile_03_shift_line(source));
    expectations.extend(tile_04_eraser(source));
    expectations.extend(tile_05_selection_move(source));
    expectations.extend(tile_06_remote_ellipse(source));

    expectations
}

fn tile_01_pencil_stroke<B: GraphicsBackend>(source: &mut DrawSource<B>) -> Vec<PixelExpectation> {
    let origin = tile_origin(1);
    select_tool(
        source,
        json!({ "tool": 1, "tool_color": RED.to_packed(), "tool_alpha": 100.0, "tool_size": 6.0 }),
    );
    drag(
        source,
        &[at(origin, 10.0, 40.0), at(origin, 40.0, 40.0), at(origin, 70.0, 40.0)],
        Modifiers::default(),
    );

    let (x, y) = pixel(origin, 40, 40);
    let (ax, ay) = pixel(origin, 40, 50);
    let (bx, by) = pixel(origin, 5, 40);
    vec![
        PixelExpectation::color(x, y, RED, "pencil_stroke_center"),
        PixelExpectation::transparent(ax, ay, "pencil_stroke_below"),
        PixelExpectation::transparent(bx, by, "pencil_stroke_before_start"),
    ]
}

fn tile_02_rect_fill<B: GraphicsBackend>(source: &mut DrawSource<B>) -> Vec<PixelExpectation> {
    let origin = tile_origin(2);
    select_tool(source, json!({ "tool": 5, "tool_color": GREEN.to_packed() }));
    drag(
        source,
        &[at(origin, 10.0, 10.0), at(origin, 70.0, 50.0)],
        Modifiers::default(),
    );

    let (x, y) = pixel(origin, 40, 30);
    let (ax, ay) = pixel(origin, 75, 60);
    vec![
        PixelExpectation::color(x, y, GREEN, "rect_fill_inside"),
        PixelExpectation::transparent(ax, ay, "rect_fill_outside"),
    ]
}

fn tile_03_shift_line<B: GraphicsBackend>(source: &mut DrawSource<B>) -> Vec<PixelExpectation> {
    let origin = tile_origin(3);
    select_tool(
        source,
        json!({ "tool": 3, "tool_color": BLUE.to_packed(), "tool_size": 4.0 }),
    );
    let shift = Modifiers {
        shift: true,
        ..Modifiers::default()
    };
    drag(
        source,
        &[at(origin, 10.0, 20.0), at(origin, 70.0, 35.0)],
        shift,
    );

    let (x, y) = pixel(origin, 40, 20);
    // On the unconstrained diagonal, so it must stay empty.
    let (ax, ay) = pixel(origin, 40, 27);
    vec![
        PixelExpectation::color(x, y, BLUE, "shift_line_horizontal"),
        PixelExpectation::transparent(ax, ay, "shift_line_not_diagonal"),
    ]
}

fn tile_04_eraser<B: GraphicsBackend>(source: &mut DrawSource<B>) -> Vec<PixelExpectation> {
    let origin = tile_origin(4);
    select_tool(
        source,
        json!({ "tool": 5, "tool_color": RED.to_packed(), "tool_alpha": 100.0 }),
    );
    drag(
        source,
        &[at(origin, 10.0, 10.0), at(origin, 70.0, 70.0)],
        Modifiers::default(),
    );
    select_tool(
        source,
        json!({ "tool": 1, "tool_alpha": -100.0, "tool_size": 10.0 }),
    );
    drag(source, &[at(origin, 40.0, 40.0)], Modifiers::default());
    select_tool(source, json!({ "tool_alpha": 100.0 }));

    let (x, y) = pixel(origin, 40, 40);
    let (ax, ay) = pixel(origin, 15, 15);
    vec![
        PixelExpectation::transparent(x, y, "eraser_hole"),
        PixelExpectation::color(ax, ay, RED, "eraser_untouched"),
    ]
}

fn tile_05_selection_move<B: GraphicsBackend>(
    source: &mut DrawSource<B>,
) -> Vec<PixelExpectation> {
    let origin = tile_origin(5);
    select_tool(source, json!({ "tool": 5, "tool_color": YELLOW.to_packed() }));
    drag(
        source,
        &[at(origin, 10.0, 10.0), at(origin, 30.0, 30.0)],
        Modifiers::default(),
    );

    select_tool(source, json!({ "tool": 8 }));
    drag(
        source,
        &[at(origin, 5.0, 5.0), at(origin, 35.0, 35.0)],
        Modifiers::default(),
    );
    drag(
        source,
        &[at(origin, 20.0, 20.0), at(origin, 50.0, 50.0)],
        Modifiers::default(),
    );

    let (x, y) = pixel(origin, 20, 20);
    let (ax, ay) = pixel(origin, 50, 50);
    let (bx, by) = pixel(origin, 58, 58);
    vec![
        PixelExpectation::transparent(x, y, "selection_vacated"),
        PixelExpectation::color(ax, ay, YELLOW, "selection_moved"),
        PixelExpectation::color(bx, by, YELLOW, "selection_moved_far_corner"),
    ]
}

fn tile_06_remote_ellipse<B: GraphicsBackend>(
    source: &mut DrawSource<B>,
) -> Vec<PixelExpectation> {
    let origin = tile_origin(6);
    let (from_x, from_y) = at(origin, 10.0, 10.0);
    let (to_x, to_y) = at(origin, 70.0, 70.0);
    let payload = object(json!({
        "tool": 7,
        "tool_color": MAGENTA.to_packed(),
        "from_x": from_x,
        "from_y": from_y,
        "to_x": to_x,
        "to_y": to_y,
    }));
    if let Err(error) = source.call("draw", &payload) {
        panic!("remote draw failed: {error}");
    }

    let (x, y) = pixel(origin, 40, 40);
    let (ax, ay) = pixel(origin, 12, 12);
    vec![
        PixelExpectation::color(x, y, MAGENTA, "remote_ellipse_center"),
        PixelExpectation::transparent(ax, ay, "remote_ellipse_corner"),
    ]
}
