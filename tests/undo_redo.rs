/// History behavior of the draw source, driven through host callbacks.
///
/// Run with:   cargo test --test undo_redo
use drawsource::{
    DrawSource, Graphics, GesturePhase, MouseButton, MouseEvent, SettingsMap, SoftwareBackend,
};
use drawsource_test_scenes::{check_pixels, PixelExpectation};
use serde_json::{json, Value};

fn settings(value: Value) -> SettingsMap {
    match value {
        Value::Object(map) => map,
        _ => SettingsMap::new(),
    }
}

fn source(value: Value) -> DrawSource<SoftwareBackend> {
    DrawSource::new(Graphics::new(SoftwareBackend::new()), &settings(value))
}

fn press(source: &mut DrawSource<SoftwareBackend>, x: f32, y: f32) {
    source.mouse_click(MouseEvent::new(x, y), MouseButton::Left, false, 1);
}

fn release(source: &mut DrawSource<SoftwareBackend>, x: f32, y: f32) {
    source.mouse_click(MouseEvent::new(x, y), MouseButton::Left, true, 1);
}

fn stroke(source: &mut DrawSource<SoftwareBackend>, from: (f32, f32), to: (f32, f32)) {
    press(source, from.0, from.1);
    source.mouse_move(MouseEvent::new(to.0, to.1), false);
    release(source, to.0, to.1);
}

fn assert_pixels(source: &DrawSource<SoftwareBackend>, expectations: &[PixelExpectation]) {
    let pixels = source.canvas_pixels().unwrap();
    let failures = check_pixels(&pixels, source.width(), source.height(), expectations);
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

fn is_blank(source: &DrawSource<SoftwareBackend>) -> bool {
    source.canvas_pixels().unwrap().iter().all(|&byte| byte == 0)
}

#[test]
fn undoing_every_stroke_restores_the_original_raster() {
    let mut source = source(json!({ "tool": 1, "tool_size": 5.0, "max_undo": 5 }));
    stroke(&mut source, (5.0, 5.0), (60.0, 20.0));
    let reference = source.canvas_pixels().unwrap();

    for offset in 0..5 {
        let y = 40.0 + offset as f32 * 20.0;
        stroke(&mut source, (10.0, y), (150.0, y + 5.0));
    }
    assert_eq!(source.undo_depth(), 5);

    for _ in 0..5 {
        source.undo();
    }
    assert_eq!(source.canvas_pixels().unwrap(), reference);
}

#[test]
fn redo_after_undo_is_a_round_trip() {
    let mut source = source(json!({ "tool": 2, "tool_size": 8.0 }));
    stroke(&mut source, (20.0, 20.0), (120.0, 90.0));
    let painted = source.canvas_pixels().unwrap();

    source.undo();
    assert!(is_blank(&source));
    source.redo();
    assert_eq!(source.canvas_pixels().unwrap(), painted);
}

#[test]
fn new_stroke_after_undo_empties_redo() {
    let mut source = source(json!({ "tool": 1 }));
    stroke(&mut source, (10.0, 10.0), (20.0, 20.0));
    stroke(&mut source, (30.0, 30.0), (40.0, 40.0));
    source.undo();
    assert_eq!(source.redo_depth(), 1);

    stroke(&mut source, (50.0, 50.0), (60.0, 60.0));
    assert_eq!(source.redo_depth(), 0);
    source.redo();
    assert_eq!(source.undo_depth(), 2);
}

#[test]
fn undo_depth_never_exceeds_max_undo() {
    let mut source = source(json!({ "tool": 1, "max_undo": 3 }));
    for step in 0..10 {
        let x = 10.0 + step as f32 * 15.0;
        stroke(&mut source, (x, 10.0), (x, 50.0));
        assert!(source.undo_depth() <= 3);
    }
    assert_eq!(source.undo_depth(), 3);
}

#[test]
fn zero_max_undo_disables_history() {
    let mut source = source(json!({ "tool": 1, "max_undo": 0 }));
    stroke(&mut source, (10.0, 10.0), (50.0, 50.0));
    assert_eq!(source.undo_depth(), 0);
    source.undo();
    assert!(!is_blank(&source));
}

#[test]
fn lowering_max_undo_trims_history() {
    let mut source = source(json!({ "tool": 1, "max_undo": 5 }));
    for step in 0..4 {
        let x = 10.0 + step as f32 * 20.0;
        stroke(&mut source, (x, 10.0), (x, 40.0));
    }
    source.update(&settings(json!({ "max_undo": 2 })));
    assert_eq!(source.undo_depth(), 2);
}

#[test]
fn pencil_gesture_is_one_undo_entry() {
    let mut source = source(json!({ "tool": 1 }));
    press(&mut source, 10.0, 10.0);
    for step in 1..=10 {
        let p = 10.0 + step as f32 * 5.0;
        source.mouse_move(MouseEvent::new(p, p), false);
    }
    release(&mut source, 60.0, 60.0);
    assert_eq!(source.undo_depth(), 1);

    source.undo();
    assert!(is_blank(&source));
}

#[test]
fn line_paints_between_press_and_release() {
    let mut source = source(json!({ "tool": 3, "tool_size": 3.0 }));
    press(&mut source, 10.0, 10.0);
    source.mouse_move(MouseEvent::new(30.0, 30.0), false);
    assert!(is_blank(&source), "shapes only commit on release");
    release(&mut source, 50.0, 50.0);

    assert_eq!(source.undo_depth(), 1);
    assert_pixels(
        &source,
        &[
            PixelExpectation::opaque(30, 30, 255, 0, 0, "line_middle"),
            PixelExpectation::opaque(10, 10, 255, 0, 0, "line_start"),
            PixelExpectation::transparent(30, 10, "off_line"),
            PixelExpectation::transparent(60, 60, "past_end"),
        ],
    );
}

#[test]
fn cancelled_line_leaves_a_presentable_canvas() {
    let mut source = source(json!({ "tool": 3 }));
    press(&mut source, 10.0, 10.0);
    assert_eq!(source.phase(), GesturePhase::Down);

    source.update(&settings(json!({ "width": 120, "height": 90 })));
    assert_eq!(source.phase(), GesturePhase::Up);
    assert_eq!(source.undo_depth(), 0);
    assert_eq!((source.width(), source.height()), (120, 90));

    release(&mut source, 50.0, 50.0);
    assert!(is_blank(&source));
    assert!(source.video_render().is_some());
}

#[test]
fn clear_is_one_undoable_step() {
    let mut source = source(json!({ "tool": 5 }));
    stroke(&mut source, (10.0, 10.0), (100.0, 100.0));
    let painted = source.canvas_pixels().unwrap();

    source.clear();
    assert!(is_blank(&source));
    assert_eq!(source.undo_depth(), 2);

    source.undo();
    assert_eq!(source.canvas_pixels().unwrap(), painted);
}

#[test]
fn red_pencil_scenario() {
    let mut source = source(json!({
        "width": 200,
        "height": 200,
        "tool": 1,
        "tool_color": 0xFF0000FFu32,
        "tool_alpha": 100.0,
        "tool_size": 5.0,
    }));
    stroke(&mut source, (0.0, 0.0), (50.0, 50.0));
    let painted = [
        PixelExpectation::opaque(25, 25, 255, 0, 0, "diagonal_middle"),
        PixelExpectation::opaque(49, 49, 255, 0, 0, "diagonal_end"),
        PixelExpectation::transparent(100, 100, "beyond_end"),
    ];
    assert_pixels(&source, &painted);

    source.undo();
    assert!(is_blank(&source));
    source.redo();
    assert_pixels(&source, &painted);
}

#[test]
fn empty_history_is_a_no_op() {
    let mut source = source(json!({}));
    source.undo();
    source.redo();
    assert_eq!((source.undo_depth(), source.redo_depth()), (0, 0));
    assert!(is_blank(&source));
}

#[test]
fn release_outside_the_canvas_uses_last_in_bounds_position() {
    let mut source = source(json!({ "tool": 5, "width": 100, "height": 100 }));
    press(&mut source, 10.0, 10.0);
    source.mouse_move(MouseEvent::new(60.0, 60.0), false);
    source.mouse_move(MouseEvent::new(400.0, 400.0), true);
    release(&mut source, 400.0, 400.0);
    assert_pixels(
        &source,
        &[
            PixelExpectation::opaque(50, 50, 255, 0, 0, "inside_last_in_bounds"),
            PixelExpectation::transparent(70, 70, "beyond_last_in_bounds"),
        ],
    );
}

#[test]
fn rejected_tablet_contact_leaves_mouse_strokes_at_full_size() {
    let mut source = source(json!({ "tool": 1, "tool_size": 20.0 }));
    source.tablet(500.0, 500.0, 0.2);
    assert_eq!(source.phase(), GesturePhase::Up);

    stroke(&mut source, (100.0, 10.0), (100.0, 190.0));
    assert_eq!(source.undo_depth(), 1);

    let pixels = source.canvas_pixels().unwrap();
    let row = 100 * source.width() as usize * 4;
    let painted = (0..source.width() as usize)
        .filter(|x| pixels[row + x * 4 + 3] > 0)
        .count();
    assert_eq!(painted, 20);
}

#[test]
fn drag_past_the_left_edge_paints_a_segment() {
    let mut source = source(json!({ "tool": 1, "tool_size": 4.0 }));
    press(&mut source, 10.0, 50.0);
    source.mouse_move(MouseEvent::new(-20.0, 50.0), false);
    source.mouse_move(MouseEvent::new(30.0, 50.0), false);
    release(&mut source, 30.0, 50.0);
    assert_pixels(
        &source,
        &[
            PixelExpectation::opaque(0, 50, 255, 0, 0, "left_edge"),
            PixelExpectation::opaque(20, 50, 255, 0, 0, "back_inside"),
            PixelExpectation::transparent(20, 60, "off_stroke"),
        ],
    );
}
