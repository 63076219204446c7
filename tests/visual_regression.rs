/// Visual regression tests for the draw source.
///
/// The main scene scripts one gesture per tile, then specific canvas pixels
/// are validated against expected colors. The software backend always runs;
/// the GPU variant runs when a headless adapter is available.
///
/// Run with:   cargo test --test visual_regression
use drawsource::{DrawSource, Graphics, GraphicsBackend, SoftwareBackend, WgpuBackend};
use drawsource_test_scenes::scene::MAIN_SCENE_UNDO_STEPS;
use drawsource_test_scenes::{
    build_main_scene, check_pixels, scene_settings, PixelExpectation, CANVAS_HEIGHT, CANVAS_WIDTH,
};
use futures::executor::block_on;

/// Routes library logs to the test output; `RUST_LOG=drawsource=debug` shows
/// gesture and history activity.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn software_source() -> DrawSource<SoftwareBackend> {
    init_tracing();
    DrawSource::new(Graphics::new(SoftwareBackend::new()), &scene_settings())
}

fn assert_expectations(pixels: &[u8], expectations: &[PixelExpectation]) {
    let failures = check_pixels(pixels, CANVAS_WIDTH, CANVAS_HEIGHT, expectations);
    if !failures.is_empty() {
        let message = format!(
            "{} pixel expectation(s) failed:\n{}",
            failures.len(),
            failures.join("\n"),
        );
        panic!("{message}");
    }
}

fn run_main_scene<B: GraphicsBackend>(source: &mut DrawSource<B>) {
    let expectations = build_main_scene(source);
    let pixels = source.canvas_pixels().expect("canvas readback");
    assert_eq!(pixels.len(), (CANVAS_WIDTH * CANVAS_HEIGHT * 4) as usize);
    assert_expectations(&pixels, &expectations);
}

/// Main regression test on the CPU backend.
#[test]
fn main_scene_pixel_expectations() {
    let mut source = software_source();
    run_main_scene(&mut source);
    assert_eq!(source.undo_depth(), MAIN_SCENE_UNDO_STEPS);
}

/// Same scene through the WGSL pass. Skipped without an adapter.
#[test]
fn main_scene_pixel_expectations_gpu() {
    init_tracing();
    let Some(backend) = block_on(WgpuBackend::try_new_headless()) else {
        eprintln!("no wgpu adapter available, skipping GPU scene");
        return;
    };
    let mut source = DrawSource::new(Graphics::new(backend), &scene_settings());
    run_main_scene(&mut source);
}

#[test]
fn gpu_and_software_canvases_agree() {
    let Some(backend) = block_on(WgpuBackend::try_new_headless()) else {
        eprintln!("no wgpu adapter available, skipping parity check");
        return;
    };
    let mut gpu = DrawSource::new(Graphics::new(backend), &scene_settings());
    let mut cpu = software_source();
    build_main_scene(&mut gpu);
    build_main_scene(&mut cpu);

    let gpu_pixels = gpu.canvas_pixels().expect("gpu readback");
    let cpu_pixels = cpu.canvas_pixels().expect("cpu readback");
    let differing = gpu_pixels
        .chunks_exact(4)
        .zip(cpu_pixels.chunks_exact(4))
        .filter(|(a, b)| a.iter().zip(b.iter()).any(|(x, y)| x.abs_diff(*y) > 2))
        .count();
    // Edge pixels may land on the other side of a coverage test.
    let total = (CANVAS_WIDTH * CANVAS_HEIGHT) as usize;
    assert!(
        differing * 100 < total,
        "{differing} of {total} pixels differ between backends"
    );
}

/// Undoing every step of the scene gives back a blank canvas.
#[test]
fn undo_whole_scene() {
    let mut source = software_source();
    build_main_scene(&mut source);
    for _ in 0..MAIN_SCENE_UNDO_STEPS {
        source.undo();
    }
    assert_eq!(source.undo_depth(), 0);
    assert_eq!(source.redo_depth(), MAIN_SCENE_UNDO_STEPS);
    let pixels = source.canvas_pixels().unwrap();
    assert!(pixels.iter().all(|&byte| byte == 0));

    for _ in 0..MAIN_SCENE_UNDO_STEPS {
        source.redo();
    }
    let expectations = build_expectations_only();
    assert_expectations(&source.canvas_pixels().unwrap(), &expectations);
}

/// Expectations of the main scene, computed on a throwaway source.
fn build_expectations_only() -> Vec<PixelExpectation> {
    let mut scratch = software_source();
    build_main_scene(&mut scratch)
}

/// An untouched source renders a transparent frame.
#[test]
fn empty_canvas_renders_transparent() {
    let mut source = software_source();
    let frame = source.frame_pixels().unwrap();
    assert_eq!(frame.len(), (CANVAS_WIDTH * CANVAS_HEIGHT * 4) as usize);
    assert!(frame.iter().all(|&byte| byte == 0));
}

/// A shape being dragged shows in the frame but not on the canvas.
#[test]
fn shape_preview_is_not_committed() {
    use drawsource::{MouseButton, MouseEvent};

    let mut source = software_source();
    let mut settings = drawsource::SettingsMap::new();
    settings.insert("tool".into(), 5.into());
    source.update(&settings);
    source.mouse_click(MouseEvent::new(10.0, 10.0), MouseButton::Left, false, 1);
    source.mouse_move(MouseEvent::new(30.0, 30.0), false);

    let expectations = vec![PixelExpectation::opaque(20, 20, 255, 0, 0, "preview_inside")];
    assert_expectations(&source.frame_pixels().unwrap(), &expectations);
    let canvas = vec![PixelExpectation::transparent(20, 20, "canvas_untouched")];
    assert_expectations(&source.canvas_pixels().unwrap(), &canvas);
}
