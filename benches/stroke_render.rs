use criterion::{criterion_group, criterion_main, Criterion};
use drawsource::{DrawSource, Graphics, MouseButton, MouseEvent, SettingsMap, SoftwareBackend};
use serde_json::json;

fn source(tool: u32) -> DrawSource<SoftwareBackend> {
    let mut settings = SettingsMap::new();
    settings.insert("width".into(), json!(1280));
    settings.insert("height".into(), json!(720));
    settings.insert("tool".into(), json!(tool));
    settings.insert("tool_size".into(), json!(12.0));
    DrawSource::new(Graphics::new(SoftwareBackend::new()), &settings)
}

fn bench_brush_gesture(c: &mut Criterion) {
    let mut source = source(2);
    c.bench_function("brush_gesture_1280x720", |b| {
        b.iter(|| {
            source.mouse_click(MouseEvent::new(100.0, 100.0), MouseButton::Left, false, 1);
            for step in 1..=8 {
                let offset = step as f32 * 40.0;
                source.mouse_move(MouseEvent::new(100.0 + offset, 100.0 + offset * 0.5), false);
            }
            source.mouse_click(MouseEvent::new(420.0, 260.0), MouseButton::Left, true, 1);
        })
    });
}

fn bench_present_frame(c: &mut Criterion) {
    let mut source = source(8);
    source.mouse_move(MouseEvent::new(640.0, 360.0), false);
    c.bench_function("present_frame_1280x720", |b| {
        b.iter(|| source.video_render().is_some())
    });
}

criterion_group!(benches, bench_brush_gesture, bench_present_frame);
criterion_main!(benches);
