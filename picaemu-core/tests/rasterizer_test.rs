//! Integration tests for the clipping rasterizer, using a recording
//! pixel sink instead of a window.

use std::collections::HashMap;

use picaemu_core::color::Rgba8;
use picaemu_core::math::{Float24, Vec4};
use picaemu_core::rasterizer::{PixelSink, Rasterizer, TextureBinding, Viewport};
use picaemu_core::shader::{AttributeBuffer, OutputVertex};
use picaemu_core::texture::{TextureFormat, TextureInfo};

/// Records every emitted fragment; keeps the last color and a count
/// per pixel.
#[derive(Default)]
struct RecordingSink {
    pixels: HashMap<(u32, u32), (Rgba8, u32)>,
}

impl PixelSink for RecordingSink {
    fn draw_pixel(&mut self, x: u32, y: u32, color: Rgba8) {
        let entry = self.pixels.entry((x, y)).or_insert((color, 0));
        entry.0 = color;
        entry.1 += 1;
    }
}

fn f24(v: f32) -> Float24 {
    Float24::from_f32(v)
}

/// Build an output vertex from clip-space position and color.
fn vertex(pos: [f32; 4], color: [f32; 4]) -> OutputVertex {
    vertex_uv(pos, color, [0.0, 0.0])
}

fn vertex_uv(pos: [f32; 4], color: [f32; 4], uv: [f32; 2]) -> OutputVertex {
    let mut buffer = AttributeBuffer::default();
    buffer.attr[0] = Vec4::new(f24(pos[0]), f24(pos[1]), f24(pos[2]), f24(pos[3]));
    buffer.attr[1] = Vec4::new(f24(color[0]), f24(color[1]), f24(color[2]), f24(color[3]));
    buffer.attr[2] = Vec4::new(f24(uv[0]), f24(uv[1]), f24(0.0), f24(0.0));
    OutputVertex::from_attribute_buffer(&buffer)
}

fn rasterizer() -> Rasterizer<RecordingSink> {
    Rasterizer::new(RecordingSink::default(), Viewport::default())
}

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// A square split along its diagonal must cover every interior pixel
/// exactly once: the fill rule assigns shared-edge pixels to a single
/// triangle.
#[test]
fn test_shared_edge_pixels_drawn_exactly_once() {
    let a = vertex([-0.5, -0.5, 0.0, 1.0], WHITE);
    let b = vertex([0.5, -0.5, 0.0, 1.0], WHITE);
    let c = vertex([0.5, 0.5, 0.0, 1.0], WHITE);
    let d = vertex([-0.5, 0.5, 0.0, 1.0], WHITE);

    let mut raster = rasterizer();
    raster.add_triangle(&a, &b, &c);
    raster.add_triangle(&a, &c, &d);

    let sink = raster.into_sink();
    for (&(x, y), &(_, count)) in &sink.pixels {
        assert_eq!(count, 1, "pixel ({x}, {y}) drawn {count} times");
    }
    // Half-open coverage: x in [100, 300), y in [60, 180)
    assert_eq!(sink.pixels.len(), 200 * 120);
    assert!(sink.pixels.contains_key(&(100, 60)));
    assert!(!sink.pixels.contains_key(&(300, 60)));
    assert!(!sink.pixels.contains_key(&(100, 180)));
}

/// Triangles entirely beyond a clip plane produce no fragments.
#[test]
fn test_fully_clipped_triangle_is_dropped() {
    let a = vertex([2.0, 0.0, 0.0, 1.0], WHITE);
    let b = vertex([3.0, 0.0, 0.0, 1.0], WHITE);
    let c = vertex([2.5, 1.0, 0.0, 1.0], WHITE);

    let mut raster = rasterizer();
    raster.add_triangle(&a, &b, &c);
    assert!(raster.into_sink().pixels.is_empty());

    // Behind the camera: negative w
    let a = vertex([0.0, 0.0, 0.0, -1.0], WHITE);
    let b = vertex([1.0, 0.0, 0.0, -1.0], WHITE);
    let c = vertex([0.0, 1.0, 0.0, -1.0], WHITE);
    let mut raster = rasterizer();
    raster.add_triangle(&a, &b, &c);
    assert!(raster.into_sink().pixels.is_empty());
}

/// A partially visible triangle is clipped to the view volume, so all
/// fragments stay inside the viewport.
#[test]
fn test_partially_clipped_triangle_stays_in_viewport() {
    let a = vertex([0.5, -0.5, 0.0, 1.0], WHITE);
    let b = vertex([2.0, 0.0, 0.0, 1.0], WHITE);
    let c = vertex([0.5, 0.5, 0.0, 1.0], WHITE);

    let mut raster = rasterizer();
    raster.add_triangle(&a, &b, &c);

    let sink = raster.into_sink();
    assert!(!sink.pixels.is_empty());
    for &(x, y) in sink.pixels.keys() {
        assert!(x < 400, "fragment past the right edge at ({x}, {y})");
        assert!(y < 240);
    }
}

/// Degenerate triangles (zero area) emit nothing.
#[test]
fn test_degenerate_triangle_emits_nothing() {
    let a = vertex([-0.5, 0.0, 0.0, 1.0], WHITE);
    let b = vertex([0.5, 0.0, 0.0, 1.0], WHITE);

    let mut raster = rasterizer();
    raster.add_triangle(&a, &b, &a);
    assert!(raster.into_sink().pixels.is_empty());
}

/// Attribute interpolation is perspective-correct: with differing w the
/// interpolated value is pulled toward the near vertex, away from the
/// screen-space linear value.
#[test]
fn test_perspective_correct_interpolation() {
    // NDC: v0 at (-1, -1) with w=1, v1 at (1, -1) with w=3. Clip-space
    // coordinates are NDC scaled by w.
    let v0 = vertex([-1.0, -1.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]);
    let v1 = vertex([3.0, -3.0, 0.0, 3.0], [0.0, 0.0, 0.0, 1.0]);
    let v2 = vertex([-1.0, 1.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]);

    let mut raster = rasterizer();
    raster.add_triangle(&v0, &v1, &v2);
    let sink = raster.into_sink();

    // Screen midpoint of the bottom edge: halfway between the vertices
    // in screen space. 1/w there is (1 + 1/3) / 2 = 2/3 and red/w is
    // 1/2, so red = (1/2) / (2/3) = 0.75. Linear would give 0.5.
    let &(color, _) = sink
        .pixels
        .get(&(200, 0))
        .expect("midpoint pixel not covered");
    let red = color.r() as f32 / 255.0;
    assert!((red - 0.75).abs() < 0.05, "red = {red}");
    assert!((red - 0.5).abs() > 0.15, "interpolation looks linear");
}

/// The depth test keeps the nearer fragment regardless of draw order.
#[test]
fn test_depth_test_keeps_nearer_fragment() {
    // Map z/w in [-1, 0] onto depth [0, 1]
    let viewport = Viewport {
        depth_scale: -1.0,
        depth_offset: 0.0,
        ..Viewport::default()
    };
    let red = [1.0, 0.0, 0.0, 1.0];
    let blue = [0.0, 0.0, 1.0, 1.0];
    let near = |color| {
        [
            vertex([-0.5, -0.5, -0.25, 1.0], color),
            vertex([0.5, -0.5, -0.25, 1.0], color),
            vertex([0.0, 0.5, -0.25, 1.0], color),
        ]
    };
    let far: Vec<OutputVertex> = vec![
        vertex([-0.5, -0.5, -0.75, 1.0], blue),
        vertex([0.5, -0.5, -0.75, 1.0], blue),
        vertex([0.0, 0.5, -0.75, 1.0], blue),
    ];

    let mut raster = Rasterizer::new(RecordingSink::default(), viewport);
    raster.enable_depth_test();

    let n = near(red);
    raster.add_triangle(&far[0], &far[1], &far[2]);
    raster.add_triangle(&n[0], &n[1], &n[2]);
    // Far triangle again: must lose everywhere
    raster.add_triangle(&far[0], &far[1], &far[2]);

    let sink = raster.into_sink();
    let &(color, _) = sink.pixels.get(&(200, 120)).expect("center not covered");
    assert_eq!(color.r(), 255);
    assert_eq!(color.b(), 0);
}

/// Without the depth test the last draw wins.
#[test]
fn test_draw_order_wins_without_depth_test() {
    let red = [1.0, 0.0, 0.0, 1.0];
    let blue = [0.0, 0.0, 1.0, 1.0];
    let tri = |color| {
        [
            vertex([-0.5, -0.5, 0.0, 1.0], color),
            vertex([0.5, -0.5, 0.0, 1.0], color),
            vertex([0.0, 0.5, 0.0, 1.0], color),
        ]
    };

    let mut raster = rasterizer();
    let r = tri(red);
    let b = tri(blue);
    raster.add_triangle(&r[0], &r[1], &r[2]);
    raster.add_triangle(&b[0], &b[1], &b[2]);

    let sink = raster.into_sink();
    let &(color, _) = sink.pixels.get(&(200, 120)).expect("center not covered");
    assert_eq!(color.b(), 255);
    assert_eq!(color.r(), 0);
}

/// Texture sampling uses the interpolated texture coordinates and
/// modulates with the vertex color.
#[test]
fn test_textured_triangle_samples_and_modulates() {
    // 8x8 I8 texture: left half dark, right half bright
    let mut data = vec![0u8; 64];
    for y in 0..8u32 {
        for x in 4..8u32 {
            let morton = {
                const XLUT: [u32; 8] = [0x00, 0x01, 0x04, 0x05, 0x10, 0x11, 0x14, 0x15];
                const YLUT: [u32; 8] = [0x00, 0x02, 0x08, 0x0a, 0x20, 0x22, 0x28, 0x2a];
                XLUT[x as usize] + YLUT[y as usize]
            };
            data[morton as usize] = 0xFF;
        }
    }
    let binding = TextureBinding {
        info: TextureInfo {
            physical_address: 0,
            width: 8,
            height: 8,
            stride: 64,
            format: TextureFormat::I8,
        },
        data,
    };

    // Full-viewport quad mapping u in [0, 1] across the screen
    let a = vertex_uv([-1.0, -1.0, 0.0, 1.0], WHITE, [0.0, 0.0]);
    let b = vertex_uv([1.0, -1.0, 0.0, 1.0], WHITE, [1.0, 0.0]);
    let c = vertex_uv([1.0, 1.0, 0.0, 1.0], WHITE, [1.0, 1.0]);
    let d = vertex_uv([-1.0, 1.0, 0.0, 1.0], WHITE, [0.0, 1.0]);

    let mut raster = rasterizer();
    raster.bind_texture(Some(binding));
    raster.add_triangle(&a, &b, &c);
    raster.add_triangle(&a, &c, &d);

    let sink = raster.into_sink();
    let &(left, _) = sink.pixels.get(&(50, 120)).expect("left not covered");
    let &(right, _) = sink.pixels.get(&(350, 120)).expect("right not covered");
    assert_eq!(left.r(), 0);
    assert_eq!(right.r(), 255);

    // Modulation by a half-alpha vertex color dims the texel alpha
    let gray = [0.5, 0.5, 0.5, 0.5];
    let a = vertex_uv([-1.0, -1.0, 0.0, 1.0], gray, [1.0, 0.0]);
    let b = vertex_uv([1.0, -1.0, 0.0, 1.0], gray, [1.0, 0.0]);
    let c = vertex_uv([0.0, 1.0, 0.0, 1.0], gray, [1.0, 1.0]);

    let mut raster = rasterizer();
    raster.bind_texture(Some(TextureBinding {
        info: TextureInfo {
            physical_address: 0,
            width: 8,
            height: 8,
            stride: 64,
            format: TextureFormat::A8,
        },
        data: vec![0xFF; 64],
    }));
    raster.add_triangle(&a, &b, &c);
    let sink = raster.into_sink();
    let &(color, _) = sink.pixels.get(&(200, 120)).expect("center not covered");
    // A8 has black color channels; the vertex alpha halves the texel's
    assert_eq!(color.r(), 0);
    assert!((color.a() as i32 - 128).abs() <= 1);
}
