//! Software triangle rasterizer: Sutherland-Hodgman clipping in clip
//! space, perspective-correct attribute interpolation, and a fill rule
//! that draws shared edges exactly once.
//!
//! Fragments are emitted through the [`PixelSink`] trait so the pipeline
//! stays independent of the presentation layer.

use smallvec::SmallVec;

use crate::color::Rgba8;
use crate::math::{Fix12P4, Float24, Vec2, Vec3, Vec4};
use crate::shader::OutputVertex;
use crate::texture::{self, TextureInfo};

/// Receives shaded fragments in integer screen coordinates.
pub trait PixelSink {
    fn draw_pixel(&mut self, x: u32, y: u32, color: Rgba8);
}

/// Viewport transform parameters. Screen x spans
/// `offset_x .. offset_x + 2 * halfsize_x`, and the depth range maps
/// through `z * depth_scale + depth_offset`.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub halfsize_x: f32,
    pub halfsize_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub depth_scale: f32,
    pub depth_offset: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            halfsize_x: 200.0,
            halfsize_y: 120.0,
            offset_x: 0.0,
            offset_y: 0.0,
            depth_scale: 1.0,
            depth_offset: 0.0,
        }
    }
}

/// A texture image bound for sampling, with its descriptor.
pub struct TextureBinding {
    pub info: TextureInfo,
    pub data: Vec<u8>,
}

/// Post-clipping vertex carrying the interpolated attribute set.
#[derive(Debug, Clone, Copy)]
struct RasterizerVertex {
    pos: Vec4<Float24>,
    color: Vec4<Float24>,
    tc0: Vec2<Float24>,
    screen_position: Vec3<Float24>,
}

impl RasterizerVertex {
    fn new(v: &OutputVertex) -> Self {
        Self {
            pos: v.pos,
            color: v.color,
            tc0: v.tc0,
            screen_position: Vec3::new(Float24::zero(), Float24::zero(), Float24::zero()),
        }
    }

    /// Linear interpolation, factor 0 = `b`, factor 1 = `a`. Only
    /// valid before the perspective divide.
    fn lerp(factor: Float24, a: &Self, b: &Self) -> Self {
        let inv = Float24::one() - factor;
        Self {
            pos: a.pos * factor + b.pos * inv,
            color: a.color * factor + b.color * inv,
            tc0: a.tc0 * factor + b.tc0 * inv,
            screen_position: a.screen_position,
        }
    }
}

/// A clip-space half-space: a vertex is kept when
/// `dot(pos + bias, coeffs) >= 0`.
struct ClippingEdge {
    coeffs: Vec4<Float24>,
    bias: Vec4<Float24>,
}

impl ClippingEdge {
    fn new(coeffs: Vec4<Float24>) -> Self {
        Self {
            coeffs,
            bias: Vec4::splat(Float24::zero()),
        }
    }

    fn with_bias(coeffs: Vec4<Float24>, bias: Vec4<Float24>) -> Self {
        Self { coeffs, bias }
    }

    fn is_inside(&self, vertex: &RasterizerVertex) -> bool {
        (vertex.pos + self.bias).dot(self.coeffs) >= Float24::zero()
    }

    fn intersection(&self, v0: &RasterizerVertex, v1: &RasterizerVertex) -> RasterizerVertex {
        let dp = (v0.pos + self.bias).dot(self.coeffs);
        let dp_prev = (v1.pos + self.bias).dot(self.coeffs);
        let factor = dp_prev / (dp_prev - dp);
        RasterizerVertex::lerp(factor, v0, v1)
    }
}

/// Clipping a planar n-gon against a plane removes at least one vertex
/// and introduces at most two, so each plane grows the polygon by at
/// most one vertex. Starting from a triangle and six volume planes the
/// output can reach 3 + 6 = 9 vertices.
const MAX_VERTICES: usize = 9;

/// Depth test storage, one f32 per pixel, cleared to the far plane.
struct DepthBuffer {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DepthBuffer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![1.0; (width * height) as usize],
        }
    }

    fn clear(&mut self) {
        self.values.fill(1.0);
    }

    /// Less-than test; stores and passes on success.
    fn test_and_set(&mut self, x: u32, y: u32, depth: f32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let slot = &mut self.values[(y * self.width + x) as usize];
        if depth < *slot {
            *slot = depth;
            true
        } else {
            false
        }
    }
}

/// Software rasterizer writing into a [`PixelSink`].
pub struct Rasterizer<S: PixelSink> {
    sink: S,
    viewport: Viewport,
    texture: Option<TextureBinding>,
    depth_buffer: Option<DepthBuffer>,
}

impl<S: PixelSink> Rasterizer<S> {
    pub fn new(sink: S, viewport: Viewport) -> Self {
        Self {
            sink,
            viewport,
            texture: None,
            depth_buffer: None,
        }
    }

    /// Bind or unbind the texture sampled by the fragment stage.
    pub fn bind_texture(&mut self, texture: Option<TextureBinding>) {
        self.texture = texture;
    }

    /// Enable the less-than depth test over the viewport area.
    pub fn enable_depth_test(&mut self) {
        let width = (self.viewport.halfsize_x * 2.0) as u32;
        let height = (self.viewport.halfsize_y * 2.0) as u32;
        self.depth_buffer = Some(DepthBuffer::new(width, height));
    }

    pub fn disable_depth_test(&mut self) {
        self.depth_buffer = None;
    }

    /// Reset the depth buffer to the far plane, typically once per frame.
    pub fn clear_depth(&mut self) {
        if let Some(buffer) = &mut self.depth_buffer {
            buffer.clear();
        }
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Clip a triangle against the view volume and rasterize what
    /// remains. Triangles fully outside are dropped without output.
    pub fn add_triangle(&mut self, v0: &OutputVertex, v1: &OutputVertex, v2: &OutputVertex) {
        let f0 = Float24::zero();
        let f1 = Float24::one();
        // Clipping against w = epsilon instead of w = 0 guarantees the
        // surviving vertices have a usable positive w.
        let epsilon = Float24::from_f32(0.00001);

        let clipping_edges = [
            ClippingEdge::new(Vec4::new(-f1, f0, f0, f1)), // x = +w
            ClippingEdge::new(Vec4::new(f1, f0, f0, f1)),  // x = -w
            ClippingEdge::new(Vec4::new(f0, -f1, f0, f1)), // y = +w
            ClippingEdge::new(Vec4::new(f0, f1, f0, f1)),  // y = -w
            ClippingEdge::new(Vec4::new(f0, f0, -f1, f0)), // z =  0
            ClippingEdge::new(Vec4::new(f0, f0, f1, f1)),  // z = -w
            ClippingEdge::with_bias(Vec4::new(f0, f0, f0, f1), Vec4::new(f0, f0, f0, epsilon)),
        ];

        let mut output_list: SmallVec<[RasterizerVertex; MAX_VERTICES]> = SmallVec::new();
        output_list.push(RasterizerVertex::new(v0));
        output_list.push(RasterizerVertex::new(v1));
        output_list.push(RasterizerVertex::new(v2));
        let mut input_list: SmallVec<[RasterizerVertex; MAX_VERTICES]> = SmallVec::new();

        for edge in &clipping_edges {
            std::mem::swap(&mut input_list, &mut output_list);
            output_list.clear();

            // Note: this changes vertex order in some cases
            let mut reference_vertex = input_list[input_list.len() - 1];
            for &vertex in &input_list {
                if edge.is_inside(&vertex) {
                    if !edge.is_inside(&reference_vertex) {
                        output_list.push(edge.intersection(&vertex, &reference_vertex));
                    }
                    output_list.push(vertex);
                } else if edge.is_inside(&reference_vertex) {
                    output_list.push(edge.intersection(&vertex, &reference_vertex));
                }
                reference_vertex = vertex;
            }

            if output_list.len() < 3 {
                return;
            }
        }

        // Re-triangulate the clipped polygon as a fan around vertex 0.
        for i in 0..output_list.len() - 2 {
            let mut vtx0 = output_list[0];
            let mut vtx1 = output_list[i + 1];
            let mut vtx2 = output_list[i + 2];

            self.init_screen_coordinates(&mut vtx0);
            self.init_screen_coordinates(&mut vtx1);
            self.init_screen_coordinates(&mut vtx2);

            self.process_triangle(&vtx0, &vtx1, &vtx2);
        }
    }

    /// Perspective divide and viewport transform. Attributes are
    /// pre-divided by w here so they interpolate linearly in screen
    /// space; `pos.w` is replaced with 1/w.
    fn init_screen_coordinates(&self, vtx: &mut RasterizerVertex) {
        let inv_w = Float24::one() / vtx.pos.w;
        vtx.pos.w = inv_w;
        vtx.color = vtx.color * inv_w;
        vtx.tc0 = vtx.tc0 * inv_w;

        let halfsize_x = Float24::from_f32(self.viewport.halfsize_x);
        let halfsize_y = Float24::from_f32(self.viewport.halfsize_y);
        let offset_x = Float24::from_f32(self.viewport.offset_x);
        let offset_y = Float24::from_f32(self.viewport.offset_y);

        vtx.screen_position.x = (vtx.pos.x * inv_w + Float24::one()) * halfsize_x + offset_x;
        vtx.screen_position.y = (vtx.pos.y * inv_w + Float24::one()) * halfsize_y + offset_y;
        vtx.screen_position.z = vtx.pos.z * inv_w;
    }

    fn process_triangle(
        &mut self,
        v0: &RasterizerVertex,
        v1: &RasterizerVertex,
        v2: &RasterizerVertex,
    ) {
        let vtxpos = [
            screen_to_rasterizer_coordinates(v0.screen_position),
            screen_to_rasterizer_coordinates(v1.screen_position),
            screen_to_rasterizer_coordinates(v2.screen_position),
        ];

        let mut min_x = vtxpos.iter().map(|v| v.x.raw()).min().unwrap_or(0);
        let mut min_y = vtxpos.iter().map(|v| v.y.raw()).min().unwrap_or(0);
        let mut max_x = vtxpos.iter().map(|v| v.x.raw()).max().unwrap_or(0);
        let mut max_y = vtxpos.iter().map(|v| v.y.raw()).max().unwrap_or(0);

        min_x &= Fix12P4::INT_MASK; // round down
        min_y &= Fix12P4::INT_MASK;
        max_x = (max_x + Fix12P4::FRAC_MASK) & Fix12P4::INT_MASK; // round up
        max_y = (max_y + Fix12P4::FRAC_MASK) & Fix12P4::INT_MASK;

        // Fill rule: pixels on a right-side or flat-bottom edge are not
        // drawn, pixels on any other border are. Implemented by biasing
        // the corresponding edge function by -1.
        let bias0 = edge_bias(vtxpos[0].xy(), vtxpos[1].xy(), vtxpos[2].xy());
        let bias1 = edge_bias(vtxpos[1].xy(), vtxpos[2].xy(), vtxpos[0].xy());
        let bias2 = edge_bias(vtxpos[2].xy(), vtxpos[0].xy(), vtxpos[1].xy());

        let w_inverse = Vec3::new(v0.pos.w, v1.pos.w, v2.pos.w);

        // Walk pixel centers: +8 is half a pixel in 12.4.
        let mut y = min_y.wrapping_add(8);
        while y < max_y {
            let mut x = min_x.wrapping_add(8);
            while x < max_x {
                let point = Vec2::new(Fix12P4::from_raw(x), Fix12P4::from_raw(y));
                let w0 = bias0 + signed_area(vtxpos[1].xy(), vtxpos[2].xy(), point);
                let w1 = bias1 + signed_area(vtxpos[2].xy(), vtxpos[0].xy(), point);
                let w2 = bias2 + signed_area(vtxpos[0].xy(), vtxpos[1].xy(), point);
                let wsum = w0 + w1 + w2;

                if w0 < 0 || w1 < 0 || w2 < 0 || wsum == 0 {
                    x += 0x10;
                    continue;
                }

                let barycentric = Vec3::new(
                    Float24::from_f32(w0 as f32),
                    Float24::from_f32(w1 as f32),
                    Float24::from_f32(w2 as f32),
                );
                let interpolated_w_inverse = Float24::one() / w_inverse.dot(barycentric);

                // z/w is linear in screen space, unlike z itself
                let interpolated_z_over_w = (v0.screen_position.z.to_f32() * w0 as f32
                    + v1.screen_position.z.to_f32() * w1 as f32
                    + v2.screen_position.z.to_f32() * w2 as f32)
                    / wsum as f32;
                let depth = (interpolated_z_over_w * self.viewport.depth_scale
                    + self.viewport.depth_offset)
                    .clamp(0.0, 1.0);

                let screen_x = (x >> 4) as u32;
                let screen_y = (y >> 4) as u32;

                if let Some(buffer) = &mut self.depth_buffer {
                    if !buffer.test_and_set(screen_x, screen_y, depth) {
                        x += 0x10;
                        continue;
                    }
                }

                // Perspective-correct interpolation: attributes were
                // pre-divided by w, so attr/w and 1/w interpolate
                // linearly and their quotient recovers the attribute.
                let interpolate = |a0: Float24, a1: Float24, a2: Float24| {
                    Vec3::new(a0, a1, a2).dot(barycentric) * interpolated_w_inverse
                };

                let channel = |a0, a1, a2| {
                    (interpolate(a0, a1, a2).to_f32().clamp(0.0, 1.0) * 255.0).round() as u8
                };
                let primary_color = Vec4::new(
                    channel(v0.color.r(), v1.color.r(), v2.color.r()),
                    channel(v0.color.g(), v1.color.g(), v2.color.g()),
                    channel(v0.color.b(), v1.color.b(), v2.color.b()),
                    channel(v0.color.a(), v1.color.a(), v2.color.a()),
                );

                let color = match &self.texture {
                    Some(texture) => {
                        let u = interpolate(v0.tc0.x, v1.tc0.x, v2.tc0.x).to_f32();
                        let v = interpolate(v0.tc0.y, v1.tc0.y, v2.tc0.y).to_f32();
                        let texel = sample_texture(texture, u, v);
                        modulate(texel, primary_color)
                    }
                    None => primary_color,
                };

                self.sink.draw_pixel(screen_x, screen_y, color);

                x += 0x10;
            }
            y += 0x10;
        }
    }
}

fn screen_to_rasterizer_coordinates(vec: Vec3<Float24>) -> Vec3<Fix12P4> {
    Vec3::new(
        Fix12P4::from_float24(vec.x),
        Fix12P4::from_float24(vec.y),
        Fix12P4::from_float24(vec.z),
    )
}

/// Signed area of the triangle spanned by three screen points, in
/// sub-pixel units. The sign encodes the winding.
fn signed_area(vtx1: Vec2<Fix12P4>, vtx2: Vec2<Fix12P4>, vtx3: Vec2<Fix12P4>) -> i32 {
    let ax = vtx2.x.raw() as i32 - vtx1.x.raw() as i32;
    let ay = vtx2.y.raw() as i32 - vtx1.y.raw() as i32;
    let bx = vtx3.x.raw() as i32 - vtx1.x.raw() as i32;
    let by = vtx3.y.raw() as i32 - vtx1.y.raw() as i32;
    ax * by - ay * bx
}

/// Whether the edge opposite `vtx` (running from `line1` to `line2`) is
/// a right-side or flat-bottom edge of the triangle.
fn is_right_side_or_flat_bottom_edge(
    vtx: Vec2<Fix12P4>,
    line1: Vec2<Fix12P4>,
    line2: Vec2<Fix12P4>,
) -> bool {
    if line1.y == line2.y {
        // Bottom line parallel to the x axis; check whether the
        // opposite vertex is above it
        vtx.y < line1.y
    } else {
        // Right-side edge iff the opposite vertex lies to its left
        let vx = vtx.x.raw() as i32;
        let vy = vtx.y.raw() as i32;
        let x1 = line1.x.raw() as i32;
        let y1 = line1.y.raw() as i32;
        let x2 = line2.x.raw() as i32;
        let y2 = line2.y.raw() as i32;
        vx < x1 + (x2 - x1) * (vy - y1) / (y2 - y1)
    }
}

fn edge_bias(vtx: Vec2<Fix12P4>, line1: Vec2<Fix12P4>, line2: Vec2<Fix12P4>) -> i32 {
    if is_right_side_or_flat_bottom_edge(vtx, line1, line2) {
        -1
    } else {
        0
    }
}

/// Sample the bound texture at normalized coordinates, repeat-wrapped.
fn sample_texture(texture: &TextureBinding, u: f32, v: f32) -> Rgba8 {
    let width = texture.info.width.max(1);
    let height = texture.info.height.max(1);
    let x = (u * width as f32).floor() as i64;
    let y = (v * height as f32).floor() as i64;
    let x = x.rem_euclid(width as i64) as u16;
    let y = y.rem_euclid(height as i64) as u16;
    texture::lookup_texture(&texture.data, x, y, &texture.info)
}

/// Multiply two 8-bit colors channel-wise.
fn modulate(a: Rgba8, b: Rgba8) -> Rgba8 {
    let mul = |x: u8, y: u8| ((x as u16 * y as u16) / 255) as u8;
    Vec4::new(
        mul(a.r(), b.r()),
        mul(a.g(), b.g()),
        mul(a.b(), b.b()),
        mul(a.a(), b.a()),
    )
}
