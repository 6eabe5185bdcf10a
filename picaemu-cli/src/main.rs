// Demo application: drives the full pipeline into a window.
use clap::Parser;

use picaemu_core::color;
use picaemu_core::math::{Float24, Vec4};
use picaemu_core::rasterizer::{Rasterizer, TextureBinding, Viewport};
use picaemu_core::shader::{asm, AttributeBuffer, OutputVertex, ShaderEngine, ShaderSetup, Uniforms};
use picaemu_core::shader::isa::OpCode;
use picaemu_core::texture::{TextureFormat, TextureInfo};
use picaemu_runtime::Frontend;

#[derive(Parser)]
#[command(name = "picaemu")]
#[command(about = "Software GPU pipeline demo: a spinning textured quad")]
#[command(version)]
struct Cli {
    /// Stop animating after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Keep the window open once the frame budget is exhausted
    #[arg(long, requires = "frames")]
    hold: bool,

    /// Disable texture sampling, showing vertex colors only
    #[arg(long)]
    untextured: bool,

    /// Enable the depth test
    #[arg(long)]
    depth_test: bool,
}

/// The vertex program: position through the matrix in c0-c3 with w
/// taken from c95.y, color and texture coordinates passed through.
fn build_shader() -> anyhow::Result<ShaderSetup> {
    let code = [
        asm::arith(OpCode::Mov, 0x10, 0x00, 0, 0), // mov r0.xyz, v0
        asm::arith(OpCode::Mov, 0x10, 0x7F, 0, 1), // mov r0.w, c95.yyyy
        asm::arith(OpCode::Dp4, 0x00, 0x20, 0x10, 2), // dp4 o0.x, c0, r0
        asm::arith(OpCode::Dp4, 0x00, 0x21, 0x10, 3), // dp4 o0.y, c1, r0
        asm::arith(OpCode::Dp4, 0x00, 0x22, 0x10, 4), // dp4 o0.z, c2, r0
        asm::arith(OpCode::Dp4, 0x00, 0x23, 0x10, 5), // dp4 o0.w, c3, r0
        asm::arith(OpCode::Mov, 0x01, 0x01, 0, 6), // mov o1, v1
        asm::arith(OpCode::Mov, 0x02, 0x02, 0, 6), // mov o2, v2
        asm::end(),
    ];
    let sel_y = [1, 1, 1, 1];
    let swizzles = [
        asm::swizzle(0b1110, asm::SEL_XYZW, false, asm::SEL_XYZW, false),
        asm::swizzle(0b0001, sel_y, false, asm::SEL_XYZW, false),
        asm::swizzle(0b1000, asm::SEL_XYZW, false, asm::SEL_XYZW, false),
        asm::swizzle(0b0100, asm::SEL_XYZW, false, asm::SEL_XYZW, false),
        asm::swizzle(0b0010, asm::SEL_XYZW, false, asm::SEL_XYZW, false),
        asm::swizzle(0b0001, asm::SEL_XYZW, false, asm::SEL_XYZW, false),
        asm::swizzle(0b1111, asm::SEL_XYZW, false, asm::SEL_XYZW, false),
    ];
    Ok(ShaderSetup::new(&code, &swizzles, 0)?)
}

fn vec4(x: f32, y: f32, z: f32, w: f32) -> Vec4<Float24> {
    Vec4::new(
        Float24::from_f32(x),
        Float24::from_f32(y),
        Float24::from_f32(z),
        Float24::from_f32(w),
    )
}

/// Rotation about the y axis followed by a perspective projection with
/// the camera `distance` units back, written into c0-c3.
fn set_transform(uniforms: &mut Uniforms, theta: f32, distance: f32) {
    let (sin, cos) = theta.sin_cos();
    uniforms.f[0] = vec4(cos, 0.0, sin, 0.0);
    uniforms.f[1] = vec4(0.0, 1.0, 0.0, 0.0);
    // w = distance - view z; depth held at w/2 behind the near plane
    uniforms.f[3] = vec4(sin, 0.0, -cos, distance);
    uniforms.f[2] = vec4(-0.5 * sin, 0.0, 0.5 * cos, -0.5 * distance);
    uniforms.f[95] = vec4(0.0, 1.0, -1.0, 0.1);
}

/// 64x64 checkerboard in the tiled RGBA8 layout.
fn build_checkerboard() -> TextureBinding {
    const SIZE: u32 = 64;
    // 8 tiles per row, 256 bytes per RGBA8 tile
    const STRIDE: u32 = (SIZE / 8) * 256;

    const XLUT: [u32; 8] = [0x00, 0x01, 0x04, 0x05, 0x10, 0x11, 0x14, 0x15];
    const YLUT: [u32; 8] = [0x00, 0x02, 0x08, 0x0a, 0x20, 0x22, 0x28, 0x2a];

    let mut data = vec![0u8; (STRIDE * SIZE / 8) as usize];
    for y in 0..SIZE {
        for x in 0..SIZE {
            let texel = if ((x / 8) + (y / 8)) % 2 == 0 {
                Vec4::new(230, 230, 230, 255)
            } else {
                Vec4::new(60, 60, 160, 255)
            };
            let tile_offset = (y / 8) * STRIDE + (x / 8) * 256;
            let morton = XLUT[(x % 8) as usize] + YLUT[(y % 8) as usize];
            let offset = (tile_offset + morton * 4) as usize;
            color::encode_rgba8(texel, &mut data[offset..offset + 4]);
        }
    }

    TextureBinding {
        info: TextureInfo {
            physical_address: 0,
            width: SIZE,
            height: SIZE,
            stride: STRIDE,
            format: TextureFormat::Rgba8,
        },
        data,
    }
}

/// Run one vertex through the shader.
fn shade_vertex(
    setup: &ShaderSetup,
    uniforms: &Uniforms,
    pos: Vec4<Float24>,
    color: Vec4<Float24>,
    uv: Vec4<Float24>,
) -> OutputVertex {
    let mut input = AttributeBuffer::default();
    input.attr[0] = pos;
    input.attr[1] = color;
    input.attr[2] = uv;

    let mut engine = ShaderEngine::new(setup, uniforms);
    engine.load_input(&input);
    engine.run();

    let mut output = AttributeBuffer::default();
    engine.write_output(&mut output);
    OutputVertex::from_attribute_buffer(&output)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let frontend = Frontend::new("picaemu")?;
    let setup = build_shader()?;
    let mut uniforms = Uniforms::default();

    let mut raster = Rasterizer::new(frontend, Viewport::default());
    if !cli.untextured {
        raster.bind_texture(Some(build_checkerboard()));
    }
    if cli.depth_test {
        raster.enable_depth_test();
    }

    // Quad corners in model space with the demo's corner colors
    let corners = [
        (vec4(-0.5, -0.5, 0.0, 1.0), vec4(1.0, 0.0, 0.0, 1.0), vec4(0.0, 0.0, 0.0, 0.0)),
        (vec4(0.5, -0.5, 0.0, 1.0), vec4(1.0, 1.0, 0.0, 1.0), vec4(1.0, 0.0, 0.0, 0.0)),
        (vec4(0.5, 0.5, 0.0, 1.0), vec4(0.0, 1.0, 1.0, 1.0), vec4(1.0, 1.0, 0.0, 0.0)),
        (vec4(-0.5, 0.5, 0.0, 1.0), vec4(0.0, 0.0, 1.0, 1.0), vec4(0.0, 1.0, 0.0, 0.0)),
    ];

    log::info!("starting render loop");
    let mut theta: f32 = 0.0;
    let mut frame: u64 = 0;
    while raster.sink_mut().poll_event() {
        if let Some(frames) = cli.frames {
            if frame >= frames {
                if !cli.hold {
                    break;
                }
                raster.sink_mut().wait();
                continue;
            }
        }

        set_transform(&mut uniforms, theta, 2.0);

        let shaded: Vec<OutputVertex> = corners
            .iter()
            .map(|&(pos, color, uv)| shade_vertex(&setup, &uniforms, pos, color, uv))
            .collect();

        raster.sink_mut().clear(Vec4::new(16, 16, 24, 255));
        raster.clear_depth();
        raster.add_triangle(&shaded[0], &shaded[1], &shaded[2]);
        raster.add_triangle(&shaded[0], &shaded[2], &shaded[3]);
        raster.sink_mut().flip()?;

        theta += 0.02;
        frame += 1;
    }

    Ok(())
}
