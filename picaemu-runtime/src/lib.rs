//! Presentation layer: a window-backed framebuffer the rasterizer
//! draws into.
//!
//! The [`Frontend`] owns a `minifb` window and a 0x00RRGGBB pixel
//! buffer; it implements [`PixelSink`] so a
//! [`Rasterizer`](picaemu_core::rasterizer::Rasterizer) can write to it
//! directly.

use std::time::Duration;

use anyhow::{Context, Result};
use minifb::{Key, Window, WindowOptions};

use picaemu_core::color::Rgba8;
use picaemu_core::rasterizer::PixelSink;

/// Output resolution, in pixels.
pub const VIDEO_WIDTH: usize = 400;
pub const VIDEO_HEIGHT: usize = 240;

pub struct Frontend {
    window: Window,
    buffer: Vec<u32>,
}

impl Frontend {
    /// Open the output window. Presentation is capped at 60 Hz.
    pub fn new(title: &str) -> Result<Self> {
        let mut window = Window::new(
            title,
            VIDEO_WIDTH,
            VIDEO_HEIGHT,
            WindowOptions::default(),
        )
        .context("failed to create output window")?;
        window.limit_update_rate(Some(Duration::from_micros(16600)));

        Ok(Self {
            window,
            buffer: vec![0u32; VIDEO_WIDTH * VIDEO_HEIGHT],
        })
    }

    /// Fill the framebuffer with a single color.
    pub fn clear(&mut self, color: Rgba8) {
        self.buffer.fill(pack(color));
    }

    /// Present the framebuffer.
    pub fn flip(&mut self) -> Result<()> {
        self.window
            .update_with_buffer(&self.buffer, VIDEO_WIDTH, VIDEO_HEIGHT)
            .context("failed to present frame")
    }

    /// Pump window events without presenting new content, for frame
    /// pacing while the scene is unchanged.
    pub fn wait(&mut self) {
        self.window.update();
    }

    /// Returns false once the user has asked to quit.
    pub fn poll_event(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }
}

fn pack(color: Rgba8) -> u32 {
    ((color.r() as u32) << 16) | ((color.g() as u32) << 8) | color.b() as u32
}

impl PixelSink for Frontend {
    fn draw_pixel(&mut self, x: u32, y: u32, color: Rgba8) {
        let (x, y) = (x as usize, y as usize);
        if x >= VIDEO_WIDTH || y >= VIDEO_HEIGHT {
            log::warn!("fragment outside framebuffer: ({x}, {y})");
            return;
        }
        self.buffer[y * VIDEO_WIDTH + x] = pack(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_orders_channels() {
        use picaemu_core::math::Vec4;
        assert_eq!(pack(Vec4::new(0x12, 0x34, 0x56, 0xFF)), 0x123456);
    }
}
