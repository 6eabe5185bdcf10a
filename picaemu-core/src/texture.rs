//! Texture mapping unit: tiled texture memory addressing and per-format
//! texel decoding.
//!
//! Texture memory is organized in 8x8-texel tiles laid out in row-major
//! tile order (`stride` bytes per tile row). Within a tile, texels follow
//! an 8x8 Z-order (Morton) curve, not row-major order. Both levels have
//! to be reproduced exactly for any non-degenerate stride.

use crate::color;
use crate::color::Rgba8;
use crate::math::Vec4;

const TILE_SIZE: u32 = 8 * 8;
const ETC1_SUBTILES: u32 = 2 * 2;

/// Hardware texture formats, in register encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextureFormat {
    Rgba8 = 0,
    Rgb8 = 1,
    Rgb5A1 = 2,
    Rgb565 = 3,
    Rgba4 = 4,
    Ia8 = 5,
    Rg8 = 6,
    I8 = 7,
    A8 = 8,
    Ia4 = 9,
    I4 = 10,
    A4 = 11,
    Etc1 = 12,
    Etc1A4 = 13,
}

impl TextureFormat {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Rgba8),
            1 => Some(Self::Rgb8),
            2 => Some(Self::Rgb5A1),
            3 => Some(Self::Rgb565),
            4 => Some(Self::Rgba4),
            5 => Some(Self::Ia8),
            6 => Some(Self::Rg8),
            7 => Some(Self::I8),
            8 => Some(Self::A8),
            9 => Some(Self::Ia4),
            10 => Some(Self::I4),
            11 => Some(Self::A4),
            12 => Some(Self::Etc1),
            13 => Some(Self::Etc1A4),
            _ => None,
        }
    }
}

/// Texture descriptor, supplied per draw.
#[derive(Debug, Clone, Copy)]
pub struct TextureInfo {
    pub physical_address: u32,
    pub width: u32,
    pub height: u32,
    /// Bytes per row of tiles.
    pub stride: u32,
    pub format: TextureFormat,
}

/// 8x8 Z-order offset from 2D in-tile coordinates.
///
/// The per-axis tables hold the bit-interleaved contribution of each
/// coordinate; their sum is the Morton index.
fn morton_interleave(x: u32, y: u32) -> u32 {
    const XLUT: [u32; 8] = [0x00, 0x01, 0x04, 0x05, 0x10, 0x11, 0x14, 0x15];
    const YLUT: [u32; 8] = [0x00, 0x02, 0x08, 0x0a, 0x20, 0x22, 0x28, 0x2a];
    XLUT[(x % 8) as usize] + YLUT[(y % 8) as usize]
}

/// Returns the byte size of an 8x8 tile of the specified texture format.
pub fn calculate_tile_size(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Rgba8 => 4 * TILE_SIZE,
        TextureFormat::Rgb8 => 3 * TILE_SIZE,
        TextureFormat::Rgb5A1
        | TextureFormat::Rgb565
        | TextureFormat::Rgba4
        | TextureFormat::Ia8
        | TextureFormat::Rg8 => 2 * TILE_SIZE,
        TextureFormat::I8 | TextureFormat::A8 | TextureFormat::Ia4 => TILE_SIZE,
        TextureFormat::I4 | TextureFormat::A4 => TILE_SIZE / 2,
        TextureFormat::Etc1 => ETC1_SUBTILES * 8,
        TextureFormat::Etc1A4 => ETC1_SUBTILES * 16,
    }
}

/// Look up the texel at integer coordinates and return its RGBA color.
///
/// `source` points at the texture's base; the row of tiles is selected
/// by `info.stride`, then the tile, then the Z-ordered texel inside it.
pub fn lookup_texture(source: &[u8], x: u16, y: u16, info: &TextureInfo) -> Rgba8 {
    // Coordinate in tiles
    let coarse_x = (x / 8) as u32;
    let coarse_y = (y / 8) as u32;

    // Coordinate inside the tile
    let fine_x = (x % 8) as u32;
    let fine_y = (y % 8) as u32;

    let offset = (coarse_y * info.stride + coarse_x * calculate_tile_size(info.format)) as usize;
    lookup_texel_in_tile(&source[offset..], fine_x, fine_y, info)
}

/// Look up a texel from a single 8x8 tile. `x` and `y` must be < 8.
pub fn lookup_texel_in_tile(tile: &[u8], x: u32, y: u32, info: &TextureInfo) -> Rgba8 {
    match info.format {
        TextureFormat::Rgba8 => {
            color::decode_rgba8(&tile[(morton_interleave(x, y) * 4) as usize..])
        }

        TextureFormat::Rgb8 => color::decode_rgb8(&tile[(morton_interleave(x, y) * 3) as usize..]),

        TextureFormat::Rgb5A1 => {
            color::decode_rgb5a1(&tile[(morton_interleave(x, y) * 2) as usize..])
        }

        TextureFormat::Rgb565 => {
            color::decode_rgb565(&tile[(morton_interleave(x, y) * 2) as usize..])
        }

        TextureFormat::Rgba4 => color::decode_rgba4(&tile[(morton_interleave(x, y) * 2) as usize..]),

        TextureFormat::Ia8 => {
            let texel = &tile[(morton_interleave(x, y) * 2) as usize..];
            Vec4::new(texel[1], texel[1], texel[1], texel[0])
        }

        TextureFormat::Rg8 => color::decode_rg8(&tile[(morton_interleave(x, y) * 2) as usize..]),

        TextureFormat::I8 => {
            let i = tile[morton_interleave(x, y) as usize];
            Vec4::new(i, i, i, 255)
        }

        TextureFormat::A8 => {
            let a = tile[morton_interleave(x, y) as usize];
            Vec4::new(0, 0, 0, a)
        }

        TextureFormat::Ia4 => {
            let byte = tile[morton_interleave(x, y) as usize];
            let i = color::convert_4_to_8((byte & 0xF0) >> 4);
            let a = color::convert_4_to_8(byte & 0xF);
            Vec4::new(i, i, i, a)
        }

        TextureFormat::I4 => {
            let morton_offset = morton_interleave(x, y);
            let byte = tile[(morton_offset / 2) as usize];
            // Even offsets take the low nibble
            let i = if morton_offset % 2 != 0 {
                (byte & 0xF0) >> 4
            } else {
                byte & 0xF
            };
            let i = color::convert_4_to_8(i);
            Vec4::new(i, i, i, 255)
        }

        TextureFormat::A4 => {
            let morton_offset = morton_interleave(x, y);
            let byte = tile[(morton_offset / 2) as usize];
            let a = if morton_offset % 2 != 0 {
                (byte & 0xF0) >> 4
            } else {
                byte & 0xF
            };
            let a = color::convert_4_to_8(a);
            Vec4::new(0, 0, 0, a)
        }

        // ETC1 block decompression is not implemented. Texture content is
        // untrusted asset data, so degrade to a defined default instead
        // of aborting.
        TextureFormat::Etc1 | TextureFormat::Etc1A4 => {
            log::error!("TMU: unsupported texture format {:?}", info.format);
            Vec4::new(0, 0, 0, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(format: TextureFormat, stride: u32) -> TextureInfo {
        TextureInfo {
            physical_address: 0,
            width: 64,
            height: 64,
            stride,
            format,
        }
    }

    #[test]
    fn tile_sizes_are_exact() {
        let cases: &[(TextureFormat, u32)] = &[
            (TextureFormat::Rgba8, 256),
            (TextureFormat::Rgb8, 192),
            (TextureFormat::Rgb5A1, 128),
            (TextureFormat::Rgb565, 128),
            (TextureFormat::Rgba4, 128),
            (TextureFormat::Ia8, 128),
            (TextureFormat::Rg8, 128),
            (TextureFormat::I8, 64),
            (TextureFormat::A8, 64),
            (TextureFormat::Ia4, 64),
            (TextureFormat::I4, 32),
            (TextureFormat::A4, 32),
            (TextureFormat::Etc1, 32),
            (TextureFormat::Etc1A4, 64),
        ];
        for &(format, expected) in cases {
            assert_eq!(calculate_tile_size(format), expected, "{format:?}");
        }
    }

    #[test]
    fn morton_corner_offsets() {
        assert_eq!(morton_interleave(0, 0), 0);
        assert_eq!(morton_interleave(1, 0), 1);
        assert_eq!(morton_interleave(0, 1), 2);
        assert_eq!(morton_interleave(7, 7), 63);
        // Z-order, not row-major: (7,0) is not 7
        assert_eq!(morton_interleave(7, 0), 0x15);
    }

    #[test]
    fn i8_texel_addressing_follows_z_order() {
        // Tile where each byte equals its linear offset
        let mut tile = [0u8; 64];
        for (i, b) in tile.iter_mut().enumerate() {
            *b = i as u8;
        }
        let info = info(TextureFormat::I8, 64);
        let texel = lookup_texel_in_tile(&tile, 7, 7, &info);
        assert_eq!(texel, Vec4::new(63, 63, 63, 255));
        let texel = lookup_texel_in_tile(&tile, 2, 1, &info);
        // morton(2,1) = 4 + 2 = 6
        assert_eq!(texel.r(), 6);
        assert_eq!(texel.a(), 255);
    }

    #[test]
    fn i4_nibble_order() {
        // Byte 0 holds morton offsets 0 (low nibble) and 1 (high nibble)
        let mut tile = [0u8; 32];
        tile[0] = 0xA5;
        let info = info(TextureFormat::I4, 32);
        // (0,0) -> morton 0 -> low nibble 0x5
        let t = lookup_texel_in_tile(&tile, 0, 0, &info);
        assert_eq!(t.r(), color::convert_4_to_8(0x5));
        // (1,0) -> morton 1 -> high nibble 0xA
        let t = lookup_texel_in_tile(&tile, 1, 0, &info);
        assert_eq!(t.r(), color::convert_4_to_8(0xA));
    }

    #[test]
    fn a8_and_ia4_channel_fills() {
        let tile = [0x80u8; 64];
        let a8 = lookup_texel_in_tile(&tile, 0, 0, &info(TextureFormat::A8, 64));
        assert_eq!(a8, Vec4::new(0, 0, 0, 0x80));

        // IA4: high nibble intensity, low nibble alpha
        let tile = [0x3Cu8; 64];
        let ia4 = lookup_texel_in_tile(&tile, 0, 0, &info(TextureFormat::Ia4, 64));
        assert_eq!(ia4.r(), color::convert_4_to_8(0x3));
        assert_eq!(ia4.a(), color::convert_4_to_8(0xC));
    }

    #[test]
    fn stride_selects_tile_row() {
        // Two tile rows of I8, 16 texels wide (2 tiles per row).
        // stride = 2 tiles * 64 bytes.
        let stride = 2 * 64;
        let mut data = vec![0u8; stride * 2];
        // Tile (1, 1) filled with a marker
        let tile_offset = stride + 64;
        for b in &mut data[tile_offset..tile_offset + 64] {
            *b = 0xCD;
        }
        let info = TextureInfo {
            physical_address: 0,
            width: 16,
            height: 16,
            stride: stride as u32,
            format: TextureFormat::I8,
        };
        let texel = lookup_texture(&data, 9, 10, &info);
        assert_eq!(texel.r(), 0xCD);
        let texel = lookup_texture(&data, 1, 10, &info);
        assert_eq!(texel.r(), 0);
    }

    #[test]
    fn unsupported_format_returns_transparent_black() {
        let tile = [0xFFu8; 64];
        let t = lookup_texel_in_tile(&tile, 0, 0, &info(TextureFormat::Etc1, 32));
        assert_eq!(t, Vec4::new(0, 0, 0, 0));
    }
}
