//! Bit-exact codecs between canonical RGBA8 colors and the hardware's
//! packed pixel formats.
//!
//! Expansion from an N-bit channel to 8 bits replicates the high bits
//! into the low bits (`(v << k) | (v >> (n - k))`); the inverse truncates.
//! A round trip therefore reproduces the truncated-precision value, not
//! the original 8-bit value.
//!
//! Multi-byte packed formats are little-endian on the wire; RGBA8/RGB8/RG8
//! store channels in reversed byte order (A,B,G,R / B,G,R low-to-high).

use crate::math::{Vec2, Vec4};

/// Canonical 4x8-bit color.
pub type Rgba8 = Vec4<u8>;

/// Convert a 1-bit color component to 8 bit.
pub const fn convert_1_to_8(value: u8) -> u8 {
    value * 255
}

/// Convert a 4-bit color component to 8 bit.
pub const fn convert_4_to_8(value: u8) -> u8 {
    (value << 4) | value
}

/// Convert a 5-bit color component to 8 bit.
pub const fn convert_5_to_8(value: u8) -> u8 {
    (value << 3) | (value >> 2)
}

/// Convert a 6-bit color component to 8 bit.
pub const fn convert_6_to_8(value: u8) -> u8 {
    (value << 2) | (value >> 4)
}

/// Convert an 8-bit color component to 1 bit.
pub const fn convert_8_to_1(value: u8) -> u8 {
    value >> 7
}

/// Convert an 8-bit color component to 4 bit.
pub const fn convert_8_to_4(value: u8) -> u8 {
    value >> 4
}

/// Convert an 8-bit color component to 5 bit.
pub const fn convert_8_to_5(value: u8) -> u8 {
    value >> 3
}

/// Convert an 8-bit color component to 6 bit.
pub const fn convert_8_to_6(value: u8) -> u8 {
    value >> 2
}

/// Decode a color stored in RGBA8 format.
pub fn decode_rgba8(bytes: &[u8]) -> Rgba8 {
    Vec4::new(bytes[3], bytes[2], bytes[1], bytes[0])
}

/// Decode a color stored in RGB8 format.
pub fn decode_rgb8(bytes: &[u8]) -> Rgba8 {
    Vec4::new(bytes[2], bytes[1], bytes[0], 255)
}

/// Decode a color stored in RG8 (aka HILO8) format.
pub fn decode_rg8(bytes: &[u8]) -> Rgba8 {
    Vec4::new(bytes[1], bytes[0], 0, 255)
}

/// Decode a color stored in RGB565 format.
pub fn decode_rgb565(bytes: &[u8]) -> Rgba8 {
    let pixel = u16::from_le_bytes([bytes[0], bytes[1]]);
    Vec4::new(
        convert_5_to_8(((pixel >> 11) & 0x1F) as u8),
        convert_6_to_8(((pixel >> 5) & 0x3F) as u8),
        convert_5_to_8((pixel & 0x1F) as u8),
        255,
    )
}

/// Decode a color stored in RGB5A1 format.
pub fn decode_rgb5a1(bytes: &[u8]) -> Rgba8 {
    let pixel = u16::from_le_bytes([bytes[0], bytes[1]]);
    Vec4::new(
        convert_5_to_8(((pixel >> 11) & 0x1F) as u8),
        convert_5_to_8(((pixel >> 6) & 0x1F) as u8),
        convert_5_to_8(((pixel >> 1) & 0x1F) as u8),
        convert_1_to_8((pixel & 0x1) as u8),
    )
}

/// Decode a color stored in RGBA4 format.
pub fn decode_rgba4(bytes: &[u8]) -> Rgba8 {
    let pixel = u16::from_le_bytes([bytes[0], bytes[1]]);
    Vec4::new(
        convert_4_to_8(((pixel >> 12) & 0xF) as u8),
        convert_4_to_8(((pixel >> 8) & 0xF) as u8),
        convert_4_to_8(((pixel >> 4) & 0xF) as u8),
        convert_4_to_8((pixel & 0xF) as u8),
    )
}

/// Decode a depth value stored in D16 format.
pub fn decode_d16(bytes: &[u8]) -> u32 {
    u16::from_le_bytes([bytes[0], bytes[1]]) as u32
}

/// Decode a depth value stored in D24 format.
pub fn decode_d24(bytes: &[u8]) -> u32 {
    ((bytes[2] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[0] as u32
}

/// Decode a depth/stencil pair stored in D24S8 format.
pub fn decode_d24s8(bytes: &[u8]) -> Vec2<u32> {
    Vec2::new(decode_d24(bytes), bytes[3] as u32)
}

/// Decode a depth value stored in D24X8 format (8 bits ignored).
pub fn decode_d24x8(bytes: &[u8]) -> u32 {
    decode_d24(bytes)
}

/// Decode a stencil value stored in X24S8 format (24 bits ignored).
pub fn decode_x24s8(bytes: &[u8]) -> u8 {
    bytes[3]
}

/// Encode a color as RGBA8 format.
pub fn encode_rgba8(color: Rgba8, bytes: &mut [u8]) {
    bytes[3] = color.r();
    bytes[2] = color.g();
    bytes[1] = color.b();
    bytes[0] = color.a();
}

/// Encode a color as RGB8 format.
pub fn encode_rgb8(color: Rgba8, bytes: &mut [u8]) {
    bytes[2] = color.r();
    bytes[1] = color.g();
    bytes[0] = color.b();
}

/// Encode a color as RG8 (aka HILO8) format.
pub fn encode_rg8(color: Rgba8, bytes: &mut [u8]) {
    bytes[1] = color.r();
    bytes[0] = color.g();
}

/// Encode a color as RGB565 format.
pub fn encode_rgb565(color: Rgba8, bytes: &mut [u8]) {
    let data = ((convert_8_to_5(color.r()) as u16) << 11)
        | ((convert_8_to_6(color.g()) as u16) << 5)
        | convert_8_to_5(color.b()) as u16;
    bytes[..2].copy_from_slice(&data.to_le_bytes());
}

/// Encode a color as RGB5A1 format.
pub fn encode_rgb5a1(color: Rgba8, bytes: &mut [u8]) {
    let data = ((convert_8_to_5(color.r()) as u16) << 11)
        | ((convert_8_to_5(color.g()) as u16) << 6)
        | ((convert_8_to_5(color.b()) as u16) << 1)
        | convert_8_to_1(color.a()) as u16;
    bytes[..2].copy_from_slice(&data.to_le_bytes());
}

/// Encode a color as RGBA4 format.
pub fn encode_rgba4(color: Rgba8, bytes: &mut [u8]) {
    let data = ((convert_8_to_4(color.r()) as u16) << 12)
        | ((convert_8_to_4(color.g()) as u16) << 8)
        | ((convert_8_to_4(color.b()) as u16) << 4)
        | convert_8_to_4(color.a()) as u16;
    bytes[..2].copy_from_slice(&data.to_le_bytes());
}

/// Encode a 16-bit depth value as D16 format.
pub fn encode_d16(value: u32, bytes: &mut [u8]) {
    bytes[..2].copy_from_slice(&(value as u16).to_le_bytes());
}

/// Encode a 24-bit depth value as D24 format.
pub fn encode_d24(value: u32, bytes: &mut [u8]) {
    bytes[0] = value as u8;
    bytes[1] = (value >> 8) as u8;
    bytes[2] = (value >> 16) as u8;
}

/// Encode a 24-bit depth and 8-bit stencil value as D24S8 format.
pub fn encode_d24s8(depth: u32, stencil: u8, bytes: &mut [u8]) {
    encode_d24(depth, bytes);
    bytes[3] = stencil;
}

/// Encode a 24-bit depth value as D24X8 format (8 bits unused).
/// The unused byte is not modified.
pub fn encode_d24x8(depth: u32, bytes: &mut [u8]) {
    encode_d24(depth, bytes);
}

/// Encode an 8-bit stencil value as X24S8 format (24 bits unused).
/// The unused bytes are not modified.
pub fn encode_x24s8(stencil: u8, bytes: &mut [u8]) {
    bytes[3] = stencil;
}
