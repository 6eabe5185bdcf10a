//! 12.4 fixed-point screen coordinates.
//!
//! The rasterizer works on unsigned 16-bit values with 4 fractional bits.
//! Comparisons operate on the raw encoding, which orders identically to
//! the represented value.

use super::float::Float24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Fix12P4(u16);

impl Fix12P4 {
    /// Mask selecting the 4 fractional bits.
    pub const FRAC_MASK: u16 = 0xF;
    /// Mask selecting the 12 integer bits. Together with `FRAC_MASK`
    /// this partitions the 16 bits exactly.
    pub const INT_MASK: u16 = !0xF;

    pub fn from_raw(val: u16) -> Self {
        Self(val)
    }

    /// Convert a screen-space float to fixed point, rounding to the
    /// nearest sub-pixel step. Rounding here is necessary to prevent
    /// garbage pixels at triangle borders.
    pub fn from_float24(flt: Float24) -> Self {
        Self((flt.to_f32() * 16.0).round() as u16)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    /// Integer pixel coordinate (truncating).
    pub fn floor(self) -> u16 {
        self.0 >> 4
    }
}
