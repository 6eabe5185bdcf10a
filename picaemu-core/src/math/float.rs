//! Reduced-precision float formats used by the PICA shader pipeline.
//!
//! The hardware computes on floats with a smaller mantissa/exponent than
//! IEEE 754 single precision. `Float<M, E>` converts between the packed
//! `M`-bit-mantissa / `E`-bit-exponent / 1-bit-sign encoding and a regular
//! `f32` by re-biasing the exponent and shifting the mantissa into the
//! standard 23-bit field.
//!
//! Packed layout, LSB first: `M` mantissa bits, `E` exponent bits, sign bit.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// A float value in one of the hardware's reduced-precision formats.
///
/// Stored internally as a regular `f32` for convenience; the packed
/// encoding only matters at the raw-word boundary (`from_raw`/`to_raw`).
#[derive(Debug, Clone, Copy, Default)]
#[repr(transparent)]
pub struct Float<const M: u32, const E: u32> {
    value: f32,
}

/// 24-bit float (1.7.16), the PICA's main intermediate format.
pub type Float24 = Float<16, 7>;
/// 20-bit float (1.7.12), used by fixed-point vertex attribute loads.
pub type Float20 = Float<12, 7>;
/// 16-bit float (1.5.10), standard half precision layout.
pub type Float16 = Float<10, 5>;

impl<const M: u32, const E: u32> Float<M, E> {
    const WIDTH: u32 = M + E + 1;
    /// Difference between the IEEE 754 single bias (127) and this
    /// format's bias (2^(E-1) - 1).
    const BIAS: i32 = 128 - (1 << (E - 1));
    const EXPONENT_MASK: u32 = (1 << E) - 1;
    const MANTISSA_MASK: u32 = (1 << M) - 1;

    pub fn from_f32(val: f32) -> Self {
        Self { value: val }
    }

    /// Decode the packed hardware encoding.
    ///
    /// A word whose mantissa and exponent bits are all zero decodes to
    /// signed zero regardless of the implied bias: the hardware flushes
    /// denormals to zero.
    pub fn from_raw(hex: u32) -> Self {
        let exponent = (hex >> M) & Self::EXPONENT_MASK;
        let mantissa = hex & Self::MANTISSA_MASK;
        let sign = ((hex >> (E + M)) & 1) << 31;

        let bits = if hex & ((1 << (Self::WIDTH - 1)) - 1) != 0 {
            let exponent = if exponent == Self::EXPONENT_MASK {
                // All-ones exponent maps to inf/NaN
                255
            } else {
                (exponent as i32 + Self::BIAS) as u32
            };
            sign | (mantissa << (23 - M)) | (exponent << 23)
        } else {
            sign
        };

        Self {
            value: f32::from_bits(bits),
        }
    }

    /// Encode into the packed hardware representation, truncating the
    /// mantissa. Exact inverse of `from_raw` for representable values.
    pub fn to_raw(self) -> u32 {
        let bits = self.value.to_bits();
        let sign = (bits >> 31) << (E + M);
        let exponent = ((bits >> 23) & 0xFF) as i32;
        let mantissa = (bits >> (23 - M)) & Self::MANTISSA_MASK;

        if exponent == 255 {
            // Inf/NaN keep the all-ones exponent
            return sign | (Self::EXPONENT_MASK << M) | mantissa;
        }

        let reduced = exponent - Self::BIAS;
        if reduced <= 0 {
            // Underflow (and zero) flush to signed zero
            sign
        } else if reduced as u32 >= Self::EXPONENT_MASK {
            // Overflow saturates to infinity
            sign | (Self::EXPONENT_MASK << M)
        } else {
            sign | ((reduced as u32) << M) | mantissa
        }
    }

    pub fn zero() -> Self {
        Self::from_f32(0.0)
    }

    pub fn one() -> Self {
        Self::from_f32(1.0)
    }

    pub fn to_f32(self) -> f32 {
        self.value
    }

    pub fn is_nan(self) -> bool {
        self.value.is_nan()
    }
}

impl<const M: u32, const E: u32> Mul for Float<M, E> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut result = self.value * rhs.value;
        // PICA gives 0 instead of NaN when multiplying inf by a finite
        // value. NaN operands still propagate.
        if result.is_nan() && !self.value.is_nan() && !rhs.value.is_nan() {
            result = 0.0;
        }
        Self::from_f32(result)
    }
}

impl<const M: u32, const E: u32> Add for Float<M, E> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_f32(self.value + rhs.value)
    }
}

impl<const M: u32, const E: u32> Sub for Float<M, E> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_f32(self.value - rhs.value)
    }
}

impl<const M: u32, const E: u32> Div for Float<M, E> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self::from_f32(self.value / rhs.value)
    }
}

impl<const M: u32, const E: u32> Neg for Float<M, E> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_f32(-self.value)
    }
}

impl<const M: u32, const E: u32> AddAssign for Float<M, E> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const M: u32, const E: u32> SubAssign for Float<M, E> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<const M: u32, const E: u32> MulAssign for Float<M, E> {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<const M: u32, const E: u32> DivAssign for Float<M, E> {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl<const M: u32, const E: u32> PartialEq for Float<M, E> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<const M: u32, const E: u32> PartialOrd for Float<M, E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f24(val: f32) -> Float24 {
        Float24::from_f32(val)
    }

    #[test]
    fn raw_round_trip() {
        // Assorted representable float24 words: 1.0, -2.5, small, large
        let words = [
            0x3F_0000, // 1.0  (exp 63, mantissa 0)
            0xC0_4000, // -2.5
            0x01_0000, // tiny positive
            0x7E_FFFF, // just below the inf threshold
            0x00_0000, // +0
            0x80_0000, // -0
        ];
        for &w in &words {
            assert_eq!(Float24::from_raw(w).to_raw(), w, "word {w:#08x}");
        }
    }

    #[test]
    fn known_decodings() {
        assert_eq!(Float24::from_raw(0x3F0000).to_f32(), 1.0);
        assert_eq!(Float24::from_raw(0x400000).to_f32(), 2.0);
        assert_eq!(Float24::from_raw(0x3E0000).to_f32(), 0.5);
        assert_eq!(f24(3.25).to_raw(), Float24::from_f32(3.25).to_raw());
        assert_eq!(Float24::from_raw(f24(3.25).to_raw()).to_f32(), 3.25);
    }

    #[test]
    fn denormal_decodes_to_signed_zero() {
        // Zero mantissa+exponent, sign set: must be -0.0, not a denormal
        let neg = Float24::from_raw(1 << 23);
        assert_eq!(neg.to_f32(), 0.0);
        assert!(neg.to_f32().is_sign_negative());

        let pos = Float24::from_raw(0);
        assert_eq!(pos.to_f32(), 0.0);
        assert!(pos.to_f32().is_sign_positive());
    }

    #[test]
    fn underflow_encodes_to_zero() {
        // Values below the format's smallest normal flush on encode
        let tiny = Float24::from_f32(1.0e-30);
        assert_eq!(tiny.to_raw(), 0);
    }

    #[test]
    fn mul_inf_by_finite_is_zero() {
        let inf = f24(f32::INFINITY);
        assert_eq!((inf * f24(0.0)).to_f32(), 0.0);
        assert_eq!((f24(0.0) * inf).to_f32(), 0.0);
        // Plain finite multiplies are unaffected
        assert_eq!((f24(2.0) * f24(3.0)).to_f32(), 6.0);
        // Inf * nonzero finite stays inf on real hardware only for the
        // 0 * inf case; anything that produces NaN without a NaN input
        // becomes 0. inf * 2.0 is inf, not NaN, so it passes through.
        assert_eq!((inf * f24(2.0)).to_f32(), f32::INFINITY);
    }

    #[test]
    fn mul_nan_propagates() {
        let nan = f24(f32::NAN);
        assert!((nan * f24(0.0)).is_nan());
        assert!((f24(f32::INFINITY) * nan).is_nan());
    }

    #[test]
    fn comparison_nan_ordering() {
        let nan = f24(f32::NAN);
        // The exact comparison forms the interpreter relies on
        assert!(!(f24(1.0) > nan));
        assert!(!(nan > f24(1.0)));
        assert!(!(nan < f24(1.0)));
    }

    #[test]
    fn float16_and_float20_decode() {
        // 1.0 in each format: exponent = bias, mantissa = 0
        assert_eq!(Float16::from_raw(0x3C00).to_f32(), 1.0);
        assert_eq!(Float20::from_raw(0x3F000).to_f32(), 1.0);
    }
}
