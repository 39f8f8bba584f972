//! Single lane backend on plain scalars.

use std::num::Wrapping;

use assert2::debug_assert;

use super::{SimdFloat, SimdInt, SimdMask};

impl SimdMask for bool {
    const LANES: usize = 1;

    #[inline(always)]
    fn splat(value: bool) -> Self {
        value
    }

    #[inline(always)]
    fn from_fn(mut f: impl FnMut(usize) -> bool) -> Self {
        f(0)
    }

    #[inline(always)]
    fn extract(self, i: usize) -> bool {
        debug_assert!(i == 0);
        self
    }

    #[inline(always)]
    fn bitmask(self) -> u64 {
        self as u64
    }

    #[inline(always)]
    fn all(self) -> bool {
        self
    }

    #[inline(always)]
    fn any(self) -> bool {
        self
    }
}

impl SimdInt for Wrapping<i32> {
    const LANES: usize = 1;
    type Mask = bool;

    #[inline(always)]
    fn splat(value: i32) -> Self {
        Wrapping(value)
    }

    #[inline(always)]
    fn extract(self, i: usize) -> i32 {
        debug_assert!(i == 0);
        self.0
    }

    #[inline(always)]
    fn replace(&mut self, i: usize, value: i32) {
        debug_assert!(i == 0);
        self.0 = value;
    }

    #[inline(always)]
    fn simd_eq(self, other: Self) -> bool {
        self == other
    }

    #[inline(always)]
    fn simd_lt(self, other: Self) -> bool {
        self < other
    }

    #[inline(always)]
    fn simd_gt(self, other: Self) -> bool {
        self > other
    }

    #[inline(always)]
    fn select(mask: bool, a: Self, b: Self) -> Self {
        if mask { a } else { b }
    }
}

impl SimdFloat for f32 {
    const LANES: usize = 1;
    type Mask = bool;
    type Int = Wrapping<i32>;
    type Array = [f32; 1];

    #[inline(always)]
    fn splat(value: f32) -> Self {
        value
    }

    #[inline(always)]
    fn from_array(values: [f32; 1]) -> Self {
        values[0]
    }

    #[inline(always)]
    fn to_array(self) -> [f32; 1] {
        [self]
    }

    #[inline(always)]
    fn extract(self, i: usize) -> f32 {
        debug_assert!(i == 0);
        self
    }

    #[inline(always)]
    fn replace(&mut self, i: usize, value: f32) {
        debug_assert!(i == 0);
        *self = value;
    }

    #[inline(always)]
    fn simd_eq(self, other: Self) -> bool {
        self == other
    }

    #[inline(always)]
    fn simd_lt(self, other: Self) -> bool {
        self < other
    }

    #[inline(always)]
    fn simd_le(self, other: Self) -> bool {
        self <= other
    }

    #[inline(always)]
    fn select(mask: bool, a: Self, b: Self) -> Self {
        if mask { a } else { b }
    }

    #[inline(always)]
    fn to_int_bits(self) -> Wrapping<i32> {
        Wrapping(f32::to_bits(self) as i32)
    }

    #[inline(always)]
    fn from_int_bits(bits: Wrapping<i32>) -> Self {
        f32::from_bits(bits.0 as u32)
    }

    #[inline(always)]
    fn to_int_trunc(self) -> Wrapping<i32> {
        Wrapping(self as i32)
    }

    #[inline(always)]
    fn from_int(value: Wrapping<i32>) -> Self {
        value.0 as f32
    }

    #[inline(always)]
    fn simd_min(self, other: Self) -> Self {
        f32::min(self, other)
    }

    #[inline(always)]
    fn simd_max(self, other: Self) -> Self {
        f32::max(self, other)
    }

    #[inline(always)]
    fn simd_abs(self) -> Self {
        f32::abs(self)
    }

    #[inline(always)]
    fn simd_floor(self) -> Self {
        f32::floor(self)
    }

    #[inline(always)]
    fn simd_ceil(self) -> Self {
        f32::ceil(self)
    }

    #[inline(always)]
    fn simd_sqrt(self) -> Self {
        f32::sqrt(self)
    }

    /// Unfused, a libm `fmaf` call would be far slower than the vector backends.
    #[inline(always)]
    fn mul_add(self, a: Self, b: Self) -> Self {
        self * a + b
    }

    /// Exponent negation by integer subtraction, about 12% worst case relative error.
    /// Zeros, subnormals and infinities map to the IEEE results like `rcpps` does.
    #[inline(always)]
    fn approx_rcp(self) -> Self {
        const MAGIC: u32 = 0x7ef3_11c7;
        let bits = f32::abs(self).to_bits();
        if self.is_nan() {
            return self;
        }
        let estimate = if bits < f32::MIN_POSITIVE.to_bits() {
            f32::INFINITY
        } else if bits >= MAGIC {
            // Reciprocal is subnormal or zero, which the hardware flushes.
            0.0
        } else {
            f32::from_bits(MAGIC - bits)
        };
        estimate.copysign(self)
    }

    /// Exponent halving by integer shift, about 0.2% worst case relative error.
    #[inline(always)]
    fn approx_rsqrt(self) -> Self {
        if self == 0.0 {
            f32::INFINITY.copysign(self)
        } else if self == f32::INFINITY {
            0.0
        } else if self > 0.0 {
            f32::from_bits(0x5f37_5a86u32 - (f32::to_bits(self) >> 1))
        } else {
            f32::NAN
        }
    }

    #[inline(always)]
    fn reduce_min(self) -> f32 {
        self
    }

    #[inline(always)]
    fn reduce_max(self) -> f32 {
        self
    }
}
