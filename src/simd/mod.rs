//! Lane-width-generic numeric layer.
//!
//! Traversal code is written once against [`SimdFloat`], [`SimdMask`] and [`SimdInt`] and
//! runs either on a single ray (`f32`, `bool`, `Wrapping<i32>`) or on a packet of rays
//! advancing in lockstep ([`Float4`], [`Float8`], [`Float16`] and their masks and integers).
//!
//! Data dependent branching inside a packet is expressed with masks and [`SimdFloat::select`]
//! rather than `if`.

mod pair;
mod scalar;
mod wide_lanes;

use std::{
    fmt::Debug,
    ops::{
        Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Div, DivAssign, Mul,
        MulAssign, Neg, Not, Sub, SubAssign,
    },
};

use assert2::debug_assert;
use bytemuck::Pod;
use num_traits::{One, Zero};

pub use pair::Pair;
pub use wide_lanes::{Float4, Float8, Int4, Int8, Mask4, Mask8};

pub type Float16 = Pair<Float8>;
pub type Int16 = Pair<Int8>;
pub type Mask16 = Pair<Mask8>;

#[cfg(not(any(feature = "lanes-4", feature = "lanes-8", feature = "lanes-16")))]
compile_error!("enable one of the `lanes-4`, `lanes-8` or `lanes-16` features");

#[cfg(all(feature = "strict-isa", feature = "lanes-16", not(target_feature = "avx512f")))]
compile_error!("`lanes-16` with `strict-isa` requires a target with avx512f");

#[cfg(all(
    feature = "strict-isa",
    feature = "lanes-8",
    not(feature = "lanes-16"),
    not(target_feature = "avx")
))]
compile_error!("`lanes-8` with `strict-isa` requires a target with avx");

#[cfg(all(
    feature = "strict-isa",
    feature = "lanes-4",
    not(any(feature = "lanes-8", feature = "lanes-16")),
    not(any(
        target_feature = "sse2",
        target_feature = "neon",
        target_feature = "simd128"
    ))
))]
compile_error!("`lanes-4` with `strict-isa` requires sse2, neon or simd128");

/// Lane type selected by the `lanes-*` features. The widest enabled width wins.
#[cfg(feature = "lanes-16")]
pub type Float = Float16;
#[cfg(feature = "lanes-16")]
pub type Mask = Mask16;
#[cfg(feature = "lanes-16")]
pub type Int = Int16;

#[cfg(all(feature = "lanes-8", not(feature = "lanes-16")))]
pub type Float = Float8;
#[cfg(all(feature = "lanes-8", not(feature = "lanes-16")))]
pub type Mask = Mask8;
#[cfg(all(feature = "lanes-8", not(feature = "lanes-16")))]
pub type Int = Int8;

#[cfg(all(feature = "lanes-4", not(any(feature = "lanes-8", feature = "lanes-16"))))]
pub type Float = Float4;
#[cfg(all(feature = "lanes-4", not(any(feature = "lanes-8", feature = "lanes-16"))))]
pub type Mask = Mask4;
#[cfg(all(feature = "lanes-4", not(any(feature = "lanes-8", feature = "lanes-16"))))]
pub type Int = Int4;

/// Storage aligned for full-width loads and streaming stores of any backend.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(C, align(64))]
pub struct Aligned<A>(pub A);

/// Per-lane predicate.
pub trait SimdMask:
    Copy
    + Debug
    + PartialEq
    + 'static
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + BitAndAssign
    + BitOrAssign
{
    const LANES: usize;

    fn splat(value: bool) -> Self;
    fn from_fn(f: impl FnMut(usize) -> bool) -> Self;
    fn extract(self, i: usize) -> bool;

    /// Bit `i` of the result is set iff lane `i` is set.
    fn bitmask(self) -> u64;

    fn all(self) -> bool {
        self.bitmask() == u64::MAX >> (u64::BITS as usize - Self::LANES)
    }

    fn any(self) -> bool {
        self.bitmask() != 0
    }

    fn none(self) -> bool {
        !self.any()
    }

    /// Per-lane `if self { a } else { b }`.
    #[inline(always)]
    fn select<T: SimdFloat<Mask = Self>>(self, a: T, b: T) -> T {
        T::select(self, a, b)
    }

    /// Iterates indices of the set lanes, lowest first.
    fn set_lanes(self) -> SetLanes {
        SetLanes {
            bits: self.bitmask(),
        }
    }
}

/// 32-bit integer lanes. Arithmetic wraps on every backend.
pub trait SimdInt:
    Copy
    + Debug
    + PartialEq
    + Default
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
{
    const LANES: usize;
    type Mask: SimdMask;

    fn splat(value: i32) -> Self;
    fn extract(self, i: usize) -> i32;
    fn replace(&mut self, i: usize, value: i32);

    fn from_fn(mut f: impl FnMut(usize) -> i32) -> Self {
        let mut result = Self::default();
        for i in 0..Self::LANES {
            result.replace(i, f(i));
        }
        result
    }

    fn simd_eq(self, other: Self) -> Self::Mask;
    fn simd_lt(self, other: Self) -> Self::Mask;
    fn simd_gt(self, other: Self) -> Self::Mask;

    fn simd_ne(self, other: Self) -> Self::Mask {
        !self.simd_eq(other)
    }

    fn select(mask: Self::Mask, a: Self, b: Self) -> Self;

    fn simd_min(self, other: Self) -> Self {
        Self::select(self.simd_lt(other), self, other)
    }

    fn simd_max(self, other: Self) -> Self {
        Self::select(self.simd_gt(other), self, other)
    }
}

/// 32-bit floating point lanes.
///
/// Every operation is total: no panics, NaN propagates per IEEE-754 except where the
/// classification functions replace it with bit tests.
pub trait SimdFloat:
    Copy
    + Debug
    + PartialEq
    + Default
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Zero
    + One
{
    const LANES: usize;
    type Mask: SimdMask;
    type Int: SimdInt<Mask = Self::Mask>;
    /// Memory layout of one value, `LANES` consecutive `f32`s.
    type Array: Copy + Default + Debug + Pod;

    fn splat(value: f32) -> Self;
    fn from_array(values: Self::Array) -> Self;
    fn to_array(self) -> Self::Array;
    fn extract(self, i: usize) -> f32;
    fn replace(&mut self, i: usize, value: f32);

    fn from_fn(mut f: impl FnMut(usize) -> f32) -> Self {
        let mut result = Self::default();
        for i in 0..Self::LANES {
            result.replace(i, f(i));
        }
        result
    }

    /// Lane access with the index checked at compile time.
    #[inline(always)]
    fn get<const I: usize>(self) -> f32 {
        const { assert!(I < Self::LANES, "lane index out of range") };
        self.extract(I)
    }

    #[inline(always)]
    fn set<const I: usize>(&mut self, value: f32) {
        const { assert!(I < Self::LANES, "lane index out of range") };
        self.replace(I, value)
    }

    #[inline(always)]
    fn load(src: &Aligned<Self::Array>) -> Self {
        Self::from_array(src.0)
    }

    /// Loads the first `LANES` values of `src`.
    ///
    /// # Panics
    /// If `src` is shorter than `LANES`.
    fn load_unaligned(src: &[f32]) -> Self {
        let mut values = Self::Array::default();
        as_floats_mut(&mut values).copy_from_slice(&src[..Self::LANES]);
        Self::from_array(values)
    }

    #[inline(always)]
    fn store(self, dst: &mut Aligned<Self::Array>) {
        dst.0 = self.to_array();
    }

    /// Stores into the first `LANES` values of `dst`.
    ///
    /// # Panics
    /// If `dst` is shorter than `LANES`.
    fn store_unaligned(self, dst: &mut [f32]) {
        let values = self.to_array();
        dst[..Self::LANES].copy_from_slice(as_floats(&values));
    }

    /// Store bypassing the cache hierarchy where the target supports it.
    fn store_non_temporal(self, dst: &mut Aligned<Self::Array>) {
        let values = self.to_array();
        stream(as_floats_mut(&mut dst.0), as_floats(&values));
    }

    fn simd_eq(self, other: Self) -> Self::Mask;
    fn simd_lt(self, other: Self) -> Self::Mask;
    fn simd_le(self, other: Self) -> Self::Mask;

    fn simd_ne(self, other: Self) -> Self::Mask {
        !self.simd_eq(other)
    }

    fn simd_gt(self, other: Self) -> Self::Mask {
        other.simd_lt(self)
    }

    fn simd_ge(self, other: Self) -> Self::Mask {
        other.simd_le(self)
    }

    /// Per-lane `if mask { a } else { b }`.
    fn select(mask: Self::Mask, a: Self, b: Self) -> Self;

    fn bit_and(self, other: Self) -> Self {
        Self::from_int_bits(self.to_int_bits() & other.to_int_bits())
    }

    fn bit_or(self, other: Self) -> Self {
        Self::from_int_bits(self.to_int_bits() | other.to_int_bits())
    }

    fn bit_xor(self, other: Self) -> Self {
        Self::from_int_bits(self.to_int_bits() ^ other.to_int_bits())
    }

    /// Bit reinterpretation.
    fn to_int_bits(self) -> Self::Int;
    fn from_int_bits(bits: Self::Int) -> Self;

    /// Value conversion rounding toward zero.
    fn to_int_trunc(self) -> Self::Int;
    fn from_int(value: Self::Int) -> Self;

    /// Lane-wise minimum; if one operand is NaN the other one is returned.
    fn simd_min(self, other: Self) -> Self;
    fn simd_max(self, other: Self) -> Self;
    fn simd_abs(self) -> Self;

    /// Clamps to `[0, 1]`. NaN saturates to one.
    fn saturate(self) -> Self {
        self.simd_min(Self::one()).simd_max(Self::zero())
    }

    /// Rounds to nearest, ties to even, matching the hardware rounding instructions.
    fn simd_round(self) -> Self {
        round_by_bias(self)
    }

    fn simd_floor(self) -> Self;
    fn simd_ceil(self) -> Self;
    fn simd_sqrt(self) -> Self;

    /// `self * a + b`, fused where the backend has an instruction for it.
    fn mul_add(self, a: Self, b: Self) -> Self;

    /// Raw reciprocal estimate, no refinement.
    fn approx_rcp(self) -> Self;

    /// Raw reciprocal square root estimate, no refinement.
    fn approx_rsqrt(self) -> Self;

    /// Reciprocal with `N` Newton-Raphson refinement steps on top of [`Self::approx_rcp`].
    /// Zeros and infinities keep the special value of the estimate.
    #[inline(always)]
    fn rcp<const N: u32>(self) -> Self {
        let two = Self::splat(2.0);
        let estimate = self.approx_rcp();
        let mut x = estimate;
        for _ in 0..N {
            x = x * (two - self * x);
        }
        Self::select(x.simd_is_nan(), estimate, x)
    }

    /// Reciprocal square root with `N` Newton-Raphson refinement steps on top of
    /// [`Self::approx_rsqrt`].
    #[inline(always)]
    fn rsqrt<const N: u32>(self) -> Self {
        let half = Self::splat(0.5);
        let three_halves = Self::splat(1.5);
        let estimate = self.approx_rsqrt();
        let mut x = estimate;
        for _ in 0..N {
            x = x * (three_halves - half * self * x * x);
        }
        Self::select(x.simd_is_nan(), estimate, x)
    }

    fn simd_is_nan(self) -> Self::Mask {
        self.simd_ne(self)
    }

    fn simd_is_inf(self) -> Self::Mask {
        (self.to_int_bits() & Self::Int::splat(!SIGN_BIT)).simd_eq(Self::Int::splat(EXPONENT_BITS))
    }

    fn simd_is_finite(self) -> Self::Mask {
        let exponent = Self::Int::splat(EXPONENT_BITS);
        (self.to_int_bits() & exponent).simd_ne(exponent)
    }

    fn reduce_min(self) -> f32 {
        as_floats(&self.to_array())
            .iter()
            .copied()
            .fold(f32::INFINITY, f32::min)
    }

    fn reduce_max(self) -> f32 {
        as_floats(&self.to_array())
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

const SIGN_BIT: i32 = i32::MIN;
const EXPONENT_BITS: i32 = 0x7f80_0000;
/// Bit pattern of 2^23, the smallest float without fractional mantissa bits.
const TWO_POW_23_BITS: i32 = 0x4b00_0000;

/// Round to nearest even by mantissa cancellation: adding 2^23 with the sign of the input
/// pushes all fractional bits out of the mantissa, subtracting it again leaves the rounded
/// value.
///
/// Two additions to the bare technique: inputs with magnitude of at least 2^23 are already
/// integral and pass through untouched (adding the bias would round them to a multiple
/// of two), and the input sign is reapplied so that values rounding to zero keep it
/// (`-0.3` becomes `-0.0` like the hardware instructions produce).
pub fn round_by_bias<T: SimdFloat>(value: T) -> T {
    let sign = value.to_int_bits() & T::Int::splat(SIGN_BIT);
    let bias = T::from_int_bits(sign | T::Int::splat(TWO_POW_23_BITS));
    let rounded = (value + bias) - bias;
    let rounded = T::from_int_bits(rounded.to_int_bits() | sign);

    let has_fraction = value.simd_abs().simd_lt(T::from_int_bits(T::Int::splat(TWO_POW_23_BITS)));
    T::select(has_fraction, rounded, value)
}

/// Floor built on [`round_by_bias`]: lanes that rounded up step down by one.
pub fn floor_by_bias<T: SimdFloat>(value: T) -> T {
    let rounded = round_by_bias(value);
    rounded - T::select(rounded.simd_gt(value), T::one(), T::zero())
}

/// Ceil built on [`round_by_bias`]: lanes that rounded down step up by one. The input sign
/// is reapplied so that `-0.7` becomes `-0.0`.
pub fn ceil_by_bias<T: SimdFloat>(value: T) -> T {
    let rounded = round_by_bias(value);
    let stepped = rounded + T::select(rounded.simd_lt(value), T::one(), T::zero());
    T::from_int_bits(stepped.to_int_bits() | (value.to_int_bits() & T::Int::splat(SIGN_BIT)))
}

/// Iterator over set lanes of a mask.
#[derive(Copy, Clone, Debug)]
pub struct SetLanes {
    bits: u64,
}

impl Iterator for SetLanes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.bits == 0 {
            return None;
        }
        let lane = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some(lane)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.bits.count_ones() as usize;
        (count, Some(count))
    }
}

impl ExactSizeIterator for SetLanes {}

fn as_floats<A: Pod>(values: &A) -> &[f32] {
    bytemuck::cast_slice(std::slice::from_ref(values))
}

fn as_floats_mut<A: Pod>(values: &mut A) -> &mut [f32] {
    bytemuck::cast_slice_mut(std::slice::from_mut(values))
}

/// Copies `src` into `dst` with streaming stores.
/// `dst` must start 16-byte aligned, which [`Aligned`] guarantees.
fn stream(dst: &mut [f32], src: &[f32]) {
    debug_assert!(dst.len() == src.len());

    #[cfg(target_arch = "x86_64")]
    {
        use std::arch::x86_64::{_mm_loadu_ps, _mm_sfence, _mm_stream_ps};

        debug_assert!(dst.as_ptr().align_offset(16) == 0 || dst.len() < 4);

        let mut dst_chunks = dst.chunks_exact_mut(4);
        let mut src_chunks = src.chunks_exact(4);
        for (d, s) in (&mut dst_chunks).zip(&mut src_chunks) {
            // SAFETY: sse is part of the x86_64 baseline, both chunks hold exactly four
            // floats and `d` is 16-byte aligned because it starts at a multiple of 16 bytes
            // from a 64-byte aligned base.
            unsafe { _mm_stream_ps(d.as_mut_ptr(), _mm_loadu_ps(s.as_ptr())) };
        }
        dst_chunks
            .into_remainder()
            .copy_from_slice(src_chunks.remainder());

        // SAFETY: sse is part of the x86_64 baseline.
        #[allow(unused_unsafe)]
        unsafe {
            _mm_sfence()
        };
    }

    #[cfg(not(target_arch = "x86_64"))]
    dst.copy_from_slice(src);
}

#[cfg(test)]
pub mod test {
    use super::*;
    use assert2::assert;
    use proptest::prelude::*;
    use test_case::test_case;
    use test_strategy::proptest;

    /// Values around the interesting rounding points, including exact ties.
    pub fn rounding_input() -> BoxedStrategy<f32> {
        prop_oneof![
            (-1000i32..1000).prop_map(|n| n as f32 * 0.5),
            (-1000i32..1000).prop_map(|n| n as f32 * 0.25 + 0.01),
            -1e9f32..1e9f32,
            Just(-0.3f32),
            Just(-0.0f32),
            Just(-0.7f32),
            Just(3e9f32),
            Just(-3e9f32),
            Just(8_388_607.5f32),
            Just(16_777_217.0f32),
        ]
        .boxed()
    }

    fn check_round<T: SimdFloat>(v: f32) {
        let rounded = T::splat(v).simd_round();
        for i in 0..T::LANES {
            assert!(rounded.extract(i).to_bits() == v.round_ties_even().to_bits(), "{v}");
        }
    }

    #[proptest]
    fn round_matches_ties_even_bit_for_bit(#[strategy(rounding_input())] v: f32) {
        check_round::<f32>(v);
        check_round::<Float4>(v);
        check_round::<Float8>(v);
        check_round::<Float16>(v);
    }

    #[proptest]
    fn bias_rounding_matches_ties_even(#[strategy(rounding_input())] v: f32) {
        let rounded = round_by_bias(Float8::splat(v));
        assert!(rounded.get::<3>().to_bits() == v.round_ties_even().to_bits());
    }

    #[test_case(0.5, 0.0 ; "half_down_to_even")]
    #[test_case(1.5, 2.0 ; "half_up_to_even")]
    #[test_case(-2.5, -2.0 ; "negative_half")]
    #[test_case(-0.3, -0.0 ; "negative_to_negative_zero")]
    #[test_case(8_388_609.0, 8_388_609.0 ; "above_bias_untouched")]
    fn bias_rounding_cases(input: f32, expected: f32) {
        let rounded = round_by_bias(input);
        assert!(rounded.to_bits() == expected.to_bits());
    }

    #[test]
    fn bias_rounding_keeps_nan_and_infinities() {
        assert!(round_by_bias(f32::NAN).is_nan());
        assert!(round_by_bias(f32::INFINITY) == f32::INFINITY);
        assert!(round_by_bias(f32::NEG_INFINITY) == f32::NEG_INFINITY);
    }

    fn check_floor_ceil<T: SimdFloat>(v: f32) {
        let x = T::splat(v);
        let (floor, ceil) = (x.simd_floor(), x.simd_ceil());
        for i in 0..T::LANES {
            assert!(floor.extract(i).to_bits() == v.floor().to_bits(), "{v}");
            assert!(ceil.extract(i).to_bits() == v.ceil().to_bits(), "{v}");
        }
    }

    #[proptest]
    fn floor_ceil_match_scalar_bit_for_bit(#[strategy(rounding_input())] v: f32) {
        check_floor_ceil::<f32>(v);
        check_floor_ceil::<Float4>(v);
        check_floor_ceil::<Float8>(v);
        check_floor_ceil::<Float16>(v);
    }

    #[proptest]
    fn bias_floor_ceil_match_scalar(#[strategy(rounding_input())] v: f32) {
        let floor = floor_by_bias(Float4::splat(v));
        let ceil = ceil_by_bias(Float4::splat(v));
        for i in 0..4 {
            assert!(floor.extract(i).to_bits() == v.floor().to_bits());
            assert!(ceil.extract(i).to_bits() == v.ceil().to_bits());
        }
    }

    #[test_case(-0.3, -1.0, -0.0 ; "negative_fraction")]
    #[test_case(-0.0, -0.0, -0.0 ; "negative_zero")]
    #[test_case(0.7, 0.0, 1.0 ; "positive_fraction")]
    #[test_case(-2.5, -3.0, -2.0 ; "negative_tie")]
    #[test_case(3e9, 3e9, 3e9 ; "integral_above_bias")]
    fn bias_floor_ceil_cases(input: f32, floor: f32, ceil: f32) {
        assert!(floor_by_bias(input).to_bits() == floor.to_bits());
        assert!(ceil_by_bias(input).to_bits() == ceil.to_bits());
    }

    #[test]
    fn bias_floor_ceil_keep_nan_and_infinities() {
        assert!(floor_by_bias(f32::NAN).is_nan());
        assert!(ceil_by_bias(f32::NAN).is_nan());
        assert!(floor_by_bias(f32::NEG_INFINITY) == f32::NEG_INFINITY);
        assert!(ceil_by_bias(f32::INFINITY) == f32::INFINITY);
    }

    fn estimate_bits<T: SimdFloat>(v: f32) -> [u32; 2] {
        [
            T::splat(v).approx_rcp().extract(0).to_bits(),
            T::splat(v).approx_rsqrt().extract(0).to_bits(),
        ]
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-0.0 ; "negative_zero")]
    #[test_case(f32::INFINITY ; "infinity")]
    #[test_case(f32::NEG_INFINITY ; "negative_infinity")]
    fn estimate_special_values_agree(v: f32) {
        let scalar = estimate_bits::<f32>(v);
        let rcp = f32::from_bits(scalar[0]);
        assert!(rcp.to_bits() == (1.0 / v).to_bits());
        assert!(scalar[0] == estimate_bits::<Float4>(v)[0]);
        assert!(scalar[0] == estimate_bits::<Float8>(v)[0]);

        let rsqrt = f32::from_bits(scalar[1]);
        let wide_rsqrt = f32::from_bits(estimate_bits::<Float4>(v)[1]);
        if v.is_sign_negative() && v != 0.0 {
            assert!(rsqrt.is_nan());
            assert!(wide_rsqrt.is_nan());
        } else {
            assert!(rsqrt.to_bits() == (1.0 / v.sqrt()).to_bits());
            assert!(rsqrt.to_bits() == wide_rsqrt.to_bits());
        }
    }

    #[test]
    fn estimates_of_huge_values_stay_small() {
        for estimate in [f32::MAX.approx_rcp(), Float4::splat(f32::MAX).approx_rcp().extract(0)] {
            assert!(estimate >= 0.0 && estimate < 1e-37);
        }
        assert!((-f32::MAX).approx_rcp() <= 0.0);
        let scalar = f32::MAX.approx_rsqrt();
        let wide = Float4::splat(f32::MAX).approx_rsqrt().extract(0);
        assert!(((scalar - wide) / wide).abs() < 0.01);
        assert!(f32::NAN.approx_rcp().is_nan());
        assert!((-4.0f32).approx_rsqrt().is_nan());
    }

    #[test]
    fn refinement_keeps_special_values() {
        assert!(0.0f32.rcp::<2>() == f32::INFINITY);
        assert!(f32::INFINITY.rcp::<2>() == 0.0);
        assert!(Float4::splat(0.0).rcp::<1>().extract(3) == f32::INFINITY);
        assert!(0.0f32.rsqrt::<2>() == f32::INFINITY);
        assert!(Float8::splat(f32::INFINITY).rsqrt::<1>().extract(5) == 0.0);
    }

    fn check_select<T: SimdFloat>() {
        let a = T::from_fn(|i| i as f32);
        let b = T::from_fn(|i| -(i as f32) - 1.0);
        assert!(T::select(T::Mask::splat(true), a, b) == a);
        assert!(T::select(T::Mask::splat(false), a, b) == b);

        let alternating = T::Mask::from_fn(|i| i % 2 == 0);
        let mixed = alternating.select(a, b);
        for i in 0..T::LANES {
            let expected = if i % 2 == 0 { a.extract(i) } else { b.extract(i) };
            assert!(mixed.extract(i) == expected);
        }
    }

    #[test]
    fn select_all_backends() {
        check_select::<f32>();
        check_select::<Float4>();
        check_select::<Float8>();
        check_select::<Float16>();
    }

    /// Largest relative error of `f` against `reference` over a spread of inputs.
    fn max_relative_error<T: SimdFloat>(f: impl Fn(T) -> T, reference: impl Fn(f64) -> f64) -> f64 {
        let mut worst = 0.0f64;
        for k in 0..500 {
            let x = 0.01f32 * 1.031f32.powi(k);
            let y = f(T::splat(x));
            for i in 0..T::LANES {
                let expected = reference(x as f64);
                let error = ((y.extract(i) as f64 - expected) / expected).abs();
                worst = worst.max(error);
            }
        }
        worst
    }

    fn rsqrt_errors<T: SimdFloat>() -> [f64; 3] {
        let reference = |x: f64| 1.0 / x.sqrt();
        [
            max_relative_error(|x: T| x.rsqrt::<0>(), reference),
            max_relative_error(|x: T| x.rsqrt::<1>(), reference),
            max_relative_error(|x: T| x.rsqrt::<2>(), reference),
        ]
    }

    fn rcp_errors<T: SimdFloat>() -> [f64; 3] {
        let reference = |x: f64| 1.0 / x;
        [
            max_relative_error(|x: T| x.rcp::<0>(), reference),
            max_relative_error(|x: T| x.rcp::<1>(), reference),
            max_relative_error(|x: T| x.rcp::<2>(), reference),
        ]
    }

    #[test]
    fn scalar_refinement_strictly_improves() {
        let [e0, e1, e2] = rsqrt_errors::<f32>();
        assert!(e0 > e1);
        assert!(e1 > e2);
        assert!(e2 < 1e-6);

        let [e0, e1, e2] = rcp_errors::<f32>();
        assert!(e0 > e1);
        assert!(e1 > e2);
    }

    /// Some targets produce exact reciprocals even without refinement, so only require
    /// that refinement never loses more than float rounding noise.
    fn check_refinement_monotonic(errors: [f64; 3]) {
        const ROUNDING_NOISE: f64 = 3.0 * f32::EPSILON as f64;
        assert!(errors[1] <= errors[0] + ROUNDING_NOISE, "{errors:?}");
        assert!(errors[2] <= errors[1] + ROUNDING_NOISE, "{errors:?}");
        assert!(errors[2] < 1e-6, "{errors:?}");
    }

    #[test]
    fn wide_refinement_monotonic() {
        check_refinement_monotonic(rsqrt_errors::<Float4>());
        check_refinement_monotonic(rsqrt_errors::<Float8>());
        check_refinement_monotonic(rsqrt_errors::<Float16>());
        check_refinement_monotonic(rcp_errors::<Float4>());
        check_refinement_monotonic(rcp_errors::<Float8>());
    }

    fn check_classification<T: SimdFloat>() {
        let values = [0.0, -1.5, f32::INFINITY, f32::NEG_INFINITY, f32::NAN, f32::MAX, 1e-40];
        let x = T::from_fn(|i| values[i % values.len()]);
        let nan = x.simd_is_nan();
        let inf = x.simd_is_inf();
        let finite = x.simd_is_finite();
        for i in 0..T::LANES {
            let v = values[i % values.len()];
            assert!(nan.extract(i) == v.is_nan());
            assert!(inf.extract(i) == v.is_infinite());
            assert!(finite.extract(i) == v.is_finite());
        }
    }

    #[test]
    fn classification_all_backends() {
        check_classification::<f32>();
        check_classification::<Float4>();
        check_classification::<Float8>();
        check_classification::<Float16>();
    }

    fn check_load_store<T: SimdFloat>() {
        let source: Vec<f32> = (0..T::LANES + 3).map(|i| i as f32 * 1.5).collect();
        let x = T::load_unaligned(&source[3..]);
        assert!(x.extract(0) == source[3]);

        let mut aligned = Aligned(T::Array::default());
        x.store(&mut aligned);
        assert!(T::load(&aligned) == x);

        let mut streamed = Aligned(T::Array::default());
        x.store_non_temporal(&mut streamed);
        assert!(T::load(&streamed) == x);

        let mut out = vec![0.0f32; T::LANES + 1];
        x.store_unaligned(&mut out[1..]);
        assert!(out[1..] == source[3..]);
    }

    #[test]
    fn load_store_all_backends() {
        check_load_store::<f32>();
        check_load_store::<Float4>();
        check_load_store::<Float8>();
        check_load_store::<Float16>();
    }

    #[test]
    #[should_panic]
    fn load_unaligned_short_slice() {
        Float8::load_unaligned(&[1.0, 2.0, 3.0]);
    }

    #[test]
    fn compile_time_lane_access() {
        let mut x = Float4::from_array([1.0, 2.0, 3.0, 4.0]);
        assert!(x.get::<2>() == 3.0);
        x.set::<3>(7.0);
        assert!(x.get::<3>() == 7.0);

        let mut y = Float16::from_fn(|i| i as f32);
        assert!(y.get::<15>() == 15.0);
        y.set::<9>(-1.0);
        assert!(y.extract(9) == -1.0);
    }

    fn check_arithmetic<T: SimdFloat>() {
        let a = T::from_fn(|i| i as f32 + 1.0);
        let b = T::splat(2.0);
        let sum = a + b;
        let product = a * b;
        let quotient = a / b;
        let difference = a - b;
        let fused = a.mul_add(b, T::one());
        for i in 0..T::LANES {
            let x = i as f32 + 1.0;
            assert!(sum.extract(i) == x + 2.0);
            assert!(product.extract(i) == x * 2.0);
            assert!(quotient.extract(i) == x / 2.0);
            assert!(difference.extract(i) == x - 2.0);
            assert!(fused.extract(i) == x * 2.0 + 1.0);
        }

        assert!((-a).simd_abs() == a);
        assert!(T::splat(4.0).simd_sqrt() == b);
        assert!(T::splat(1.7).saturate() == T::one());
        assert!(T::splat(-0.2).saturate() == T::zero());
        assert!(a.simd_min(b).extract(0) == 1.0);
        assert!(a.simd_max(b).extract(0) == 2.0);
        assert!(a.reduce_min() == 1.0);
        assert!(a.reduce_max() == T::LANES as f32);
    }

    #[test]
    fn arithmetic_all_backends() {
        check_arithmetic::<f32>();
        check_arithmetic::<Float4>();
        check_arithmetic::<Float8>();
        check_arithmetic::<Float16>();
    }

    fn check_bitwise<T: SimdFloat>() {
        let x = T::splat(-3.5);
        let sign = T::from_int_bits(T::Int::splat(SIGN_BIT));
        assert!(x.bit_xor(sign) == T::splat(3.5));
        assert!(x.bit_and(sign) == T::splat(-0.0));
        assert!(T::splat(3.5).bit_or(sign) == x);
        assert!(T::from_int(T::Int::splat(-7)) == T::splat(-7.0));
        assert!(T::splat(-7.9).to_int_trunc() == T::Int::splat(-7));
    }

    #[test]
    fn bitwise_all_backends() {
        check_bitwise::<f32>();
        check_bitwise::<Float4>();
        check_bitwise::<Float8>();
        check_bitwise::<Float16>();
    }

    fn check_comparisons<T: SimdFloat>() {
        let a = T::from_fn(|i| i as f32);
        let b = T::splat(1.0);
        assert!(a.simd_lt(b).bitmask() == 0b1);
        assert!(a.simd_le(b).bitmask() == 0b11);
        assert!(a.simd_eq(b).bitmask() == 0b10);
        assert!(a.simd_ne(b).bitmask() == (0b10 ^ (u64::MAX >> (64 - T::LANES))));
        assert!(a.simd_gt(b) == !a.simd_le(b));
        assert!(a.simd_ge(b) == !a.simd_lt(b));
        assert!(T::splat(f32::NAN).simd_eq(T::splat(f32::NAN)).none());
        assert!(T::splat(f32::NAN).simd_ne(T::splat(f32::NAN)).all());
    }

    #[test]
    fn comparisons_all_backends() {
        check_comparisons::<Float4>();
        check_comparisons::<Float8>();
        check_comparisons::<Float16>();
    }

    fn check_int<I: SimdInt>() {
        let a = I::from_fn(|i| i as i32 - 2);
        let b = I::splat(0);
        assert!(a.simd_min(b).extract(0) == -2);
        assert!(a.simd_max(b).extract(0) == 0);
        assert!(a.simd_lt(b).bitmask() == 0b11);
        assert!(a.simd_gt(b).extract(3));
        assert!((a + I::splat(2)).extract(1) == 1);
        assert!((a * I::splat(3)).extract(0) == -6);
        assert!((!I::splat(0)) == I::splat(-1));
        assert!(I::select(I::Mask::splat(true), a, b) == a);
        assert!(I::splat(i32::MAX) + I::splat(1) == I::splat(i32::MIN));
    }

    #[test]
    fn int_lanes() {
        check_int::<Int4>();
        check_int::<Int8>();
        check_int::<Int16>();
    }

    #[test]
    fn set_lanes_basic() {
        let mask = Mask8::from_fn(|i| [3, 5, 7].contains(&i));
        let lanes: Vec<usize> = mask.set_lanes().collect();
        assert!(lanes == vec![3, 5, 7]);
        assert!(mask.set_lanes().len() == 3);
    }

    #[test]
    fn set_lanes_all_and_empty() {
        let all: Vec<usize> = Mask16::splat(true).set_lanes().collect();
        assert!(all == (0..16).collect::<Vec<_>>());
        assert!(Mask16::splat(false).set_lanes().next().is_none());
        assert!(Mask16::splat(true).all());
        assert!(Mask16::splat(false).none());
    }
}
