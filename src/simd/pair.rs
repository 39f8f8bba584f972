//! Doubling a backend's width by running two halves side by side.
//!
//! `Pair<Float8>` gives the 16 lane backend. On targets with 512 bit registers the
//! compiler fuses the halves, elsewhere it runs as two 8 lane operations.

use std::ops::{
    Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Div,
    DivAssign, Mul, MulAssign, Neg, Not, Sub, SubAssign,
};

use num_traits::{One, Zero};

use super::{SimdFloat, SimdInt, SimdMask};

/// Two halves, `lo` holding lanes `0..N` and `hi` holding lanes `N..2N`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Pair<T> {
    pub lo: T,
    pub hi: T,
}

impl<T> Pair<T> {
    #[inline(always)]
    fn map(self, mut f: impl FnMut(T) -> T) -> Self {
        Pair {
            lo: f(self.lo),
            hi: f(self.hi),
        }
    }

    #[inline(always)]
    fn zip_map<U, V>(self, other: Pair<U>, mut f: impl FnMut(T, U) -> V) -> Pair<V> {
        Pair {
            lo: f(self.lo, other.lo),
            hi: f(self.hi, other.hi),
        }
    }
}

macro_rules! pair_ops {
    ($($op:ident $method:ident $assign_op:ident $assign_method:ident),* $(,)?) => {
        $(
            impl<T: $op<Output = T>> $op for Pair<T> {
                type Output = Self;

                #[inline(always)]
                fn $method(self, rhs: Self) -> Self {
                    self.zip_map(rhs, $op::$method)
                }
            }

            impl<T: $op<Output = T> + Copy> $assign_op for Pair<T> {
                #[inline(always)]
                fn $assign_method(&mut self, rhs: Self) {
                    *self = $op::$method(*self, rhs);
                }
            }
        )*
    };
}

pair_ops!(
    Add add AddAssign add_assign,
    Sub sub SubAssign sub_assign,
    Mul mul MulAssign mul_assign,
    Div div DivAssign div_assign,
    BitAnd bitand BitAndAssign bitand_assign,
    BitOr bitor BitOrAssign bitor_assign,
    BitXor bitxor BitXorAssign bitxor_assign,
);

impl<T: Neg<Output = T>> Neg for Pair<T> {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self {
        self.map(Neg::neg)
    }
}

impl<T: Not<Output = T>> Not for Pair<T> {
    type Output = Self;

    #[inline(always)]
    fn not(self) -> Self {
        self.map(Not::not)
    }
}

impl<T: SimdFloat> Zero for Pair<T> {
    fn zero() -> Self {
        <Self as SimdFloat>::splat(0.0)
    }

    fn is_zero(&self) -> bool {
        self.lo.is_zero() && self.hi.is_zero()
    }
}

impl<T: SimdFloat> One for Pair<T> {
    fn one() -> Self {
        <Self as SimdFloat>::splat(1.0)
    }
}

/// Splits a lane index into the half and the index within it.
#[inline(always)]
fn split_lane<T>(pair: &Pair<T>, i: usize, half_lanes: usize) -> (&T, usize) {
    if i < half_lanes {
        (&pair.lo, i)
    } else {
        (&pair.hi, i - half_lanes)
    }
}

#[inline(always)]
fn split_lane_mut<T>(pair: &mut Pair<T>, i: usize, half_lanes: usize) -> (&mut T, usize) {
    if i < half_lanes {
        (&mut pair.lo, i)
    } else {
        (&mut pair.hi, i - half_lanes)
    }
}

impl<M: SimdMask> SimdMask for Pair<M> {
    const LANES: usize = 2 * M::LANES;

    #[inline(always)]
    fn splat(value: bool) -> Self {
        Pair {
            lo: M::splat(value),
            hi: M::splat(value),
        }
    }

    fn from_fn(mut f: impl FnMut(usize) -> bool) -> Self {
        let lo = M::from_fn(&mut f);
        let hi = M::from_fn(|i| f(i + M::LANES));
        Pair { lo, hi }
    }

    fn extract(self, i: usize) -> bool {
        let (half, i) = split_lane(&self, i, M::LANES);
        half.extract(i)
    }

    #[inline(always)]
    fn bitmask(self) -> u64 {
        self.lo.bitmask() | (self.hi.bitmask() << M::LANES)
    }

    #[inline(always)]
    fn all(self) -> bool {
        self.lo.all() && self.hi.all()
    }

    #[inline(always)]
    fn any(self) -> bool {
        self.lo.any() || self.hi.any()
    }
}

impl<I: SimdInt> SimdInt for Pair<I> {
    const LANES: usize = 2 * I::LANES;
    type Mask = Pair<I::Mask>;

    #[inline(always)]
    fn splat(value: i32) -> Self {
        Pair {
            lo: I::splat(value),
            hi: I::splat(value),
        }
    }

    fn extract(self, i: usize) -> i32 {
        let (half, i) = split_lane(&self, i, I::LANES);
        half.extract(i)
    }

    fn replace(&mut self, i: usize, value: i32) {
        let (half, i) = split_lane_mut(self, i, I::LANES);
        half.replace(i, value)
    }

    #[inline(always)]
    fn simd_eq(self, other: Self) -> Self::Mask {
        self.zip_map(other, I::simd_eq)
    }

    #[inline(always)]
    fn simd_lt(self, other: Self) -> Self::Mask {
        self.zip_map(other, I::simd_lt)
    }

    #[inline(always)]
    fn simd_gt(self, other: Self) -> Self::Mask {
        self.zip_map(other, I::simd_gt)
    }

    #[inline(always)]
    fn select(mask: Self::Mask, a: Self, b: Self) -> Self {
        Pair {
            lo: I::select(mask.lo, a.lo, b.lo),
            hi: I::select(mask.hi, a.hi, b.hi),
        }
    }

    #[inline(always)]
    fn simd_min(self, other: Self) -> Self {
        self.zip_map(other, I::simd_min)
    }

    #[inline(always)]
    fn simd_max(self, other: Self) -> Self {
        self.zip_map(other, I::simd_max)
    }
}

impl<T: SimdFloat> SimdFloat for Pair<T> {
    const LANES: usize = 2 * T::LANES;
    type Mask = Pair<T::Mask>;
    type Int = Pair<T::Int>;
    type Array = [T::Array; 2];

    #[inline(always)]
    fn splat(value: f32) -> Self {
        Pair {
            lo: T::splat(value),
            hi: T::splat(value),
        }
    }

    #[inline(always)]
    fn from_array(values: Self::Array) -> Self {
        Pair {
            lo: T::from_array(values[0]),
            hi: T::from_array(values[1]),
        }
    }

    #[inline(always)]
    fn to_array(self) -> Self::Array {
        [self.lo.to_array(), self.hi.to_array()]
    }

    fn extract(self, i: usize) -> f32 {
        let (half, i) = split_lane(&self, i, T::LANES);
        half.extract(i)
    }

    fn replace(&mut self, i: usize, value: f32) {
        let (half, i) = split_lane_mut(self, i, T::LANES);
        half.replace(i, value)
    }

    fn from_fn(mut f: impl FnMut(usize) -> f32) -> Self {
        let lo = T::from_fn(&mut f);
        let hi = T::from_fn(|i| f(i + T::LANES));
        Pair { lo, hi }
    }

    #[inline(always)]
    fn simd_eq(self, other: Self) -> Self::Mask {
        self.zip_map(other, T::simd_eq)
    }

    #[inline(always)]
    fn simd_lt(self, other: Self) -> Self::Mask {
        self.zip_map(other, T::simd_lt)
    }

    #[inline(always)]
    fn simd_le(self, other: Self) -> Self::Mask {
        self.zip_map(other, T::simd_le)
    }

    #[inline(always)]
    fn select(mask: Self::Mask, a: Self, b: Self) -> Self {
        Pair {
            lo: T::select(mask.lo, a.lo, b.lo),
            hi: T::select(mask.hi, a.hi, b.hi),
        }
    }

    #[inline(always)]
    fn to_int_bits(self) -> Self::Int {
        Pair {
            lo: self.lo.to_int_bits(),
            hi: self.hi.to_int_bits(),
        }
    }

    #[inline(always)]
    fn from_int_bits(bits: Self::Int) -> Self {
        Pair {
            lo: T::from_int_bits(bits.lo),
            hi: T::from_int_bits(bits.hi),
        }
    }

    #[inline(always)]
    fn to_int_trunc(self) -> Self::Int {
        Pair {
            lo: self.lo.to_int_trunc(),
            hi: self.hi.to_int_trunc(),
        }
    }

    #[inline(always)]
    fn from_int(value: Self::Int) -> Self {
        Pair {
            lo: T::from_int(value.lo),
            hi: T::from_int(value.hi),
        }
    }

    #[inline(always)]
    fn simd_min(self, other: Self) -> Self {
        self.zip_map(other, T::simd_min)
    }

    #[inline(always)]
    fn simd_max(self, other: Self) -> Self {
        self.zip_map(other, T::simd_max)
    }

    #[inline(always)]
    fn simd_abs(self) -> Self {
        self.map(T::simd_abs)
    }

    #[inline(always)]
    fn simd_round(self) -> Self {
        self.map(T::simd_round)
    }

    #[inline(always)]
    fn simd_floor(self) -> Self {
        self.map(T::simd_floor)
    }

    #[inline(always)]
    fn simd_ceil(self) -> Self {
        self.map(T::simd_ceil)
    }

    #[inline(always)]
    fn simd_sqrt(self) -> Self {
        self.map(T::simd_sqrt)
    }

    #[inline(always)]
    fn mul_add(self, a: Self, b: Self) -> Self {
        Pair {
            lo: self.lo.mul_add(a.lo, b.lo),
            hi: self.hi.mul_add(a.hi, b.hi),
        }
    }

    #[inline(always)]
    fn approx_rcp(self) -> Self {
        self.map(T::approx_rcp)
    }

    #[inline(always)]
    fn approx_rsqrt(self) -> Self {
        self.map(T::approx_rsqrt)
    }

    fn reduce_min(self) -> f32 {
        self.lo.reduce_min().min(self.hi.reduce_min())
    }

    fn reduce_max(self) -> f32 {
        self.lo.reduce_max().max(self.hi.reduce_max())
    }
}
