//! 4 and 8 lane backends on top of `wide`.
//!
//! Masks are float vectors with all bits of a lane set or cleared, which is what the
//! comparison instructions produce and what `blend` consumes.

use num_traits::{One, Zero};
use wide::{CmpEq as _, CmpGt as _, CmpLe as _, CmpLt as _, f32x4, f32x8, i32x4, i32x8};

use super::{SimdFloat, SimdInt, SimdMask, ceil_by_bias, floor_by_bias, round_by_bias};

macro_rules! binary_ops {
    ($ty:ident: $($op:ident $method:ident $assign_op:ident $assign_method:ident),* $(,)?) => {
        $(
            impl std::ops::$op for $ty {
                type Output = Self;

                #[inline(always)]
                fn $method(self, rhs: Self) -> Self {
                    Self(std::ops::$op::$method(self.0, rhs.0))
                }
            }

            impl std::ops::$assign_op for $ty {
                #[inline(always)]
                fn $assign_method(&mut self, rhs: Self) {
                    *self = std::ops::$op::$method(*self, rhs);
                }
            }
        )*
    };
}

macro_rules! wide_lanes {
    ($lanes:literal, $float:ident, $mask:ident, $int:ident, $f:ident, $i:ident) => {
        #[doc = concat!(stringify!($lanes), " float lanes.")]
        #[derive(Copy, Clone, Debug, Default)]
        #[repr(transparent)]
        pub struct $float(pub $f);

        #[doc = concat!("Predicate over ", stringify!($lanes), " lanes.")]
        #[derive(Copy, Clone, Debug)]
        #[repr(transparent)]
        pub struct $mask(pub $f);

        #[doc = concat!(stringify!($lanes), " wrapping `i32` lanes.")]
        #[derive(Copy, Clone, Debug, Default)]
        #[repr(transparent)]
        pub struct $int(pub $i);

        impl PartialEq for $float {
            fn eq(&self, other: &Self) -> bool {
                self.0.to_array() == other.0.to_array()
            }
        }

        impl PartialEq for $mask {
            fn eq(&self, other: &Self) -> bool {
                self.bitmask() == other.bitmask()
            }
        }

        impl PartialEq for $int {
            fn eq(&self, other: &Self) -> bool {
                self.0.to_array() == other.0.to_array()
            }
        }

        binary_ops!($float:
            Add add AddAssign add_assign,
            Sub sub SubAssign sub_assign,
            Mul mul MulAssign mul_assign,
            Div div DivAssign div_assign,
            BitAnd bitand BitAndAssign bitand_assign,
            BitOr bitor BitOrAssign bitor_assign,
            BitXor bitxor BitXorAssign bitxor_assign,
        );

        binary_ops!($mask:
            BitAnd bitand BitAndAssign bitand_assign,
            BitOr bitor BitOrAssign bitor_assign,
            BitXor bitxor BitXorAssign bitxor_assign,
        );

        binary_ops!($int:
            Add add AddAssign add_assign,
            Sub sub SubAssign sub_assign,
            Mul mul MulAssign mul_assign,
            BitAnd bitand BitAndAssign bitand_assign,
            BitOr bitor BitOrAssign bitor_assign,
            BitXor bitxor BitXorAssign bitxor_assign,
        );

        impl std::ops::Neg for $float {
            type Output = Self;

            #[inline(always)]
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl std::ops::Not for $mask {
            type Output = Self;

            #[inline(always)]
            fn not(self) -> Self {
                Self(!self.0)
            }
        }

        impl std::ops::Not for $int {
            type Output = Self;

            #[inline(always)]
            fn not(self) -> Self {
                Self(!self.0)
            }
        }

        impl Zero for $float {
            fn zero() -> Self {
                Self($f::ZERO)
            }

            fn is_zero(&self) -> bool {
                self.0.cmp_eq($f::ZERO).move_mask() == FULL_MOVE_MASK
            }
        }

        impl One for $float {
            fn one() -> Self {
                Self($f::splat(1.0))
            }
        }

        impl $mask {
            #[inline(always)]
            fn from_int_mask(mask: $i) -> Self {
                Self(bytemuck::cast(mask))
            }

            #[inline(always)]
            fn as_int_mask(self) -> $i {
                bytemuck::cast(self.0)
            }
        }

        impl SimdMask for $mask {
            const LANES: usize = $lanes;

            #[inline(always)]
            fn splat(value: bool) -> Self {
                Self::from_int_mask($i::splat(-(value as i32)))
            }

            fn from_fn(mut f: impl FnMut(usize) -> bool) -> Self {
                let lanes: [i32; $lanes] = std::array::from_fn(|i| -(f(i) as i32));
                Self::from_int_mask($i::new(lanes))
            }

            #[inline(always)]
            fn extract(self, i: usize) -> bool {
                self.as_int_mask().to_array()[i] != 0
            }

            #[inline(always)]
            fn bitmask(self) -> u64 {
                self.0.move_mask() as u64
            }

            #[inline(always)]
            fn all(self) -> bool {
                self.0.move_mask() == FULL_MOVE_MASK
            }

            #[inline(always)]
            fn any(self) -> bool {
                self.0.move_mask() != 0
            }
        }

        impl SimdInt for $int {
            const LANES: usize = $lanes;
            type Mask = $mask;

            #[inline(always)]
            fn splat(value: i32) -> Self {
                Self($i::splat(value))
            }

            #[inline(always)]
            fn extract(self, i: usize) -> i32 {
                self.0.to_array()[i]
            }

            fn replace(&mut self, i: usize, value: i32) {
                let mut lanes = self.0.to_array();
                lanes[i] = value;
                self.0 = $i::new(lanes);
            }

            fn from_fn(f: impl FnMut(usize) -> i32) -> Self {
                Self($i::new(std::array::from_fn(f)))
            }

            #[inline(always)]
            fn simd_eq(self, other: Self) -> $mask {
                $mask::from_int_mask(self.0.cmp_eq(other.0))
            }

            #[inline(always)]
            fn simd_lt(self, other: Self) -> $mask {
                $mask::from_int_mask(self.0.cmp_lt(other.0))
            }

            #[inline(always)]
            fn simd_gt(self, other: Self) -> $mask {
                $mask::from_int_mask(self.0.cmp_gt(other.0))
            }

            #[inline(always)]
            fn select(mask: $mask, a: Self, b: Self) -> Self {
                Self(mask.as_int_mask().blend(a.0, b.0))
            }

            #[inline(always)]
            fn simd_min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            #[inline(always)]
            fn simd_max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl SimdFloat for $float {
            const LANES: usize = $lanes;
            type Mask = $mask;
            type Int = $int;
            type Array = [f32; $lanes];

            #[inline(always)]
            fn splat(value: f32) -> Self {
                Self($f::splat(value))
            }

            #[inline(always)]
            fn from_array(values: [f32; $lanes]) -> Self {
                Self($f::new(values))
            }

            #[inline(always)]
            fn to_array(self) -> [f32; $lanes] {
                self.0.to_array()
            }

            #[inline(always)]
            fn extract(self, i: usize) -> f32 {
                self.0.to_array()[i]
            }

            fn replace(&mut self, i: usize, value: f32) {
                let mut lanes = self.0.to_array();
                lanes[i] = value;
                self.0 = $f::new(lanes);
            }

            fn from_fn(f: impl FnMut(usize) -> f32) -> Self {
                Self($f::new(std::array::from_fn(f)))
            }

            #[inline(always)]
            fn simd_eq(self, other: Self) -> $mask {
                $mask(self.0.cmp_eq(other.0))
            }

            #[inline(always)]
            fn simd_lt(self, other: Self) -> $mask {
                $mask(self.0.cmp_lt(other.0))
            }

            #[inline(always)]
            fn simd_le(self, other: Self) -> $mask {
                $mask(self.0.cmp_le(other.0))
            }

            #[inline(always)]
            fn simd_gt(self, other: Self) -> $mask {
                $mask(self.0.cmp_gt(other.0))
            }

            #[inline(always)]
            fn select(mask: $mask, a: Self, b: Self) -> Self {
                Self(mask.0.blend(a.0, b.0))
            }

            #[inline(always)]
            fn bit_and(self, other: Self) -> Self {
                self & other
            }

            #[inline(always)]
            fn bit_or(self, other: Self) -> Self {
                self | other
            }

            #[inline(always)]
            fn bit_xor(self, other: Self) -> Self {
                self ^ other
            }

            #[inline(always)]
            fn to_int_bits(self) -> $int {
                $int(bytemuck::cast(self.0))
            }

            #[inline(always)]
            fn from_int_bits(bits: $int) -> Self {
                Self(bytemuck::cast(bits.0))
            }

            #[inline(always)]
            fn to_int_trunc(self) -> $int {
                $int(self.0.trunc_int())
            }

            #[inline(always)]
            fn from_int(value: $int) -> Self {
                Self(from_int_lanes(value.0))
            }

            /// Selects explicitly, the hardware min picks the second operand on NaN.
            #[inline(always)]
            fn simd_min(self, other: Self) -> Self {
                let m = self.0.min(other.0);
                let self_nan = !self.0.cmp_eq(self.0);
                let other_nan = !other.0.cmp_eq(other.0);
                Self(self_nan.blend(other.0, other_nan.blend(self.0, m)))
            }

            #[inline(always)]
            fn simd_max(self, other: Self) -> Self {
                let m = self.0.max(other.0);
                let self_nan = !self.0.cmp_eq(self.0);
                let other_nan = !other.0.cmp_eq(other.0);
                Self(self_nan.blend(other.0, other_nan.blend(self.0, m)))
            }

            #[inline(always)]
            fn simd_abs(self) -> Self {
                Self(self.0.abs())
            }

            #[inline(always)]
            fn simd_round(self) -> Self {
                if cfg!(target_feature = "sse4.1") {
                    Self(self.0.round())
                } else {
                    round_by_bias(self)
                }
            }

            #[inline(always)]
            fn simd_floor(self) -> Self {
                if cfg!(target_feature = "sse4.1") {
                    Self(self.0.floor())
                } else {
                    floor_by_bias(self)
                }
            }

            #[inline(always)]
            fn simd_ceil(self) -> Self {
                if cfg!(target_feature = "sse4.1") {
                    Self(self.0.ceil())
                } else {
                    ceil_by_bias(self)
                }
            }

            #[inline(always)]
            fn simd_sqrt(self) -> Self {
                Self(self.0.sqrt())
            }

            #[inline(always)]
            fn mul_add(self, a: Self, b: Self) -> Self {
                Self(self.0.mul_add(a.0, b.0))
            }

            #[inline(always)]
            fn approx_rcp(self) -> Self {
                Self(self.0.recip())
            }

            #[inline(always)]
            fn approx_rsqrt(self) -> Self {
                Self(self.0.recip_sqrt())
            }
        }
    };
}

mod lanes4 {
    use super::*;

    /// `move_mask` with every lane set.
    const FULL_MOVE_MASK: i32 = 0b1111;

    #[inline(always)]
    fn from_int_lanes(v: i32x4) -> f32x4 {
        f32x4::from_i32x4(v)
    }

    wide_lanes!(4, Float4, Mask4, Int4, f32x4, i32x4);
}

mod lanes8 {
    use super::*;

    const FULL_MOVE_MASK: i32 = 0b1111_1111;

    #[inline(always)]
    fn from_int_lanes(v: i32x8) -> f32x8 {
        f32x8::from_i32x8(v)
    }

    wide_lanes!(8, Float8, Mask8, Int8, f32x8, i32x8);
}

pub use lanes4::{Float4, Int4, Mask4};
pub use lanes8::{Float8, Int8, Mask8};
