mod aabb;
mod ray;
mod ray_box_intersection;
mod ray_triangle_intersection;
mod triangle;

pub use aabb::{
    Aabb, Box3, Rect, combine, combine_point, compute_vertices, half_surface_area, intersect,
    overlap_ratio, overlap_ratio_min, overlap_ratio_union, safe_half_surface_area,
    safe_surface_area, safe_volume, split, surface_area, volume,
};
pub use ray::{BoxHit, HitRecord, LaneHit, Ray, pack_rays};
pub use triangle::Triangle;

use nalgebra::{SVector, Vector3};

use crate::simd::SimdFloat;

/// Coordinate axis of 3D space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn all() -> [Axis; 3] {
        [Axis::X, Axis::Y, Axis::Z]
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Dot product as a chain of multiply-adds.
#[inline(always)]
pub fn dot<T: SimdFloat, const D: usize>(a: &SVector<T, D>, b: &SVector<T, D>) -> T {
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (x, y)| x.mul_add(*y, acc))
}

#[inline(always)]
pub fn cross<T: SimdFloat>(a: &Vector3<T>, b: &Vector3<T>) -> Vector3<T> {
    Vector3::new(
        a.y.mul_add(b.z, -(a.z * b.y)),
        a.z.mul_add(b.x, -(a.x * b.z)),
        a.x.mul_add(b.y, -(a.y * b.x)),
    )
}

#[inline(always)]
pub fn length<T: SimdFloat, const D: usize>(v: &SVector<T, D>) -> T {
    dot(v, v).simd_sqrt()
}

#[cfg(test)]
pub mod test {
    use super::*;
    use nalgebra::{Point3, Vector3};
    use proptest::prelude::*;

    /// Helper macro that creates a wrapper arnound a type that implemetns Deref and Arbitary
    macro_rules! arbitrary_wrapper {
        ( $wrapper_name:ident ( $type:ty ) -> $block:block ) => {
            #[derive(Copy, Clone, Debug)]
            pub struct $wrapper_name(pub $type);

            impl std::ops::Deref for $wrapper_name {
                type Target = $type;
                fn deref(&self) -> &$type {
                    &self.0
                }
            }

            impl Arbitrary for $wrapper_name {
                type Parameters = ();
                type Strategy = proptest::strategy::BoxedStrategy<Self>;
                fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
                    $block.prop_map(|x| $wrapper_name(x)).boxed()
                }
            }
        };
    }

    /// Coordinates on a coarse grid so that sums and products stay exact enough.
    pub fn simple_float() -> BoxedStrategy<f32> {
        (-10_000i32..10_000).prop_map(|n| n as f32 * 1e-2).boxed()
    }

    pub fn simple_positive_float() -> BoxedStrategy<f32> {
        (1i32..10_000).prop_map(|n| n as f32 * 1e-2).boxed()
    }

    arbitrary_wrapper! {
        PointWrapper(Point3<f32>) -> {
            (simple_float(), simple_float(), simple_float())
                .prop_map(|coords| Point3::new(coords.0, coords.1, coords.2))
        }
    }

    arbitrary_wrapper! {
        NonzeroVectorWrapper(Vector3<f32>) -> {
            (simple_float(), simple_float(), simple_float())
                .prop_filter_map(
                    "vector is zero",
                    |coords| {
                        let vector = Vector3::new(coords.0, coords.1, coords.2);
                        if vector.norm() < 1e-3 {
                            None
                        } else {
                            Some(vector)
                        }
                    })
        }
    }

    arbitrary_wrapper! {
        BoxWrapper(Box3<f32>) -> {
            (any::<PointWrapper>(), simple_positive_float(), simple_positive_float(), simple_positive_float())
                .prop_map(|(min, x, y, z)| Box3::new(*min, *min + Vector3::new(x, y, z)))
        }
    }

    pub(crate) use arbitrary_wrapper;

    #[test]
    fn axis_indices() {
        let indices: Vec<usize> = Axis::all().into_iter().map(Axis::index).collect();
        assert2::assert!(indices == vec![0, 1, 2]);
    }

    #[test]
    fn cross_matches_nalgebra() {
        let a = Vector3::new(1.0f32, 2.0, 3.0);
        let b = Vector3::new(-4.0f32, 0.5, 2.0);
        assert2::assert!(cross(&a, &b) == a.cross(&b));
        assert2::assert!(dot(&a, &b) == a.dot(&b));
        assert2::assert!(length(&Vector3::new(3.0f32, 4.0, 0.0)) == 5.0);
    }
}
