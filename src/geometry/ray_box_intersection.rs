use crate::simd::SimdFloat;

use super::{Box3, BoxHit, Ray};

impl<T: SimdFloat> Box3<T> {
    /// Slab test of a ray (packet) against the box (packet).
    ///
    /// Returns entry and exit distances clamped to the ray interval, the ray hits if
    /// `tnear <= tfar`. Boundary contact counts as a hit.
    pub fn intersect_ray(&self, ray: &Ray<T>) -> BoxHit<T> {
        let neg_infinity = T::splat(f32::NEG_INFINITY);
        let infinity = T::splat(f32::INFINITY);

        // Componentwise distances along the ray to the box's min and max corners
        // The multiplication is NAN if the ray is starting inside the slab bounding plane
        // and is parallel to it. In this case we blend to +-infinity, so that the range becomes infinite
        let to_box_min = (self.min - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| T::select(x.simd_is_nan(), neg_infinity, x));
        let to_box_max = (self.max - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| T::select(x.simd_is_nan(), infinity, x));

        // Correctly ordered (min_t <= max_t)
        let componentwise_min_t = to_box_min.zip_map(&to_box_max, T::simd_min);
        let componentwise_max_t = to_box_min.zip_map(&to_box_max, T::simd_max);

        let tnear = componentwise_min_t
            .x
            .simd_max(componentwise_min_t.y.simd_max(componentwise_min_t.z))
            .simd_max(ray.tmin);
        let tfar = componentwise_max_t
            .x
            .simd_min(componentwise_max_t.y.simd_min(componentwise_max_t.z))
            .simd_min(ray.tmax);

        BoxHit {
            hit: tnear.simd_le(tfar),
            tnear,
            tfar,
        }
    }
}
