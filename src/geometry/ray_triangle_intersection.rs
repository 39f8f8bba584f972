use crate::simd::{SimdFloat, SimdInt};

use super::{HitRecord, Ray, Triangle, cross, dot};

impl<T: SimdFloat> Triangle<T> {
    /// Calculates ray intersection with the (two sided) triangle pack.
    /// Adapted from https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm#Rust_implementation
    ///
    /// A lane hits if the barycentric coordinates are inside the triangle and the distance
    /// lies within the ray interval. Degenerate triangles and rays parallel to the
    /// triangle plane never hit. Both ids of the returned record are zero.
    pub fn intersect_ray(&self, ray: &Ray<T>) -> HitRecord<T> {
        let ray_cross_e2 = cross(&ray.direction, &self.e2);
        let det = dot(&self.e1, &ray_cross_e2);

        let inv_det = T::one() / det; // May be infinite
        let s = ray.origin - self.v1;
        let u = inv_det * dot(&s, &ray_cross_e2);

        let s_cross_e1 = cross(&s, &self.e1);
        let v = inv_det * dot(&ray.direction, &s_cross_e1);
        let t = inv_det * dot(&self.e2, &s_cross_e1);

        // Comparisons with NaN are false, which takes care of degenerate determinants
        let hit = det.simd_ne(T::zero())
            & u.simd_ge(T::zero())
            & v.simd_ge(T::zero())
            & (u + v).simd_le(T::one())
            & t.simd_ge(ray.tmin)
            & t.simd_le(ray.tmax);

        HitRecord {
            hit,
            t,
            u,
            v,
            prim_id: T::Int::splat(0),
            geom_id: T::Int::splat(0),
        }
    }
}
