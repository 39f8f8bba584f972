use nalgebra::{Point, SVector, Scalar, Vector3};
use rand::Rng;

use super::{Aabb, cross, dot, length};
use crate::simd::SimdFloat;

/// Triangle stored as one vertex and the two edges leaving it.
///
/// The edge form is what the intersection test consumes, storing it saves two
/// subtractions per test.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle<T: Scalar, const D: usize = 3> {
    pub v1: Point<T, D>,
    /// `v2 - v1`
    pub e1: SVector<T, D>,
    /// `v3 - v1`
    pub e2: SVector<T, D>,
}

impl<T: SimdFloat, const D: usize> Triangle<T, D> {
    pub fn new(v1: Point<T, D>, e1: SVector<T, D>, e2: SVector<T, D>) -> Self {
        Triangle { v1, e1, e2 }
    }

    pub fn from_vertices(v1: Point<T, D>, v2: Point<T, D>, v3: Point<T, D>) -> Self {
        Triangle {
            v1,
            e1: v2 - v1,
            e2: v3 - v1,
        }
    }

    pub fn vertices(&self) -> [Point<T, D>; 3] {
        [self.v1, self.v1 + self.e1, self.v1 + self.e2]
    }

    pub fn bounds(&self) -> Aabb<Point<T, D>> {
        let mut bounds = Aabb::new_invalid();
        for vertex in &self.vertices() {
            bounds.insert_point(vertex);
        }
        bounds
    }

    /// `v1 + u * e1 + v * e2`
    pub fn point_at(&self, u: T, v: T) -> Point<T, D> {
        self.v1 + self.e1 * u + self.e2 * v
    }

    /// Maps two uniform variables in `[0, 1]` to a point uniformly distributed over
    /// the triangle surface.
    pub fn sample_surface(&self, u1: T, u2: T) -> Point<T, D> {
        let [v1, v2, v3] = self.vertices();
        let su1 = u1.simd_sqrt();
        let w1 = T::one() - su1;
        let w2 = su1 * (T::one() - u2);
        let w3 = su1 * u2;
        Point::from(v1.coords * w1 + v2.coords * w2 + v3.coords * w3)
    }

    /// [`Self::sample_surface`] with independent uniform variables in every lane.
    pub fn sample_surface_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Point<T, D> {
        let u1 = T::from_fn(|_| rng.random::<f32>());
        let u2 = T::from_fn(|_| rng.random::<f32>());
        self.sample_surface(u1, u2)
    }

    pub fn centroid(&self) -> Point<T, D> {
        let third = T::splat(1.0 / 3.0);
        self.v1 + (self.e1 + self.e2) * third
    }

    pub fn splat(value: &Triangle<f32, D>) -> Self {
        Triangle {
            v1: value.v1.map(T::splat),
            e1: value.e1.map(T::splat),
            e2: value.e2.map(T::splat),
        }
    }

    pub fn extract(&self, i: usize) -> Triangle<f32, D> {
        Triangle {
            v1: self.v1.map(|x| x.extract(i)),
            e1: self.e1.map(|x| x.extract(i)),
            e2: self.e2.map(|x| x.extract(i)),
        }
    }
}

impl<T: SimdFloat> Triangle<T, 3> {
    /// Normal vector, not normalized. Its length is twice the area.
    pub fn normal(&self) -> Vector3<T> {
        cross(&self.e1, &self.e2)
    }

    pub fn area(&self) -> T {
        length(&self.normal()) * T::splat(0.5)
    }
}

impl<T: SimdFloat> Triangle<T, 2> {
    /// Unsigned area from the perp-dot product of the edges.
    pub fn area(&self) -> T {
        let perp_dot = self.e1.x.mul_add(self.e2.y, -(self.e1.y * self.e2.x));
        perp_dot.simd_abs() * T::splat(0.5)
    }

    /// Twice the signed area, positive for counter-clockwise vertex order.
    pub fn signed_double_area(&self) -> T {
        dot(&self.e1, &SVector::<T, 2>::new(self.e2.y, -self.e2.x))
    }
}
