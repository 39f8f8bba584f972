use nalgebra::{Point3, Scalar, Vector3};

use crate::simd::{SimdFloat, SimdInt, SimdMask};

/// Ray, or a packet of rays when `T` has several lanes.
///
/// Distances along the ray are measured in multiples of `direction`, which does not
/// need to be normalized.
#[derive(Copy, Clone, Debug)]
pub struct Ray<T: Scalar> {
    pub origin: Point3<T>,
    pub direction: Vector3<T>,

    /// Componentwise inverse of the ray direction
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: Vector3<T>,

    /// Valid interval of distances, a hit outside of `tmin..=tmax` is ignored.
    pub tmin: T,
    pub tmax: T,
}

impl<T: SimdFloat> Ray<T> {
    /// Ray over `0..=inf`.
    pub fn new(origin: Point3<T>, direction: Vector3<T>) -> Ray<T> {
        Self::with_interval(origin, direction, T::zero(), T::splat(f32::INFINITY))
    }

    pub fn with_interval(origin: Point3<T>, direction: Vector3<T>, tmin: T, tmax: T) -> Ray<T> {
        let inv_direction = direction.map(|x| {
            T::select(
                x.simd_eq(T::zero()),
                T::splat(f32::INFINITY),
                T::one() / x,
            )
        });

        Ray {
            origin,
            direction,
            inv_direction,
            tmin,
            tmax,
        }
    }

    /// Ray that no test can hit, used to fill unused lanes of a packet.
    pub fn inactive() -> Ray<T> {
        Self::with_interval(
            Point3::origin(),
            Vector3::x(),
            T::splat(f32::INFINITY),
            T::splat(f32::NEG_INFINITY),
        )
    }

    pub fn point_at(&self, t: T) -> Point3<T> {
        self.origin + self.direction * t
    }

    /// Lanes where the interval is non-empty.
    pub fn active(&self) -> T::Mask {
        self.tmin.simd_le(self.tmax)
    }

    /// Copy with the far end of the interval pulled in to `tmax` where that is closer.
    pub fn clipped(&self, tmax: T) -> Ray<T> {
        Ray {
            tmax: self.tmax.simd_min(tmax),
            ..*self
        }
    }

    pub fn splat(ray: &Ray<f32>) -> Ray<T> {
        Ray {
            origin: ray.origin.map(T::splat),
            direction: ray.direction.map(T::splat),
            inv_direction: ray.inv_direction.map(T::splat),
            tmin: T::splat(ray.tmin),
            tmax: T::splat(ray.tmax),
        }
    }

    pub fn extract(&self, i: usize) -> Ray<f32> {
        Ray {
            origin: self.origin.map(|x| x.extract(i)),
            direction: self.direction.map(|x| x.extract(i)),
            inv_direction: self.inv_direction.map(|x| x.extract(i)),
            tmin: self.tmin.extract(i),
            tmax: self.tmax.extract(i),
        }
    }

    pub fn replace(&mut self, i: usize, ray: &Ray<f32>) {
        for (dst, src) in self.origin.iter_mut().zip(ray.origin.iter()) {
            dst.replace(i, *src);
        }
        for (dst, src) in self.direction.iter_mut().zip(ray.direction.iter()) {
            dst.replace(i, *src);
        }
        for (dst, src) in self.inv_direction.iter_mut().zip(ray.inv_direction.iter()) {
            dst.replace(i, *src);
        }
        self.tmin.replace(i, ray.tmin);
        self.tmax.replace(i, ray.tmax);
    }
}

/// Packs individual rays into lane groups.
///
/// The returned mask marks lanes holding real rays; the tail of the last packet is
/// filled with [`Ray::inactive`].
pub fn pack_rays<T: SimdFloat>(
    rays: impl IntoIterator<Item = Ray<f32>>,
) -> impl Iterator<Item = (Ray<T>, T::Mask)> {
    let mut iter = rays.into_iter();
    std::iter::from_fn(move || {
        let mut packet = Ray::<T>::inactive();
        let mut count = 0;
        for (lane, ray) in (0..T::LANES).zip(&mut iter) {
            packet.replace(lane, &ray);
            count += 1;
        }
        (count > 0).then(|| (packet, T::Mask::from_fn(|lane| lane < count)))
    })
}

/// Entry and exit distances of a ray through a box.
#[derive(Copy, Clone, Debug)]
pub struct BoxHit<T: SimdFloat> {
    /// The ray passes through the box within its interval.
    pub hit: T::Mask,
    /// Entry distance, clamped to the ray's `tmin`.
    pub tnear: T,
    /// Exit distance, clamped to the ray's `tmax`.
    pub tfar: T,
}

/// Closest accepted surface intersection per lane.
#[derive(Copy, Clone, Debug)]
pub struct HitRecord<T: SimdFloat> {
    pub hit: T::Mask,
    pub t: T,
    /// Barycentric coordinates along `e1` and `e2` of the hit triangle.
    pub u: T,
    pub v: T,
    /// Index of the primitive within the leaf-level hierarchy.
    pub prim_id: T::Int,
    /// Index of the instance within the enclosing hierarchy, for nested hierarchies.
    pub geom_id: T::Int,
}

impl<T: SimdFloat> HitRecord<T> {
    pub fn miss() -> Self {
        HitRecord {
            hit: T::Mask::splat(false),
            t: T::splat(f32::INFINITY),
            u: T::zero(),
            v: T::zero(),
            prim_id: T::Int::splat(-1),
            geom_id: T::Int::splat(-1),
        }
    }

    /// Takes over the lanes where `other` hit closer than `self`.
    pub fn merge_closer(&mut self, other: &Self) {
        let closer = other.hit & (!self.hit | other.t.simd_lt(self.t));
        self.hit |= closer;
        self.t = T::select(closer, other.t, self.t);
        self.u = T::select(closer, other.u, self.u);
        self.v = T::select(closer, other.v, self.v);
        self.prim_id = T::Int::select(closer, other.prim_id, self.prim_id);
        self.geom_id = T::Int::select(closer, other.geom_id, self.geom_id);
    }

    /// Per-lane results of the lanes that hit something.
    pub fn hits(&self) -> impl Iterator<Item = LaneHit> + '_ {
        self.hit.set_lanes().map(|lane| self.lane(lane))
    }

    fn lane(&self, lane: usize) -> LaneHit {
        LaneHit {
            lane,
            t: self.t.extract(lane),
            u: self.u.extract(lane),
            v: self.v.extract(lane),
            prim_id: self.prim_id.extract(lane) as u32,
            geom_id: self.geom_id.extract(lane) as u32,
        }
    }
}

/// One lane of a [`HitRecord`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LaneHit {
    pub lane: usize,
    pub t: f32,
    pub u: f32,
    pub v: f32,
    pub prim_id: u32,
    pub geom_id: u32,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::simd::{Float4, Float8, Int8};
    use assert2::assert;
    use num_traits::Zero;

    fn ray_towards_x(y: f32) -> Ray<f32> {
        Ray::new(Point3::new(0.0, y, 0.0), Vector3::new(1.0, 0.0, 0.0))
    }

    #[test]
    fn inverse_direction_of_zero_is_positive_infinity() {
        let ray = Ray::new(Point3::origin(), Vector3::new(-0.0f32, 0.0, 2.0));
        assert!(ray.inv_direction == Vector3::new(f32::INFINITY, f32::INFINITY, 0.5));
    }

    #[test]
    fn point_at() {
        let ray = Ray::new(Point3::new(1.0f32, 1.0, 1.0), Vector3::new(0.0, 2.0, 0.0));
        assert!(ray.point_at(1.5) == Point3::new(1.0, 4.0, 1.0));
    }

    #[test]
    fn pack_rays_pads_last_packet() {
        let rays: Vec<Ray<f32>> = (0..10).map(|i| ray_towards_x(i as f32)).collect();
        let packets: Vec<(Ray<Float4>, _)> = pack_rays(rays.iter().copied()).collect();
        assert!(packets.len() == 3);
        assert!(packets[0].1.all());
        assert!(packets[2].1.bitmask() == 0b0011);
        assert!(packets[2].0.extract(1).origin.y == 9.0);
        assert!(packets[2].0.active().bitmask() == 0b0011);
    }

    #[test]
    fn pack_rays_empty() {
        assert!(pack_rays::<Float8>(std::iter::empty()).next().is_none());
    }

    #[test]
    fn clipped_keeps_closer_end() {
        let ray = Ray::<Float4>::splat(&ray_towards_x(0.0)).clipped(Float4::from_array([
            1.0,
            f32::INFINITY,
            3.0,
            0.0,
        ]));
        assert!(ray.tmax.to_array() == [1.0, f32::INFINITY, 3.0, 0.0]);
    }

    #[test]
    fn merge_closer_takes_nearer_lanes() {
        let mut record = HitRecord::<Float8>::miss();
        let first = HitRecord {
            hit: Float8::splat(1.0).simd_gt(Float8::zero()),
            t: Float8::from_fn(|i| i as f32),
            u: Float8::zero(),
            v: Float8::zero(),
            prim_id: Int8::splat(1),
            geom_id: Int8::splat(0),
        };
        record.merge_closer(&first);
        assert!(record.hit.all());

        let second = HitRecord {
            hit: Float8::from_fn(|i| i as f32).simd_ge(Float8::splat(4.0)),
            t: Float8::splat(4.5),
            prim_id: Int8::splat(2),
            ..first
        };
        record.merge_closer(&second);

        let hits: Vec<LaneHit> = record.hits().collect();
        assert!(hits.len() == 8);
        assert!(hits[4].prim_id == 1);
        assert!(hits[5].prim_id == 2);
        assert!(hits[5].t == 4.5);
        assert!(hits[7].prim_id == 2);
    }

    #[test]
    fn miss_reports_nothing() {
        assert!(HitRecord::<f32>::miss().hits().next().is_none());
    }
}
