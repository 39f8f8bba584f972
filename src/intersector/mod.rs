//! Static dispatch of ray queries to primitive specific intersection routines.
//!
//! Every query goes through an [`Intersector`]. Its methods have default implementations
//! for each primitive category, so an intersector only overrides the categories it wants
//! to treat differently. The intersector is passed down into nested hierarchies, which
//! keeps overrides in effect at every level. All of it is resolved at compile time.

mod counting;

pub use counting::{CountingIntersector, TraversalCounters, TraversalStats};

use crate::{
    geometry::{Box3, BoxHit, HitRecord, Ray, Triangle},
    simd::SimdFloat,
};

/// Leaf-level ray intersection test.
pub trait Intersect<T: SimdFloat> {
    type Hit;

    fn intersect(&self, ray: &Ray<T>) -> Self::Hit;
}

/// Search mode of a hierarchy traversal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Traversal {
    /// Find the nearest hit of every lane.
    #[default]
    ClosestHit,
    /// Stop looking in a lane once it has any hit. Used for occlusion queries.
    AnyHit,
}

/// Acceleration structure over primitives that traverses itself with a given intersector.
pub trait Hierarchy<T: SimdFloat> {
    fn traverse<I: Intersector<T>>(
        &self,
        ray: &Ray<T>,
        intersector: &mut I,
        mode: Traversal,
    ) -> HitRecord<T>;
}

/// Anything an intersector can be asked to intersect.
///
/// The implementation picks which [`Intersector`] method handles the type, which is what
/// lets intersectors override handling per primitive category.
pub trait Primitive<T: SimdFloat> {
    type Hit;

    /// Primitive is itself a hierarchy of primitives; hits inside it are reported with the
    /// primitive's index as `geom_id` rather than `prim_id`.
    const IS_HIERARCHY: bool = false;

    fn dispatch<I: Intersector<T>>(&self, ray: &Ray<T>, intersector: &mut I) -> Self::Hit;
}

/// Strategy object for ray queries.
pub trait Intersector<T: SimdFloat>: Sized {
    /// Intersects any primitive, routing it to the method for its category.
    fn intersect<P: Primitive<T>>(&mut self, ray: &Ray<T>, primitive: &P) -> P::Hit {
        primitive.dispatch(ray, self)
    }

    /// Fallback for primitives without a dedicated method.
    fn intersect_leaf<P: Intersect<T>>(&mut self, ray: &Ray<T>, primitive: &P) -> P::Hit {
        primitive.intersect(ray)
    }

    fn intersect_triangle(&mut self, ray: &Ray<T>, triangle: &Triangle<f32>) -> HitRecord<T> {
        self.intersect_leaf(ray, triangle)
    }

    fn intersect_box(&mut self, ray: &Ray<T>, bounds: &Box3<f32>) -> BoxHit<T> {
        self.intersect_leaf(ray, bounds)
    }

    fn intersect_hierarchy<H: Hierarchy<T>>(&mut self, ray: &Ray<T>, hierarchy: &H) -> HitRecord<T> {
        let mode = self.traversal();
        hierarchy.traverse(ray, self, mode)
    }

    /// Mode used for hierarchies entered through [`Self::intersect_hierarchy`].
    fn traversal(&self) -> Traversal {
        Traversal::ClosestHit
    }
}

/// Plain closest-hit queries with no overrides.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultIntersector;

impl<T: SimdFloat> Intersector<T> for DefaultIntersector {}

/// Occlusion queries, any hit within the ray interval ends the search in that lane.
#[derive(Copy, Clone, Debug, Default)]
pub struct AnyHitIntersector;

impl<T: SimdFloat> Intersector<T> for AnyHitIntersector {
    fn traversal(&self) -> Traversal {
        Traversal::AnyHit
    }
}

impl<T: SimdFloat> Intersect<T> for Triangle<f32> {
    type Hit = HitRecord<T>;

    #[inline]
    fn intersect(&self, ray: &Ray<T>) -> HitRecord<T> {
        Triangle::<T>::splat(self).intersect_ray(ray)
    }
}

impl<T: SimdFloat> Primitive<T> for Triangle<f32> {
    type Hit = HitRecord<T>;

    #[inline]
    fn dispatch<I: Intersector<T>>(&self, ray: &Ray<T>, intersector: &mut I) -> HitRecord<T> {
        intersector.intersect_triangle(ray, self)
    }
}

impl<T: SimdFloat> Intersect<T> for Box3<f32> {
    type Hit = BoxHit<T>;

    #[inline]
    fn intersect(&self, ray: &Ray<T>) -> BoxHit<T> {
        Box3::<T>::splat(self).intersect_ray(ray)
    }
}

impl<T: SimdFloat> Primitive<T> for Box3<f32> {
    type Hit = BoxHit<T>;

    #[inline]
    fn dispatch<I: Intersector<T>>(&self, ray: &Ray<T>, intersector: &mut I) -> BoxHit<T> {
        intersector.intersect_box(ray, self)
    }
}
