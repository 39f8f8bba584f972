use crate::{
    geometry::{Box3, BoxHit, HitRecord, Ray, Triangle},
    simd::SimdFloat,
    util::Stats,
};

use super::{Hierarchy, Intersect, Intersector, Traversal};

/// Work done by one or more queries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TraversalCounters {
    pub box_tests: usize,
    pub primitive_tests: usize,
    pub hierarchy_entries: usize,
}

/// Wraps another intersector and counts the tests it performs.
///
/// Hierarchy entries are traversed with the wrapper itself, so work inside nested
/// hierarchies is counted too. The inner intersector keeps control of the primitive
/// tests and of the traversal mode.
#[derive(Clone, Debug, Default)]
pub struct CountingIntersector<I> {
    pub inner: I,
    pub counters: TraversalCounters,
}

impl<I> CountingIntersector<I> {
    pub fn new(inner: I) -> Self {
        CountingIntersector {
            inner,
            counters: TraversalCounters::default(),
        }
    }

    /// Returns the counters accumulated so far and zeroes them.
    pub fn take_counters(&mut self) -> TraversalCounters {
        std::mem::take(&mut self.counters)
    }
}

impl<T: SimdFloat, I: Intersector<T>> Intersector<T> for CountingIntersector<I> {
    fn intersect_leaf<P: Intersect<T>>(&mut self, ray: &Ray<T>, primitive: &P) -> P::Hit {
        self.counters.primitive_tests += 1;
        self.inner.intersect_leaf(ray, primitive)
    }

    fn intersect_triangle(&mut self, ray: &Ray<T>, triangle: &Triangle<f32>) -> HitRecord<T> {
        self.counters.primitive_tests += 1;
        self.inner.intersect_triangle(ray, triangle)
    }

    fn intersect_box(&mut self, ray: &Ray<T>, bounds: &Box3<f32>) -> BoxHit<T> {
        self.counters.box_tests += 1;
        self.inner.intersect_box(ray, bounds)
    }

    fn intersect_hierarchy<H: Hierarchy<T>>(&mut self, ray: &Ray<T>, hierarchy: &H) -> HitRecord<T> {
        self.counters.hierarchy_entries += 1;
        let mode = self.traversal();
        hierarchy.traverse(ray, self, mode)
    }

    fn traversal(&self) -> Traversal {
        self.inner.traversal()
    }
}

/// Distribution of per-query counters over many queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraversalStats {
    pub box_tests: Stats,
    pub primitive_tests: Stats,
    pub hierarchy_entries: Stats,
}

impl TraversalStats {
    pub fn record(&mut self, counters: &TraversalCounters) {
        self.box_tests.add_sample(counters.box_tests);
        self.primitive_tests.add_sample(counters.primitive_tests);
        self.hierarchy_entries.add_sample(counters.hierarchy_entries);
    }

    pub fn merge(&self, other: &Self) -> Self {
        TraversalStats {
            box_tests: self.box_tests.merge(&other.box_tests),
            primitive_tests: self.primitive_tests.merge(&other.primitive_tests),
            hierarchy_entries: self.hierarchy_entries.merge(&other.hierarchy_entries),
        }
    }

    pub fn log_summary(&self) {
        log::info!("Box tests per query: {}", self.box_tests);
        log::info!("Primitive tests per query: {}", self.primitive_tests);
        log::info!("Hierarchy entries per query: {}", self.hierarchy_entries);
    }
}
