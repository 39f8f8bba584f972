//! Surface area heuristic for judging hierarchies and candidate splits.

use crate::{
    bvh::{Bvh, BvhNode, NodeIdx},
    geometry::{Box3, safe_half_surface_area},
    simd::SimdFloat,
};

/// Relative costs of the two kinds of work a traversal does.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SahCost {
    /// Cost of testing the child boxes of an inner node.
    pub traversal: f32,
    /// Cost of testing one primitive.
    pub intersection: f32,
}

impl Default for SahCost {
    fn default() -> Self {
        SahCost {
            traversal: 1.0,
            intersection: 1.0,
        }
    }
}

impl SahCost {
    /// Cost of testing `count` primitives directly.
    pub fn leaf_cost<T: SimdFloat>(&self, count: usize) -> T {
        T::splat(self.intersection * count as f32)
    }

    /// Expected cost of splitting `parent` into two leaves.
    ///
    /// Child hit probabilities are area ratios. A flat or invalid child has zero area and
    /// contributes nothing; a flat parent gives both children probability one.
    pub fn split_cost<T: SimdFloat>(
        &self,
        parent: &Box3<T>,
        left: &Box3<T>,
        left_count: usize,
        right: &Box3<T>,
        right_count: usize,
    ) -> T {
        let left_cost = self.leaf_cost::<T>(left_count) * hit_probability(parent, left);
        let right_cost = self.leaf_cost::<T>(right_count) * hit_probability(parent, right);
        T::splat(self.traversal) + left_cost + right_cost
    }
}

/// Probability that a ray through `parent` also passes through `child`.
fn hit_probability<T: SimdFloat>(parent: &Box3<T>, child: &Box3<T>) -> T {
    let parent_area = safe_half_surface_area(parent);
    let ratio = safe_half_surface_area(child) / parent_area;
    T::select(parent_area.simd_eq(T::zero()), T::one(), ratio)
}

impl<P> Bvh<P> {
    /// Expected cost of a ray that hits the root box, zero for an empty hierarchy.
    pub fn sah_cost(&self, cost: &SahCost) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        self.node_cost(NodeIdx::from_raw(0), cost)
    }

    fn node_cost(&self, idx: NodeIdx, cost: &SahCost) -> f32 {
        match &self.nodes()[idx] {
            BvhNode::Leaf { primitives, .. } => cost.leaf_cost(primitives.len()),
            BvhNode::Inner { bounds, children } => {
                let children_cost: f32 = children
                    .iter()
                    .map(|&child| {
                        let child_bounds = self.nodes()[child].bounds();
                        hit_probability(bounds, child_bounds) * self.node_cost(child, cost)
                    })
                    .sum();
                cost.traversal + children_cost
            }
        }
    }
}
