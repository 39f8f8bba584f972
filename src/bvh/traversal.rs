use arrayvec::ArrayVec;

use crate::{
    geometry::{HitRecord, Ray},
    intersector::{Hierarchy, Intersector, Primitive, Traversal},
    simd::{SimdFloat, SimdInt, SimdMask},
};

use super::{Bvh, BvhNode, MAX_DEPTH, NodeIdx};

/// Node waiting on the traversal stack, with the lanes whose rays hit its box and their
/// entry distances.
type StackEntry<T> = (NodeIdx, <T as SimdFloat>::Mask, T);

impl<T, P> Hierarchy<T> for Bvh<P>
where
    T: SimdFloat,
    P: Primitive<T, Hit = HitRecord<T>>,
{
    fn traverse<I: Intersector<T>>(
        &self,
        ray: &Ray<T>,
        intersector: &mut I,
        mode: Traversal,
    ) -> HitRecord<T> {
        let mut result = HitRecord::miss();
        let Some(root) = self.nodes.get(NodeIdx::from_raw(0)) else {
            return result;
        };

        let mut active = ray.active();
        if active.none() {
            return result;
        }

        let root_hit = intersector.intersect_box(ray, root.bounds());
        let mut stack: ArrayVec<StackEntry<T>, MAX_DEPTH> = ArrayVec::new();
        stack.push((NodeIdx::from_raw(0), root_hit.hit, root_hit.tnear));

        while let Some((idx, mask, tnear)) = stack.pop() {
            // Lanes that already found something closer than this box skip it
            let visit = mask & active & tnear.simd_le(result.t);
            if visit.none() {
                continue;
            }

            match &self.nodes[idx] {
                BvhNode::Inner { children, .. } => {
                    let clipped = ray.clipped(result.t);
                    let [(near, near_mask, near_t), (far, far_mask, far_t)] =
                        self.order_children(children, &clipped, visit, intersector);

                    // Nearer child goes last so that it is popped first
                    if far_mask.any() {
                        stack.push((far, far_mask, far_t));
                    }
                    if near_mask.any() {
                        stack.push((near, near_mask, near_t));
                    }
                }
                BvhNode::Leaf { primitives, .. } => {
                    for index in primitives.clone() {
                        let lanes = visit & active;
                        if lanes.none() {
                            break;
                        }

                        let clipped = ray.clipped(result.t);
                        let mut hit = intersector.intersect(&clipped, &self.primitives[index as usize]);
                        hit.hit &= lanes;
                        if P::IS_HIERARCHY {
                            hit.geom_id = T::Int::splat(index as i32);
                        } else {
                            hit.prim_id = T::Int::splat(index as i32);
                        }
                        result.merge_closer(&hit);

                        if mode == Traversal::AnyHit {
                            active &= !result.hit;
                            if active.none() {
                                return result;
                            }
                        }
                    }
                }
            }
        }

        result
    }
}

impl<P> Bvh<P> {
    /// Tests both child boxes and returns them nearest first.
    ///
    /// Lanes disagree about which child is nearer, the child with the smallest entry
    /// distance over all of its hitting lanes is taken as the near one.
    fn order_children<T, I>(
        &self,
        children: &[NodeIdx; 2],
        ray: &Ray<T>,
        visit: T::Mask,
        intersector: &mut I,
    ) -> [StackEntry<T>; 2]
    where
        T: SimdFloat,
        I: Intersector<T>,
    {
        let infinity = T::splat(f32::INFINITY);
        let [a, b] = children.map(|child| {
            let hit = intersector.intersect_box(ray, self.nodes[child].bounds());
            let mask = hit.hit & visit;
            let closest = T::select(mask, hit.tnear, infinity).reduce_min();
            ((child, mask, hit.tnear), closest)
        });

        if b.1 < a.1 { [b.0, a.0] } else { [a.0, b.0] }
    }
}

impl<T, P> Primitive<T> for Bvh<P>
where
    T: SimdFloat,
    P: Primitive<T, Hit = HitRecord<T>>,
{
    type Hit = HitRecord<T>;

    const IS_HIERARCHY: bool = true;

    #[inline]
    fn dispatch<I: Intersector<T>>(&self, ray: &Ray<T>, intersector: &mut I) -> HitRecord<T> {
        intersector.intersect_hierarchy(ray, self)
    }
}
