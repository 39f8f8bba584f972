//! Binary bounding volume hierarchy over externally built nodes.
//!
//! Building the tree is left to the caller; this module only checks that a finished tree
//! is well formed and traverses it.

mod traversal;

use std::ops::Range;

use index_vec::IndexVec;
use thiserror::Error;

use crate::{
    geometry::{Box3, HitRecord, Ray},
    intersector::{AnyHitIntersector, DefaultIntersector, Intersector, Primitive},
    simd::SimdFloat,
    util::Stats,
};

/// Longest root to leaf path (in nodes) that the traversal stack can hold.
pub const MAX_DEPTH: usize = 64;

/// Primitive indices are reported as `i32` ids, so the last index must fit.
pub const MAX_PRIMITIVES: usize = i32::MAX as usize + 1;

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

#[derive(Clone, Debug, PartialEq)]
pub enum BvhNode {
    Inner {
        bounds: Box3<f32>,
        children: [NodeIdx; 2],
    },
    Leaf {
        bounds: Box3<f32>,
        /// Indices into the primitive array.
        primitives: Range<u32>,
    },
}

impl BvhNode {
    pub fn bounds(&self) -> &Box3<f32> {
        match self {
            BvhNode::Inner { bounds, .. } | BvhNode::Leaf { bounds, .. } => bounds,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BvhError {
    #[error("Node {node} links to child {child}, but there are only {count} nodes")]
    ChildOutOfRange {
        node: usize,
        child: usize,
        count: usize,
    },
    #[error("Node {node} is reachable more than once")]
    SharedNode { node: usize },
    #[error("Leaf {node} references primitives {start}..{end}, but there are only {count}")]
    PrimitiveRangeOutOfBounds {
        node: usize,
        start: u32,
        end: u32,
        count: usize,
    },
    #[error("Hierarchy is deeper than the supported {max} levels")]
    TooDeep { max: usize },
    #[error("{count} primitives do not fit into 32 bit ids, at most {max} are supported")]
    TooManyPrimitives { count: usize, max: usize },
}

fn check_primitive_count(count: usize) -> Result<(), BvhError> {
    if count > MAX_PRIMITIVES {
        return Err(BvhError::TooManyPrimitives {
            count,
            max: MAX_PRIMITIVES,
        });
    }
    Ok(())
}

/// Hierarchy of primitives `P`, node 0 is the root.
#[derive(Clone, Debug)]
pub struct Bvh<P> {
    nodes: IndexVec<NodeIdx, BvhNode>,
    primitives: Vec<P>,
    depth: usize,
}

impl<P> Bvh<P> {
    /// Hierarchy without any nodes, every ray misses it.
    pub fn empty() -> Self {
        Bvh {
            nodes: IndexVec::new(),
            primitives: Vec::new(),
            depth: 0,
        }
    }

    /// Accepts a tree built elsewhere.
    ///
    /// Every node must be reachable from the root at most once, leaves must reference
    /// existing primitives and the tree must fit into the traversal stack. Nodes that are
    /// not reachable are kept but never visited. At most [`MAX_PRIMITIVES`] primitives are
    /// accepted.
    pub fn from_parts(nodes: Vec<BvhNode>, primitives: Vec<P>) -> Result<Self, BvhError> {
        check_primitive_count(primitives.len())?;
        let nodes: IndexVec<NodeIdx, BvhNode> = IndexVec::from_vec(nodes);
        if nodes.is_empty() {
            return Ok(Bvh {
                nodes,
                primitives,
                depth: 0,
            });
        }

        let mut seen: IndexVec<NodeIdx, bool> = IndexVec::from_vec(vec![false; nodes.len()]);
        let mut stack = vec![(NodeIdx::from_raw(0), 1usize)];
        let mut depth = 0;

        while let Some((idx, node_depth)) = stack.pop() {
            if node_depth > MAX_DEPTH {
                return Err(BvhError::TooDeep { max: MAX_DEPTH });
            }
            if std::mem::replace(&mut seen[idx], true) {
                return Err(BvhError::SharedNode { node: idx.index() });
            }
            depth = depth.max(node_depth);

            match &nodes[idx] {
                BvhNode::Inner { children, .. } => {
                    for child in children {
                        if child.index() >= nodes.len() {
                            return Err(BvhError::ChildOutOfRange {
                                node: idx.index(),
                                child: child.index(),
                                count: nodes.len(),
                            });
                        }
                        stack.push((*child, node_depth + 1));
                    }
                }
                BvhNode::Leaf { primitives: range, .. } => {
                    if range.start > range.end || range.end as usize > primitives.len() {
                        return Err(BvhError::PrimitiveRangeOutOfBounds {
                            node: idx.index(),
                            start: range.start,
                            end: range.end,
                            count: primitives.len(),
                        });
                    }
                }
            }
        }

        log::debug!(
            "Accepted hierarchy with {} nodes, {} primitives, depth {}",
            nodes.len(),
            primitives.len(),
            depth
        );

        Ok(Bvh {
            nodes,
            primitives,
            depth,
        })
    }

    pub fn nodes(&self) -> &IndexVec<NodeIdx, BvhNode> {
        &self.nodes
    }

    pub fn primitives(&self) -> &[P] {
        &self.primitives
    }

    /// Bounds of the root node, an invalid box for an empty hierarchy.
    pub fn bounds(&self) -> Box3<f32> {
        self.nodes
            .get(NodeIdx::from_raw(0))
            .map_or_else(Box3::<f32>::new_invalid, |root| *root.bounds())
    }

    /// Number of nodes on the longest root to leaf path.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Primitive counts of reachable leaves.
    pub fn leaf_size_statistics(&self) -> Stats {
        self.reachable()
            .filter_map(|idx| match &self.nodes[idx] {
                BvhNode::Leaf { primitives, .. } => Some(primitives.len()),
                BvhNode::Inner { .. } => None,
            })
            .collect()
    }

    pub fn log_statistics(&self) {
        log::info!("Nodes: {}", self.nodes.len());
        log::info!("Depth: {}", self.depth);
        log::info!("Leaf size: {}", self.leaf_size_statistics());
    }

    /// Reachable nodes in depth first order.
    fn reachable(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        let mut stack: Vec<NodeIdx> = Vec::new();
        if !self.nodes.is_empty() {
            stack.push(NodeIdx::from_raw(0));
        }
        std::iter::from_fn(move || {
            let idx = stack.pop()?;
            if let BvhNode::Inner { children, .. } = &self.nodes[idx] {
                stack.extend(children.iter().rev());
            }
            Some(idx)
        })
    }

    /// Closest hit per lane with the [`DefaultIntersector`].
    pub fn closest_hit<T>(&self, ray: &Ray<T>) -> HitRecord<T>
    where
        T: SimdFloat,
        P: Primitive<T, Hit = HitRecord<T>>,
    {
        DefaultIntersector.intersect_hierarchy(ray, self)
    }

    /// Occlusion query, lanes report some hit within their interval, not necessarily the
    /// closest one.
    pub fn any_hit<T>(&self, ray: &Ray<T>) -> HitRecord<T>
    where
        T: SimdFloat,
        P: Primitive<T, Hit = HitRecord<T>>,
    {
        AnyHitIntersector.intersect_hierarchy(ray, self)
    }
}
