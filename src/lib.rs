pub mod bvh;
pub mod cost;
pub mod geometry;
pub mod intersector;
pub mod simd;
mod util;

pub use crate::bvh::{Bvh, BvhError, BvhNode, NodeIdx};
pub use crate::cost::SahCost;
pub use crate::intersector::{
    AnyHitIntersector, CountingIntersector, DefaultIntersector, Intersector, Traversal,
};
pub use util::Stats;
