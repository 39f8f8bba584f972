use nalgebra::{Point, Point2, Point3, Scalar, Vector3};

use super::Axis;
use crate::simd::{SimdFloat, SimdMask};

/// Axis aligned box given by its two extreme corners.
///
/// There is intentionally no `Default`, use [`Aabb::new_invalid`] to get an empty box that
/// any inserted point will replace.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb<Point> {
    pub min: Point,
    pub max: Point,
}

pub type Box3<T> = Aabb<Point3<T>>;
pub type Rect<T> = Aabb<Point2<T>>;

impl<Point> Aabb<Point> {
    pub fn new(min: Point, max: Point) -> Aabb<Point> {
        Aabb { min, max }
    }

    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> Aabb<Point2> {
        Aabb {
            min: f(&self.min),
            max: f(&self.max),
        }
    }

    pub fn zip_map<Point2, Point3, F: FnMut(&Point, &Point2) -> Point3>(
        &self,
        rhs: &Aabb<Point2>,
        mut f: F,
    ) -> Aabb<Point3> {
        Aabb {
            min: f(&self.min, &rhs.min),
            max: f(&self.max, &rhs.max),
        }
    }
}

impl<Point> From<[Point; 2]> for Aabb<Point> {
    fn from(value: [Point; 2]) -> Self {
        let [min, max] = value;
        Aabb { min, max }
    }
}

/// Lane-wise min and max of two points.
#[inline(always)]
fn point_min<T: SimdFloat, const D: usize>(a: &Point<T, D>, b: &Point<T, D>) -> Point<T, D> {
    Point::from(a.coords.zip_map(&b.coords, T::simd_min))
}

#[inline(always)]
fn point_max<T: SimdFloat, const D: usize>(a: &Point<T, D>, b: &Point<T, D>) -> Point<T, D> {
    Point::from(a.coords.zip_map(&b.coords, T::simd_max))
}

/// Folds a per-axis predicate into a single mask, `all` semantics.
#[inline(always)]
fn all_axes<T: SimdFloat, const D: usize>(
    a: &Point<T, D>,
    b: &Point<T, D>,
    f: impl Fn(T, T) -> T::Mask,
) -> T::Mask {
    a.coords
        .iter()
        .zip(b.coords.iter())
        .fold(T::Mask::splat(true), |mask, (x, y)| mask & f(*x, *y))
}

impl<T: SimdFloat, const D: usize> Aabb<Point<T, D>> {
    /// Box with `min = +inf` and `max = -inf`, the neutral element of [`combine`].
    pub fn new_invalid() -> Self {
        Aabb {
            min: Point::from([T::splat(f32::INFINITY); D]),
            max: Point::from([T::splat(f32::NEG_INFINITY); D]),
        }
    }

    /// Resets to the invalid box, ready to have points inserted.
    pub fn invalidate(&mut self) {
        *self = Self::new_invalid();
    }

    /// Smallest box containing all the points, invalid if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point<T, D>>) -> Self {
        let mut result = Self::new_invalid();
        for point in points {
            result.insert_point(point);
        }
        result
    }

    pub fn insert_point(&mut self, point: &Point<T, D>) {
        self.min = point_min(&self.min, point);
        self.max = point_max(&self.max, point);
    }

    pub fn insert(&mut self, other: &Self) {
        self.min = point_min(&self.min, &other.min);
        self.max = point_max(&self.max, &other.max);
    }

    /// `min <= max` on every axis.
    pub fn is_valid(&self) -> T::Mask {
        all_axes(&self.min, &self.max, T::simd_le)
    }

    /// `min > max` on some axis. NaN coordinates make a box neither valid nor invalid.
    pub fn is_invalid(&self) -> T::Mask {
        !all_axes(&self.min, &self.max, |a, b| !a.simd_gt(b))
    }

    /// `min >= max` on some axis, the box encloses no volume. Invalid boxes are empty.
    pub fn is_empty(&self) -> T::Mask {
        !all_axes(&self.min, &self.max, T::simd_lt)
    }

    pub fn contains_point(&self, point: &Point<T, D>) -> T::Mask {
        all_axes(&self.min, point, T::simd_le) & all_axes(point, &self.max, T::simd_le)
    }

    /// True where `other` lies completely inside `self`.
    pub fn contains(&self, other: &Self) -> T::Mask {
        all_axes(&self.min, &other.min, T::simd_le) & all_axes(&other.max, &self.max, T::simd_le)
    }

    pub fn center(&self) -> Point<T, D> {
        let half = T::splat(0.5);
        Point::from((self.min.coords + self.max.coords) * half)
    }

    /// `max - min`, negative on invalid axes.
    pub fn size(&self) -> nalgebra::SVector<T, D> {
        self.max - self.min
    }

    /// Size clamped to be non-negative.
    pub fn safe_size(&self) -> nalgebra::SVector<T, D> {
        self.size().map(|x| x.simd_max(T::zero()))
    }

    /// Exact lane-wise equality of both corners.
    pub fn simd_eq(&self, other: &Self) -> T::Mask {
        all_axes(&self.min, &other.min, T::simd_eq) & all_axes(&self.max, &other.max, T::simd_eq)
    }

    /// Broadcasts a single box into every lane.
    pub fn splat(value: &Aabb<Point<f32, D>>) -> Self {
        value.map(|p| p.map(T::splat))
    }

    /// The box stored in lane `i`.
    pub fn extract(&self, i: usize) -> Aabb<Point<f32, D>> {
        self.map(|p| p.map(|x| x.extract(i)))
    }

    pub fn replace(&mut self, i: usize, value: &Aabb<Point<f32, D>>) {
        for (dst, src) in self.min.iter_mut().zip(value.min.iter()) {
            dst.replace(i, *src);
        }
        for (dst, src) in self.max.iter_mut().zip(value.max.iter()) {
            dst.replace(i, *src);
        }
    }

    /// Per-lane `if mask { a } else { b }`.
    pub fn select(mask: T::Mask, a: &Self, b: &Self) -> Self {
        a.zip_map(b, |x, y| {
            Point::from(x.coords.zip_map(&y.coords, |x, y| T::select(mask, x, y)))
        })
    }
}

impl<'a, T: SimdFloat, const D: usize> FromIterator<&'a Point<T, D>> for Aabb<Point<T, D>> {
    fn from_iter<I: IntoIterator<Item = &'a Point<T, D>>>(iter: I) -> Self {
        Self::from_points(iter)
    }
}

impl<T: SimdFloat, const D: usize> FromIterator<Point<T, D>> for Aabb<Point<T, D>> {
    fn from_iter<I: IntoIterator<Item = Point<T, D>>>(iter: I) -> Self {
        let mut result = Self::new_invalid();
        for point in iter {
            result.insert_point(&point);
        }
        result
    }
}

/// Smallest box containing both.
pub fn combine<T: SimdFloat, const D: usize>(
    a: &Aabb<Point<T, D>>,
    b: &Aabb<Point<T, D>>,
) -> Aabb<Point<T, D>> {
    Aabb {
        min: point_min(&a.min, &b.min),
        max: point_max(&a.max, &b.max),
    }
}

/// Smallest box containing both the box and the point.
pub fn combine_point<T: SimdFloat, const D: usize>(
    a: &Aabb<Point<T, D>>,
    p: &Point<T, D>,
) -> Aabb<Point<T, D>> {
    Aabb {
        min: point_min(&a.min, p),
        max: point_max(&a.max, p),
    }
}

/// Overlap of both boxes; invalid where they are disjoint.
pub fn intersect<T: SimdFloat, const D: usize>(
    a: &Aabb<Point<T, D>>,
    b: &Aabb<Point<T, D>>,
) -> Aabb<Point<T, D>> {
    Aabb {
        min: point_max(&a.min, &b.min),
        max: point_min(&a.max, &b.max),
    }
}

fn half_area_of<T: SimdFloat>(size: &Vector3<T>) -> T {
    size.x.mul_add(size.y, size.z * (size.x + size.y))
}

/// `xy + yz + zx`. Meaningless for invalid boxes, see [`safe_half_surface_area`].
pub fn half_surface_area<T: SimdFloat>(b: &Box3<T>) -> T {
    half_area_of(&b.size())
}

/// [`half_surface_area`] with negative extents clamped, zero for invalid boxes.
pub fn safe_half_surface_area<T: SimdFloat>(b: &Box3<T>) -> T {
    half_area_of(&b.safe_size())
}

pub fn surface_area<T: SimdFloat>(b: &Box3<T>) -> T {
    let h = half_surface_area(b);
    h + h
}

pub fn safe_surface_area<T: SimdFloat>(b: &Box3<T>) -> T {
    let h = safe_half_surface_area(b);
    h + h
}

pub fn volume<T: SimdFloat>(b: &Box3<T>) -> T {
    let size = b.size();
    size.x * size.y * size.z
}

pub fn safe_volume<T: SimdFloat>(b: &Box3<T>) -> T {
    let size = b.safe_size();
    size.x * size.y * size.z
}

/// Intersection volume over union box volume, zero where the boxes do not overlap.
pub fn overlap_ratio_union<T: SimdFloat>(a: &Box3<T>, b: &Box3<T>) -> T {
    let overlap = intersect(a, b);
    let ratio = volume(&overlap) / volume(&combine(a, b));
    T::select(overlap.is_empty(), T::zero(), ratio)
}

/// Intersection volume over the smaller of the two volumes.
///
/// Zero where either box is empty or the boxes do not overlap, so the division never
/// sees a zero volume in a selected lane.
pub fn overlap_ratio_min<T: SimdFloat>(a: &Box3<T>, b: &Box3<T>) -> T {
    let overlap = intersect(a, b);
    let degenerate = a.is_empty() | b.is_empty() | overlap.is_empty();
    let ratio = volume(&overlap) / volume(a).simd_min(volume(b));
    T::select(degenerate, T::zero(), ratio)
}

/// Default overlap measure, same as [`overlap_ratio_min`].
pub fn overlap_ratio<T: SimdFloat>(a: &Box3<T>, b: &Box3<T>) -> T {
    overlap_ratio_min(a, b)
}

/// Cuts the box by a plane perpendicular to `axis`.
///
/// `position` is not clamped; a plane outside the box yields one invalid part.
pub fn split<T: SimdFloat>(b: &Box3<T>, axis: Axis, position: T) -> (Box3<T>, Box3<T>) {
    let mut left = *b;
    let mut right = *b;
    left.max[axis.index()] = position;
    right.min[axis.index()] = position;
    (left, right)
}

/// Corners of the box, the `max` corner first and the `min` corner last.
pub fn compute_vertices<T: SimdFloat>(b: &Box3<T>) -> [Point3<T>; 8] {
    let (lo, hi) = (&b.min, &b.max);
    [
        Point3::new(hi.x, hi.y, hi.z),
        Point3::new(lo.x, hi.y, hi.z),
        Point3::new(lo.x, lo.y, hi.z),
        Point3::new(hi.x, lo.y, hi.z),
        Point3::new(lo.x, hi.y, lo.z),
        Point3::new(hi.x, hi.y, lo.z),
        Point3::new(hi.x, lo.y, lo.z),
        Point3::new(lo.x, lo.y, lo.z),
    ]
}

impl<T: Scalar + Copy> Rect<T> {
    pub fn width(&self) -> T
    where
        T: std::ops::Sub<Output = T>,
    {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> T
    where
        T: std::ops::Sub<Output = T>,
    {
        self.max.y - self.min.y
    }
}
