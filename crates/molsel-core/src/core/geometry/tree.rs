use super::bounds::Box3D;
use super::buffer::{IndexBuffer, PriorityBuffer, ResultBuffer};
use super::error::{GeometryError, check_radius};
use nalgebra::Point3;
use tracing::{debug, instrument};

/// Default maximum number of points stored in a leaf.
pub const DEFAULT_LEAF_SIZE: usize = 32;

/// A node of a [`SpatialTree`].
///
/// Every node covers the contiguous range `[start, end)` of the tree's permutation.
/// Internal nodes have both children; leaves have neither. For an internal node at
/// depth `d` the split dimension is `d % 3`, every point of the left child has a
/// coordinate `<= split_value` along it and every point of the right child `>=`.
#[derive(Debug, Clone)]
pub struct TreeNode {
    split_value: f64,
    start: usize,
    end: usize,
    left: Option<Box<TreeNode>>,
    right: Option<Box<TreeNode>>,
}

impl TreeNode {
    fn leaf(start: usize, end: usize) -> Self {
        Self {
            split_value: 0.0,
            start,
            end,
            left: None,
            right: None,
        }
    }

    pub fn split_value(&self) -> f64 {
        self.split_value
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn left(&self) -> Option<&TreeNode> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&TreeNode> {
        self.right.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn nearest<T, B: ResultBuffer>(&self, ctx: &mut SpatialQuery<'_, T, B>, dim: usize) {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => {
                let pivot = ctx.pivot[dim];
                let next = (dim + 1) % 3;
                if pivot - ctx.radius <= self.split_value {
                    left.nearest(ctx, next);
                }
                if pivot + ctx.radius >= self.split_value {
                    right.nearest(ctx, next);
                }
            }
            _ => self.nearest_leaf(ctx),
        }
    }

    fn nearest_leaf<T, B: ResultBuffer>(&self, ctx: &mut SpatialQuery<'_, T, B>) {
        let tree = ctx.tree;
        let [px, py, pz] = ctx.pivot;
        for slot in self.start..self.end {
            let o = 3 * slot;
            let dx = tree.positions[o] - px;
            let dy = tree.positions[o + 1] - py;
            let dz = tree.positions[o + 2] - pz;
            let dist_sq = dx * dx + dy * dy + dz * dz;
            if dist_sq <= ctx.radius_sq {
                ctx.buffer.add(dist_sq, tree.indices[slot]);
            }
        }
    }
}

/// A kd-like tree over a static 3D point set.
///
/// `data` keeps the caller's elements in their original order; result buffers report
/// positions into `data`. `indices` is the build-time permutation of those positions
/// and `positions` holds the interleaved `x, y, z` coordinates in permutation order so
/// that leaf scans walk contiguous memory.
#[derive(Debug, Clone)]
pub struct SpatialTree<T> {
    data: Vec<T>,
    indices: Vec<usize>,
    positions: Vec<f64>,
    slots: Vec<usize>,
    root: Option<TreeNode>,
    bounds: Box3D,
    leaf_size: usize,
}

impl<T> SpatialTree<T> {
    /// Builds a tree over `data`, locating each element with `position_of`.
    ///
    /// Construction runs in `O(M log M)`: every level partitions its ranges around the
    /// median with a linear-time three-way quickselect, which also keeps degenerate
    /// inputs (duplicates, colinear points) from degrading to quadratic time.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidLeafSize`] if `leaf_size` is zero.
    #[instrument(skip_all, fields(points = data.len(), leaf_size))]
    pub fn new<F>(data: Vec<T>, position_of: F, leaf_size: usize) -> Result<Self, GeometryError>
    where
        F: Fn(&T) -> Point3<f64>,
    {
        if leaf_size == 0 {
            return Err(GeometryError::InvalidLeafSize);
        }

        let mut bounds = Box3D::empty();
        let mut positions = Vec::with_capacity(3 * data.len());
        for element in &data {
            let p = position_of(element);
            bounds.include(&p);
            positions.extend_from_slice(&[p.x, p.y, p.z]);
        }

        let mut indices: Vec<usize> = (0..data.len()).collect();
        let root = if data.is_empty() {
            None
        } else {
            Some(build_node(&mut indices, &mut positions, 0, data.len(), 0, leaf_size))
        };

        let mut slots = vec![0; data.len()];
        for (slot, &index) in indices.iter().enumerate() {
            slots[index] = slot;
        }

        debug!(points = data.len(), "Spatial tree built.");
        Ok(Self {
            data,
            indices,
            positions,
            slots,
            root,
            bounds,
            leaf_size,
        })
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns the element a result-buffer index refers to.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    pub fn bounds(&self) -> &Box3D {
        &self.bounds
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Position of the element at `index` in the original data order.
    pub fn position(&self, index: usize) -> Option<Point3<f64>> {
        let slot = *self.slots.get(index)?;
        let o = 3 * slot;
        Some(Point3::new(
            self.positions[o],
            self.positions[o + 1],
            self.positions[o + 2],
        ))
    }

    /// Creates a query context that reports hit indices only.
    pub fn query(&self, capacity: usize) -> SpatialQuery<'_, T, IndexBuffer> {
        SpatialQuery::new(self, IndexBuffer::with_capacity(capacity))
    }

    /// Creates a query context that also records squared distances.
    pub fn priority_query(&self, capacity: usize) -> SpatialQuery<'_, T, PriorityBuffer> {
        SpatialQuery::new(self, PriorityBuffer::with_capacity(capacity))
    }
}

/// Query context binding a tree to a result buffer.
///
/// Each call to [`nearest`](Self::nearest) or [`nearest_index`](Self::nearest_index)
/// overwrites the previous result.
pub struct SpatialQuery<'a, T, B: ResultBuffer> {
    tree: &'a SpatialTree<T>,
    buffer: B,
    pivot: [f64; 3],
    radius: f64,
    radius_sq: f64,
}

impl<'a, T, B: ResultBuffer> SpatialQuery<'a, T, B> {
    pub fn new(tree: &'a SpatialTree<T>, buffer: B) -> Self {
        Self {
            tree,
            buffer,
            pivot: [0.0; 3],
            radius: 0.0,
            radius_sq: 0.0,
        }
    }

    /// Finds every point within `radius` (inclusive) of `point`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidRadius`] for negative or non-finite radii.
    pub fn nearest(&mut self, point: &Point3<f64>, radius: f64) -> Result<&B, GeometryError> {
        check_radius(radius)?;
        self.pivot = [point.x, point.y, point.z];
        self.radius = radius;
        self.radius_sq = radius * radius;
        self.buffer.reset();

        let tree = self.tree;
        if let Some(root) = &tree.root {
            root.nearest(self, 0);
        }
        Ok(&self.buffer)
    }

    /// Like [`nearest`](Self::nearest), using the position of the `index`-th data element
    /// as the pivot. The element itself is reported (its distance is zero).
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::IndexOutOfBounds`] if `index` is not a data index.
    pub fn nearest_index(&mut self, index: usize, radius: f64) -> Result<&B, GeometryError> {
        let point = self
            .tree
            .position(index)
            .ok_or(GeometryError::IndexOutOfBounds {
                index,
                count: self.tree.len(),
            })?;
        self.nearest(&point, radius)
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }
}

fn build_node(
    indices: &mut [usize],
    positions: &mut [f64],
    start: usize,
    end: usize,
    depth: usize,
    leaf_size: usize,
) -> TreeNode {
    if end - start <= leaf_size {
        return TreeNode::leaf(start, end);
    }

    let dim = depth % 3;
    let mid = start + (end - start) / 2;
    select(indices, positions, start, end, mid, dim);
    let split_value = positions[3 * mid + dim];

    let left = build_node(indices, positions, start, mid, depth + 1, leaf_size);
    let right = build_node(indices, positions, mid, end, depth + 1, leaf_size);

    TreeNode {
        split_value,
        start,
        end,
        left: Some(Box::new(left)),
        right: Some(Box::new(right)),
    }
}

/// Rearranges `[lo, hi)` so that slot `k` holds the value it would hold if the range
/// were sorted along `dim`, with smaller-or-equal values before it and
/// greater-or-equal values after it.
fn select(
    indices: &mut [usize],
    positions: &mut [f64],
    mut lo: usize,
    mut hi: usize,
    k: usize,
    dim: usize,
) {
    while hi - lo > 1 {
        let pivot = median_of_three(positions, lo, hi - 1, dim);

        // [lo, lt) < pivot, [lt, gt) == pivot, [gt, hi) > pivot
        let (mut lt, mut i, mut gt) = (lo, lo, hi);
        while i < gt {
            let v = positions[3 * i + dim];
            if v < pivot {
                swap_slots(indices, positions, lt, i);
                lt += 1;
                i += 1;
            } else if v > pivot {
                gt -= 1;
                swap_slots(indices, positions, i, gt);
            } else {
                i += 1;
            }
        }

        if k < lt {
            hi = lt;
        } else if k >= gt {
            lo = gt;
        } else {
            return;
        }
    }
}

fn median_of_three(positions: &[f64], lo: usize, hi: usize, dim: usize) -> f64 {
    let a = positions[3 * lo + dim];
    let b = positions[3 * (lo + (hi - lo) / 2) + dim];
    let c = positions[3 * hi + dim];
    if (a <= b) == (b <= c) {
        b
    } else if (b <= a) == (a <= c) {
        a
    } else {
        c
    }
}

#[inline]
fn swap_slots(indices: &mut [usize], positions: &mut [f64], a: usize, b: usize) {
    if a == b {
        return;
    }
    indices.swap(a, b);
    for d in 0..3 {
        positions.swap(3 * a + d, 3 * b + d);
    }
}
