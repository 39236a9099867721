/// Accumulates the hits of a radius query.
///
/// Implementations are append-only between resets. `reset` clears the contents but
/// keeps the allocation, so a buffer sized for the typical hit count never reallocates
/// in steady state.
pub trait ResultBuffer {
    /// Records a hit at squared distance `dist_sq`.
    fn add(&mut self, dist_sq: f64, index: usize);

    /// Forgets all recorded hits without releasing memory.
    fn reset(&mut self);

    /// Number of hits recorded since the last reset.
    fn count(&self) -> usize;

    /// Recorded point indices, in the order they were found.
    fn indices(&self) -> &[usize];

    /// Squared distances parallel to [`indices`](Self::indices), if this buffer keeps them.
    fn priorities(&self) -> Option<&[f64]>;
}

/// A buffer that only remembers the indices.
#[derive(Debug, Clone, Default)]
pub struct IndexBuffer {
    indices: Vec<usize>,
}

impl IndexBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.indices.capacity()
    }
}

impl ResultBuffer for IndexBuffer {
    #[inline]
    fn add(&mut self, _dist_sq: f64, index: usize) {
        self.indices.push(index);
    }

    #[inline]
    fn reset(&mut self) {
        self.indices.clear();
    }

    fn count(&self) -> usize {
        self.indices.len()
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn priorities(&self) -> Option<&[f64]> {
        None
    }
}

/// A buffer that remembers indices together with their squared distances.
///
/// Useful when the caller needs the hits ordered by distance or only the `k` closest
/// ones after a radius query.
#[derive(Debug, Clone, Default)]
pub struct PriorityBuffer {
    indices: Vec<usize>,
    priorities: Vec<f64>,
}

impl PriorityBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            priorities: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.indices.capacity().min(self.priorities.capacity())
    }

    /// Reorders the recorded hits by ascending squared distance.
    ///
    /// Ties keep their discovery order.
    pub fn sort_by_priority(&mut self) {
        let mut order: Vec<usize> = (0..self.indices.len()).collect();
        order.sort_by(|&a, &b| self.priorities[a].total_cmp(&self.priorities[b]));

        let indices = order.iter().map(|&i| self.indices[i]).collect();
        let priorities = order.iter().map(|&i| self.priorities[i]).collect();
        self.indices = indices;
        self.priorities = priorities;
    }

    /// Returns up to `k` hits closest to the query pivot as `(index, dist_sq)` pairs.
    pub fn nearest(&self, k: usize) -> Vec<(usize, f64)> {
        let mut pairs: Vec<(usize, f64)> = self
            .indices
            .iter()
            .copied()
            .zip(self.priorities.iter().copied())
            .collect();
        pairs.sort_by(|a, b| a.1.total_cmp(&b.1));
        pairs.truncate(k);
        pairs
    }
}

impl ResultBuffer for PriorityBuffer {
    #[inline]
    fn add(&mut self, dist_sq: f64, index: usize) {
        self.indices.push(index);
        self.priorities.push(dist_sq);
    }

    #[inline]
    fn reset(&mut self) {
        self.indices.clear();
        self.priorities.clear();
    }

    fn count(&self) -> usize {
        self.indices.len()
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn priorities(&self) -> Option<&[f64]> {
        Some(&self.priorities)
    }
}
