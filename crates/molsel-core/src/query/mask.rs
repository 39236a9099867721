use super::error::QueryError;
use std::ops::Range;

/// The set of atoms active in a [`Context`](super::context::Context).
///
/// Membership tests are O(1). Members can also be enumerated in ascending order.
#[derive(Debug, Clone)]
pub struct Mask {
    model_atom_count: usize,
    kind: MaskKind,
}

#[derive(Debug, Clone)]
enum MaskKind {
    All,
    Subset { flags: Vec<bool>, members: Vec<usize> },
}

impl Mask {
    /// A mask covering every atom of a model with `model_atom_count` atoms.
    pub fn all(model_atom_count: usize) -> Self {
        Self {
            model_atom_count,
            kind: MaskKind::All,
        }
    }

    /// A mask covering exactly `indices`, in any order and with duplicates allowed.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::AtomIndexOutOfBounds`] if an index is not an atom of the model.
    pub fn of_indices(model_atom_count: usize, indices: &[usize]) -> Result<Self, QueryError> {
        if let Some(&index) = indices.iter().find(|&&i| i >= model_atom_count) {
            return Err(QueryError::AtomIndexOutOfBounds {
                index,
                count: model_atom_count,
            });
        }
        let mut members = indices.to_vec();
        members.sort_unstable();
        members.dedup();
        Ok(Self::of_sorted_members(model_atom_count, members))
    }

    /// Callers guarantee `members` is sorted, unique and in bounds.
    pub(crate) fn of_sorted_members(model_atom_count: usize, members: Vec<usize>) -> Self {
        debug_assert!(members.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(members.last().is_none_or(|&m| m < model_atom_count));

        let mut flags = vec![false; model_atom_count];
        for &m in &members {
            flags[m] = true;
        }
        Self {
            model_atom_count,
            kind: MaskKind::Subset { flags, members },
        }
    }

    #[inline]
    pub fn has(&self, index: usize) -> bool {
        match &self.kind {
            MaskKind::All => index < self.model_atom_count,
            MaskKind::Subset { flags, .. } => flags.get(index).copied().unwrap_or(false),
        }
    }

    /// Whether at least one atom of `range` is active.
    pub fn has_range(&self, range: Range<usize>) -> bool {
        match &self.kind {
            MaskKind::All => range.start < range.end.min(self.model_atom_count),
            MaskKind::Subset { .. } => range.into_iter().any(|i| self.has(i)),
        }
    }

    /// Number of active atoms.
    pub fn size(&self) -> usize {
        match &self.kind {
            MaskKind::All => self.model_atom_count,
            MaskKind::Subset { members, .. } => members.len(),
        }
    }

    pub fn model_atom_count(&self) -> usize {
        self.model_atom_count
    }

    pub fn is_complete(&self) -> bool {
        self.size() == self.model_atom_count
    }

    /// Active atoms in ascending order.
    pub fn iter(&self) -> MaskIter<'_> {
        match &self.kind {
            MaskKind::All => MaskIter::All(0..self.model_atom_count),
            MaskKind::Subset { members, .. } => MaskIter::Subset(members.iter()),
        }
    }

    /// Active atoms of `range` in ascending order.
    pub fn iter_range(&self, range: Range<usize>) -> impl Iterator<Item = usize> + '_ {
        let end = range.end.min(self.model_atom_count);
        (range.start..end).filter(move |&i| self.has(i))
    }
}

pub enum MaskIter<'a> {
    All(Range<usize>),
    Subset(std::slice::Iter<'a, usize>),
}

impl Iterator for MaskIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            MaskIter::All(range) => range.next(),
            MaskIter::Subset(iter) => iter.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            MaskIter::All(range) => range.size_hint(),
            MaskIter::Subset(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for MaskIter<'_> {}
