use super::compiler::{Source, to_query};
use super::context::Context;
use super::error::QueryError;
use crate::core::models::atom::Atom;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Tag of fragments produced by a complement.
pub const COMPLEMENT_TAG: usize = usize::MAX;

/// An immutable, sorted, duplicate-free set of active atoms.
///
/// Structural identity (hash code, fingerprints, residue/chain/entity index sets) is
/// computed on first access and cached.
#[derive(Clone)]
pub struct Fragment {
    tag: usize,
    atom_indices: Vec<usize>,
    context: Context,
    hash_code: OnceLock<u64>,
    fingerprint: OnceLock<String>,
    auth_fingerprint: OnceLock<String>,
    owners: OnceLock<Owners>,
}

#[derive(Debug, Clone)]
struct Owners {
    residues: Vec<usize>,
    chains: Vec<usize>,
    entities: Vec<usize>,
}

impl Fragment {
    /// Creates a fragment, validating every invariant.
    ///
    /// # Errors
    ///
    /// - [`QueryError::EmptyFragment`] if `atom_indices` is empty.
    /// - [`QueryError::UnsortedAtomIndices`] unless `atom_indices` is strictly increasing.
    /// - [`QueryError::AtomIndexOutOfBounds`] / [`QueryError::AtomNotInContext`] if an
    ///   index is not an active atom of `context`.
    pub fn new(context: &Context, tag: usize, atom_indices: Vec<usize>) -> Result<Self, QueryError> {
        if atom_indices.is_empty() {
            return Err(QueryError::EmptyFragment);
        }
        if let Some(w) = atom_indices.windows(2).find(|w| w[0] >= w[1]) {
            return Err(QueryError::UnsortedAtomIndices {
                previous: w[0],
                next: w[1],
            });
        }
        let count = context.structure().atom_count();
        for &index in &atom_indices {
            if index >= count {
                return Err(QueryError::AtomIndexOutOfBounds { index, count });
            }
            if !context.has_atom(index) {
                return Err(QueryError::AtomNotInContext { index });
            }
        }
        Ok(Self::from_sorted(context, tag, atom_indices))
    }

    /// Creates a fragment from an arbitrary collection of atoms; the tag is the
    /// smallest index.
    pub fn of_set(
        context: &Context,
        atom_indices: impl IntoIterator<Item = usize>,
    ) -> Result<Self, QueryError> {
        let mut indices: Vec<usize> = atom_indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        let tag = indices.first().copied().ok_or(QueryError::EmptyFragment)?;
        Self::new(context, tag, indices)
    }

    pub fn of_index(context: &Context, index: usize) -> Result<Self, QueryError> {
        Self::new(context, index, vec![index])
    }

    /// Creates a fragment of the active atoms of `[start, end)`.
    pub fn of_index_range(context: &Context, start: usize, end: usize) -> Result<Self, QueryError> {
        let count = context.structure().atom_count();
        if end > count {
            return Err(QueryError::AtomIndexOutOfBounds {
                index: end - 1,
                count,
            });
        }
        let indices: Vec<usize> = context.atoms_in_range(start..end).collect();
        let tag = indices.first().copied().ok_or(QueryError::EmptyFragment)?;
        Ok(Self::from_sorted(context, tag, indices))
    }

    /// Callers guarantee the invariants [`Fragment::new`] checks.
    pub(crate) fn from_sorted(context: &Context, tag: usize, atom_indices: Vec<usize>) -> Self {
        debug_assert!(!atom_indices.is_empty());
        debug_assert!(atom_indices.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(atom_indices.iter().all(|&i| context.has_atom(i)));
        Self {
            tag,
            atom_indices,
            context: context.clone(),
            hash_code: OnceLock::new(),
            fingerprint: OnceLock::new(),
            auth_fingerprint: OnceLock::new(),
            owners: OnceLock::new(),
        }
    }

    /// Like [`Fragment::from_sorted`] with the first atom as tag; `None` when empty.
    pub(crate) fn from_sorted_first(context: &Context, atom_indices: Vec<usize>) -> Option<Self> {
        let tag = *atom_indices.first()?;
        Some(Self::from_sorted(context, tag, atom_indices))
    }

    /// The same atoms bound to another context of the same model.
    pub(crate) fn rebind(&self, context: &Context) -> Self {
        Self {
            context: context.clone(),
            ..self.clone()
        }
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn atom_indices(&self) -> &[usize] {
        &self.atom_indices
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn atom_count(&self) -> usize {
        self.atom_indices.len()
    }

    /// `<model id>_<tag>`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.context.structure().id(), self.tag)
    }

    /// Whether the residue owning the tag atom is a HET group.
    pub fn is_het(&self) -> bool {
        let model = self.context.structure();
        model
            .atoms()
            .get(self.tag)
            .is_some_and(|atom| model.residues()[atom.residue_index].is_het)
    }

    /// Structural hash of the atom set.
    ///
    /// Equal sets always hash equally; distinct sets may collide, so the hash is only
    /// a pre-filter for [`Fragment::are_equal`].
    pub fn hash_code(&self) -> u64 {
        *self.hash_code.get_or_init(|| {
            self.atom_indices.iter().fold(23u64, |hash, &i| {
                hash.wrapping_mul(31).wrapping_add(i as u64)
            })
        })
    }

    /// Sorted, comma-joined identifiers of the covered residues (internal naming).
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.get_or_init(|| {
            let residues = self.context.structure().residues();
            self.residue_indices()
                .iter()
                .map(|&r| residues[r].label())
                .sorted()
                .join(",")
        })
    }

    /// Like [`fingerprint`](Self::fingerprint), using author naming.
    pub fn auth_fingerprint(&self) -> &str {
        self.auth_fingerprint.get_or_init(|| {
            let residues = self.context.structure().residues();
            self.residue_indices()
                .iter()
                .map(|&r| residues[r].auth_label())
                .sorted()
                .join(",")
        })
    }

    pub fn residue_indices(&self) -> &[usize] {
        &self.owners().residues
    }

    pub fn chain_indices(&self) -> &[usize] {
        &self.owners().chains
    }

    pub fn entity_indices(&self) -> &[usize] {
        &self.owners().entities
    }

    fn owners(&self) -> &Owners {
        self.owners.get_or_init(|| {
            let atoms = self.context.structure().atoms();
            let collect = |f: fn(&Atom) -> usize| -> Vec<usize> {
                self.atom_indices
                    .iter()
                    .map(|&i| f(&atoms[i]))
                    .sorted_unstable()
                    .dedup()
                    .collect()
            };
            Owners {
                residues: collect(|a| a.residue_index),
                chains: collect(|a| a.chain_index),
                entities: collect(|a| a.entity_index),
            }
        })
    }

    /// Whether two fragments cover exactly the same atoms.
    pub fn are_equal(a: &Fragment, b: &Fragment) -> bool {
        a.atom_indices.len() == b.atom_indices.len()
            && a.hash_code() == b.hash_code()
            && a.atom_indices == b.atom_indices
    }

    /// Runs `source` in a new context whose active atoms are this fragment's atoms.
    pub fn find(&self, source: impl Into<Source>) -> Result<FragmentSeq, QueryError> {
        let query = to_query(source)?;
        let scoped = Context::of_sorted_members(
            self.context.structure().clone(),
            self.atom_indices.clone(),
            *self.context.config(),
        );
        query.execute(&scoped)
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("tag", &self.tag)
            .field("atom_indices", &self.atom_indices)
            .finish()
    }
}

/// The ordered result of one query evaluation.
#[derive(Debug, Clone)]
pub struct FragmentSeq {
    context: Context,
    fragments: Vec<Fragment>,
}

impl FragmentSeq {
    pub fn new(context: &Context, fragments: Vec<Fragment>) -> Self {
        Self {
            context: context.clone(),
            fragments,
        }
    }

    pub fn empty(context: &Context) -> Self {
        Self::new(context, Vec::new())
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fragment> {
        self.fragments.iter()
    }

    /// All atoms of all fragments, sorted and deduplicated.
    pub fn union_atom_indices(&self) -> Vec<usize> {
        self.fragments
            .iter()
            .map(|f| f.atom_indices.iter().copied())
            .kmerge()
            .dedup()
            .collect()
    }

    /// One fragment covering [`union_atom_indices`](Self::union_atom_indices); `None`
    /// for an empty sequence.
    pub fn union_fragment(&self) -> Option<Fragment> {
        Fragment::from_sorted_first(&self.context, self.union_atom_indices())
    }
}

impl<'a> IntoIterator for &'a FragmentSeq {
    type Item = &'a Fragment;
    type IntoIter = std::slice::Iter<'a, Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.fragments.iter()
    }
}

/// Collects fragments unconditionally, preserving order and duplicates.
pub struct FragmentSeqBuilder {
    context: Context,
    fragments: Vec<Fragment>,
}

impl FragmentSeqBuilder {
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            fragments: Vec::new(),
        }
    }

    pub fn add(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn build(self) -> FragmentSeq {
        FragmentSeq {
            context: self.context,
            fragments: self.fragments,
        }
    }
}

/// Collects fragments, skipping any equal (same atom set) to one already added.
pub struct HashFragmentSeqBuilder {
    context: Context,
    fragments: Vec<Fragment>,
    by_hash: HashMap<u64, Vec<usize>>,
}

impl HashFragmentSeqBuilder {
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            fragments: Vec::new(),
            by_hash: HashMap::new(),
        }
    }

    /// Adds `fragment` unless an equal one is present; returns whether it was added.
    pub fn add(&mut self, fragment: Fragment) -> bool {
        let bucket = self.by_hash.entry(fragment.hash_code()).or_default();
        if bucket
            .iter()
            .any(|&i| Fragment::are_equal(&self.fragments[i], &fragment))
        {
            return false;
        }
        bucket.push(self.fragments.len());
        self.fragments.push(fragment);
        true
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn build(self) -> FragmentSeq {
        FragmentSeq {
            context: self.context,
            fragments: self.fragments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::builder;
    use crate::query::fixtures::{sample_context, sample_model};

    #[test]
    fn new_rejects_broken_invariants() {
        let ctx = Context::of_atom_indices(sample_model(), &[0, 1, 2, 5]).unwrap();
        assert!(matches!(
            Fragment::new(&ctx, 0, vec![]),
            Err(QueryError::EmptyFragment)
        ));
        assert!(matches!(
            Fragment::new(&ctx, 0, vec![1, 0]),
            Err(QueryError::UnsortedAtomIndices { previous: 1, next: 0 })
        ));
        assert!(matches!(
            Fragment::new(&ctx, 0, vec![1, 1]),
            Err(QueryError::UnsortedAtomIndices { .. })
        ));
        assert!(matches!(
            Fragment::new(&ctx, 0, vec![0, 3]),
            Err(QueryError::AtomNotInContext { index: 3 })
        ));
        assert!(matches!(
            Fragment::new(&ctx, 0, vec![0, 1000]),
            Err(QueryError::AtomIndexOutOfBounds { index: 1000, .. })
        ));
        assert!(Fragment::new(&ctx, 1, vec![0, 2, 5]).is_ok());
    }

    #[test]
    fn of_set_sorts_and_dedups() {
        let ctx = sample_context();
        let f = Fragment::of_set(&ctx, [4, 2, 4, 3]).unwrap();
        assert_eq!(f.atom_indices(), &[2, 3, 4]);
        assert_eq!(f.tag(), 2);
        assert_eq!(f.atom_count(), 3);
    }

    #[test]
    fn of_index_range_keeps_active_atoms_only() {
        let ctx = Context::of_atom_indices(sample_model(), &[1, 3, 8]).unwrap();
        let f = Fragment::of_index_range(&ctx, 0, 5).unwrap();
        assert_eq!(f.atom_indices(), &[1, 3]);
        assert_eq!(f.tag(), 1);
        assert!(matches!(
            Fragment::of_index_range(&ctx, 4, 6),
            Err(QueryError::EmptyFragment)
        ));
    }

    #[test]
    fn id_and_het_flag_follow_the_tag() {
        let ctx = sample_context();
        let heme = Fragment::of_index(&ctx, 15).unwrap();
        assert_eq!(heme.id(), "1TST_15");
        assert!(heme.is_het());
        assert!(!Fragment::of_index(&ctx, 0).unwrap().is_het());
        let complement = Fragment::from_sorted(&ctx, COMPLEMENT_TAG, vec![0]);
        assert!(!complement.is_het());
    }

    #[test]
    fn owner_indices_are_sorted_and_unique() {
        let ctx = sample_context();
        let f = Fragment::of_set(&ctx, [16, 0, 1, 6, 17]).unwrap();
        assert_eq!(f.residue_indices(), &[0, 1, 3, 4]);
        assert_eq!(f.chain_indices(), &[0, 1, 2]);
        assert_eq!(f.entity_indices(), &[0, 1, 2]);
    }

    #[test]
    fn fingerprints_list_sorted_residue_labels() {
        let ctx = sample_context();
        let f = Fragment::of_set(&ctx, [15, 5, 0]).unwrap();
        assert_eq!(f.fingerprint(), "ALA A 1,GLY A 2,HEM B 100");
        assert_eq!(f.auth_fingerprint(), "ALA A 1,GLY A 2,HEM X 100");

        let reordered = Fragment::of_set(&ctx, [0, 15, 5]).unwrap();
        assert_eq!(f.fingerprint(), reordered.fingerprint());
    }

    #[test]
    fn are_equal_is_reflexive_and_symmetric() {
        let ctx = sample_context();
        let a = Fragment::of_set(&ctx, [1, 2, 3]).unwrap();
        let b = Fragment::new(&ctx, 99, vec![1, 2, 3]).unwrap();
        let c = Fragment::of_set(&ctx, [1, 2, 4]).unwrap();
        assert!(Fragment::are_equal(&a, &a));
        assert!(Fragment::are_equal(&a, &b) && Fragment::are_equal(&b, &a));
        assert!(!Fragment::are_equal(&a, &c) && !Fragment::are_equal(&c, &a));
    }

    #[test]
    fn hash_collisions_do_not_make_fragments_equal() {
        let ctx = Context::of_structure(crate::query::fixtures::line_model(100));
        let a = Fragment::of_set(&ctx, [0, 62]).unwrap();
        let b = Fragment::of_set(&ctx, [1, 31]).unwrap();
        assert_eq!(a.hash_code(), b.hash_code());
        assert!(!Fragment::are_equal(&a, &b));

        let mut seq = HashFragmentSeqBuilder::new(&ctx);
        assert!(seq.add(a));
        assert!(seq.add(b));
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn hash_builder_skips_duplicates_but_plain_builder_keeps_them() {
        let ctx = sample_context();
        let a = Fragment::of_set(&ctx, [1, 2]).unwrap();
        let b = Fragment::new(&ctx, 7, vec![1, 2]).unwrap();

        let mut unique = HashFragmentSeqBuilder::new(&ctx);
        assert!(unique.add(a.clone()));
        assert!(!unique.add(b.clone()));
        assert_eq!(unique.build().len(), 1);

        let mut all = FragmentSeqBuilder::new(&ctx);
        all.add(a);
        all.add(b);
        let seq = all.build();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.fragments()[1].tag(), 7);
    }

    #[test]
    fn union_merges_all_fragments() {
        let ctx = sample_context();
        let seq = FragmentSeq::new(
            &ctx,
            vec![
                Fragment::of_set(&ctx, [5, 9]).unwrap(),
                Fragment::of_set(&ctx, [1, 5, 7]).unwrap(),
                Fragment::of_index(&ctx, 0).unwrap(),
            ],
        );
        assert_eq!(seq.union_atom_indices(), vec![0, 1, 5, 7, 9]);
        let union = seq.union_fragment().unwrap();
        assert_eq!(union.atom_indices(), &[0, 1, 5, 7, 9]);
        assert!(FragmentSeq::empty(&ctx).union_fragment().is_none());
        assert!(FragmentSeq::empty(&ctx).union_atom_indices().is_empty());
    }

    #[test]
    fn find_runs_in_a_context_scoped_to_the_fragment() {
        let ctx = sample_context();
        let first_two_residues = Fragment::of_index_range(&ctx, 0, 9).unwrap();
        let found = first_two_residues
            .find(builder::atoms_by_name(["CA"]))
            .unwrap();
        assert_eq!(found.union_atom_indices(), vec![1, 6]);
        assert_eq!(found.context().atom_count(), 9);

        let text = first_two_residues.find("atomsByElement(\"O\")").unwrap();
        assert_eq!(text.union_atom_indices(), vec![3, 8]);
    }

    #[test]
    fn context_of_fragments_uses_the_union() {
        let ctx = sample_context();
        let seq = FragmentSeq::new(
            &ctx,
            vec![
                Fragment::of_set(&ctx, [2, 4]).unwrap(),
                Fragment::of_set(&ctx, [4, 6]).unwrap(),
            ],
        );
        let sub = Context::of_fragments(&seq);
        assert_eq!(sub.atom_indices().collect::<Vec<_>>(), vec![2, 4, 6]);
        assert!(!sub.is_complete());
    }
}
