use super::config::QueryConfig;
use super::error::QueryError;
use super::fragment::FragmentSeq;
use super::mask::{Mask, MaskIter};
use crate::core::geometry::{GeometryError, SpatialTree};
use crate::core::models::model::MoleculeModel;
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// The environment every query executes against.
///
/// A context pairs a read-only model with the [`Mask`] of currently active atoms and
/// owns a spatial index over the active atoms' coordinates. The index is built at
/// most once, on first use (or at creation when [`QueryConfig::eager_tree`] is set);
/// concurrent first access from several threads is safe.
///
/// Cloning is cheap: clones share the same model, mask and index.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    structure: Arc<MoleculeModel>,
    mask: Mask,
    config: QueryConfig,
    tree: OnceLock<Result<SpatialTree<usize>, GeometryError>>,
}

impl Context {
    /// A context in which every atom of `structure` is active.
    pub fn of_structure(structure: Arc<MoleculeModel>) -> Self {
        Self::of_structure_with_config(structure, QueryConfig::default())
    }

    pub fn of_structure_with_config(structure: Arc<MoleculeModel>, config: QueryConfig) -> Self {
        let mask = Mask::all(structure.atom_count());
        Self::new(structure, mask, config)
    }

    /// A context in which exactly `atom_indices` are active.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::AtomIndexOutOfBounds`] if an index is not an atom of
    /// `structure`.
    pub fn of_atom_indices(
        structure: Arc<MoleculeModel>,
        atom_indices: &[usize],
    ) -> Result<Self, QueryError> {
        Self::of_atom_indices_with_config(structure, atom_indices, QueryConfig::default())
    }

    pub fn of_atom_indices_with_config(
        structure: Arc<MoleculeModel>,
        atom_indices: &[usize],
        config: QueryConfig,
    ) -> Result<Self, QueryError> {
        let mask = Mask::of_indices(structure.atom_count(), atom_indices)?;
        Ok(Self::new(structure, mask, config))
    }

    /// A context whose active atoms are the union of the atoms of `seq`.
    ///
    /// The new context shares the model and configuration of the context `seq` was
    /// produced in.
    pub fn of_fragments(seq: &FragmentSeq) -> Self {
        let parent = seq.context();
        Self::of_sorted_members(
            parent.inner.structure.clone(),
            seq.union_atom_indices(),
            parent.inner.config,
        )
    }

    pub(crate) fn of_sorted_members(
        structure: Arc<MoleculeModel>,
        members: Vec<usize>,
        config: QueryConfig,
    ) -> Self {
        let mask = Mask::of_sorted_members(structure.atom_count(), members);
        Self::new(structure, mask, config)
    }

    fn new(structure: Arc<MoleculeModel>, mask: Mask, config: QueryConfig) -> Self {
        debug!(
            atoms = mask.size(),
            model_atoms = structure.atom_count(),
            "Query context created."
        );
        let ctx = Self {
            inner: Arc::new(ContextInner {
                structure,
                mask,
                config,
                tree: OnceLock::new(),
            }),
        };
        if config.eager_tree {
            // A failed build is cached and reported by the first spatial query.
            let _ = ctx.tree();
        }
        ctx
    }

    pub fn structure(&self) -> &Arc<MoleculeModel> {
        &self.inner.structure
    }

    pub fn mask(&self) -> &Mask {
        &self.inner.mask
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    /// Number of active atoms.
    pub fn atom_count(&self) -> usize {
        self.inner.mask.size()
    }

    /// Whether every atom of the model is active.
    pub fn is_complete(&self) -> bool {
        self.inner.mask.is_complete()
    }

    #[inline]
    pub fn has_atom(&self, index: usize) -> bool {
        self.inner.mask.has(index)
    }

    /// Whether any atom of `[start, end)` is active.
    pub fn has_range(&self, start: usize, end: usize) -> bool {
        self.inner.mask.has_range(start..end)
    }

    /// Active atom indices in ascending order.
    pub fn atom_indices(&self) -> MaskIter<'_> {
        self.inner.mask.iter()
    }

    pub(crate) fn atoms_in_range(&self, range: Range<usize>) -> impl Iterator<Item = usize> + '_ {
        self.inner.mask.iter_range(range)
    }

    /// The spatial index over the active atoms.
    ///
    /// The tree's data are atom indices, so a hit `h` reported by a query maps back to
    /// the atom `tree.data()[h]`.
    pub fn tree(&self) -> Result<&SpatialTree<usize>, QueryError> {
        let built = self.inner.tree.get_or_init(|| {
            let atoms = self.inner.structure.atoms();
            let members: Vec<usize> = self.inner.mask.iter().collect();
            debug!(
                atoms = members.len(),
                leaf_size = self.inner.config.leaf_size,
                "Building spatial index for query context."
            );
            SpatialTree::new(members, |&i| atoms[i].position, self.inner.config.leaf_size)
        });
        built.as_ref().map_err(|e| QueryError::from(e.clone()))
    }

    /// Whether two handles refer to the same context.
    pub fn ptr_eq(a: &Context, b: &Context) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("structure", &self.inner.structure.id())
            .field("atom_count", &self.atom_count())
            .field("is_complete", &self.is_complete())
            .field("tree_built", &self.inner.tree.get().is_some())
            .finish()
    }
}
