use super::atom::Atom;
use super::chain::Chain;
use super::entity::{Entity, EntityType};
use super::residue::Residue;
use crate::core::utils::identifiers::is_water_residue;

/// A complete, read-only molecular model snapshot.
///
/// The four tables are stored in hierarchical order: entities own contiguous chain
/// ranges, chains own contiguous residue ranges and residues own contiguous atom
/// ranges. Instances are produced by
/// [`MoleculeModelBuilder`](super::builder::MoleculeModelBuilder) and never change
/// afterwards; the query layer shares them behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct MoleculeModel {
    pub(crate) id: String,
    pub(crate) model_id: String,
    pub(crate) atoms: Vec<Atom>,
    pub(crate) residues: Vec<Residue>,
    pub(crate) chains: Vec<Chain>,
    pub(crate) entities: Vec<Entity>,
}

impl MoleculeModel {
    /// The identifier of the molecule this model belongs to (e.g., a PDB id).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The identifier of this model within the molecule.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Returns the entity classification of the residue at `residue_index`.
    ///
    /// # Panics
    ///
    /// Panics if `residue_index` is out of bounds.
    pub fn residue_entity_type(&self, residue_index: usize) -> EntityType {
        let entity_index = self.residues[residue_index].entity_index;
        self.entities[entity_index].entity_type
    }

    /// Whether the residue at `residue_index` is a solvent molecule.
    ///
    /// Entities typed as water always are; for untyped entities the residue name is
    /// looked up in the known water names.
    ///
    /// # Panics
    ///
    /// Panics if `residue_index` is out of bounds.
    pub fn is_water_residue(&self, residue_index: usize) -> bool {
        match self.residue_entity_type(residue_index) {
            EntityType::Water => true,
            EntityType::Unknown => is_water_residue(&self.residues[residue_index].name),
            EntityType::Polymer | EntityType::NonPolymer => false,
        }
    }
}
