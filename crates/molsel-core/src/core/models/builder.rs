use super::atom::Atom;
use super::chain::Chain;
use super::entity::{Entity, EntityType};
use super::model::MoleculeModel;
use super::residue::Residue;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ModelError {
    #[error("Cannot start a chain before starting an entity")]
    NoActiveEntity,
    #[error("Cannot start a residue before starting a chain")]
    NoActiveChain,
    #[error("Cannot add an atom before starting a residue")]
    NoActiveResidue,
    #[error("Residue {name} {seq_number} (row {index}) has no atoms")]
    EmptyResidue {
        index: usize,
        name: String,
        seq_number: i32,
    },
}

/// Hierarchical builder for [`MoleculeModel`].
///
/// Rows must be added in hierarchical order (entity, chain, residue, atoms); every
/// range and back-index is maintained as rows are appended, so a model is consistent
/// at every step.
pub struct MoleculeModelBuilder {
    model: MoleculeModel,

    // --- Builder-specific state for efficient construction ---
    current_entity_idx: Option<usize>,
    current_chain_idx: Option<usize>,
    current_residue_idx: Option<usize>,
}

impl MoleculeModelBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            model: MoleculeModel {
                id: id.to_string(),
                model_id: "1".to_string(),
                ..MoleculeModel::default()
            },
            current_entity_idx: None,
            current_chain_idx: None,
            current_residue_idx: None,
        }
    }

    pub fn model_id(&mut self, model_id: &str) -> &mut Self {
        self.model.model_id = model_id.to_string();
        self
    }

    pub fn start_entity(
        &mut self,
        entity_id: &str,
        entity_type: EntityType,
        type_name: &str,
    ) -> &mut Self {
        let mut entity = Entity::new(entity_id, entity_type, type_name);
        entity.atom_range = self.model.atoms.len()..self.model.atoms.len();
        entity.residue_range = self.model.residues.len()..self.model.residues.len();
        entity.chain_range = self.model.chains.len()..self.model.chains.len();

        self.current_entity_idx = Some(self.model.entities.len());
        self.current_chain_idx = None;
        self.current_residue_idx = None;
        self.model.entities.push(entity);
        self
    }

    pub fn start_chain(&mut self, asym_id: &str, auth_asym_id: &str) -> Result<&mut Self, ModelError> {
        let entity_idx = self.current_entity_idx.ok_or(ModelError::NoActiveEntity)?;
        let entity = &mut self.model.entities[entity_idx];

        let mut chain = Chain::new(asym_id, auth_asym_id, &entity.entity_id, entity_idx);
        chain.atom_range = self.model.atoms.len()..self.model.atoms.len();
        chain.residue_range = self.model.residues.len()..self.model.residues.len();

        let chain_idx = self.model.chains.len();
        entity.chain_range.end = chain_idx + 1;
        self.model.chains.push(chain);
        self.current_chain_idx = Some(chain_idx);
        self.current_residue_idx = None;
        Ok(self)
    }

    /// Appends a residue to the current chain.
    ///
    /// The chain and entity columns of `residue` are overwritten with the identifiers
    /// of the current chain and entity.
    pub fn start_residue(&mut self, mut residue: Residue) -> Result<&mut Self, ModelError> {
        let chain_idx = self.current_chain_idx.ok_or(ModelError::NoActiveChain)?;
        let chain = &mut self.model.chains[chain_idx];
        let residue_idx = self.model.residues.len();

        residue.asym_id = chain.asym_id.clone();
        residue.auth_asym_id = chain.auth_asym_id.clone();
        residue.entity_id = chain.entity_id.clone();
        residue.chain_index = chain_idx;
        residue.entity_index = chain.entity_index;
        residue.atom_range = self.model.atoms.len()..self.model.atoms.len();

        chain.residue_range.end = residue_idx + 1;
        self.model.entities[chain.entity_index].residue_range.end = residue_idx + 1;
        self.model.residues.push(residue);
        self.current_residue_idx = Some(residue_idx);
        Ok(self)
    }

    pub fn add_atom(&mut self, mut atom: Atom) -> Result<&mut Self, ModelError> {
        let residue_idx = self.current_residue_idx.ok_or(ModelError::NoActiveResidue)?;
        let atom_idx = self.model.atoms.len();

        let residue = &mut self.model.residues[residue_idx];
        atom.residue_index = residue_idx;
        atom.chain_index = residue.chain_index;
        atom.entity_index = residue.entity_index;
        residue.atom_range.end = atom_idx + 1;

        let (chain_idx, entity_idx) = (residue.chain_index, residue.entity_index);
        self.model.chains[chain_idx].atom_range.end = atom_idx + 1;
        self.model.entities[entity_idx].atom_range.end = atom_idx + 1;
        self.model.atoms.push(atom);
        Ok(self)
    }

    /// Finishes construction.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyResidue`] if a residue was started but never received
    /// any atoms.
    pub fn build(self) -> Result<MoleculeModel, ModelError> {
        if let Some((index, residue)) = self
            .model
            .residues
            .iter()
            .enumerate()
            .find(|(_, r)| r.atom_range.is_empty())
        {
            return Err(ModelError::EmptyResidue {
                index,
                name: residue.name.clone(),
                seq_number: residue.seq_number,
            });
        }
        Ok(self.model)
    }
}
