use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub asym_id: String,             // Internal chain identifier (e.g., "A")
    pub auth_asym_id: String,        // Author chain identifier
    pub entity_id: String,           // Identifier of the parent entity
    pub atom_range: Range<usize>,    // Half-open range into the atom table
    pub residue_range: Range<usize>, // Half-open range into the residue table
    pub entity_index: usize,         // Index of the parent entity row
}

impl Chain {
    pub(crate) fn new(asym_id: &str, auth_asym_id: &str, entity_id: &str, entity_index: usize) -> Self {
        Self {
            asym_id: asym_id.to_string(),
            auth_asym_id: auth_asym_id.to_string(),
            entity_id: entity_id.to_string(),
            atom_range: 0..0,
            residue_range: 0..0,
            entity_index,
        }
    }
}
