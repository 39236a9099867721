use std::ops::Range;

/// A single row of the residue table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub name: String,                // Internal residue name (e.g., "ALA", "HOH")
    pub seq_number: i32,             // Internal sequence number
    pub asym_id: String,             // Internal chain identifier of the parent chain
    pub auth_name: String,           // Author residue name
    pub auth_seq_number: i32,        // Author sequence number
    pub auth_asym_id: String,        // Author chain identifier
    pub ins_code: String,            // Insertion code, empty if absent
    pub entity_id: String,           // Identifier of the parent entity
    pub is_het: bool,                // Whether the residue came from a HETATM record
    pub atom_range: Range<usize>,    // Half-open range into the atom table
    pub chain_index: usize,          // Index of the parent chain row
    pub entity_index: usize,         // Index of the parent entity row
}

impl Residue {
    /// Creates a residue row with the given internal name and sequence number.
    ///
    /// Author columns mirror the internal ones; the chain and entity columns and the
    /// atom range are assigned by the model builder.
    pub fn new(name: &str, seq_number: i32) -> Self {
        Self {
            name: name.to_string(),
            seq_number,
            asym_id: String::new(),
            auth_name: name.to_string(),
            auth_seq_number: seq_number,
            auth_asym_id: String::new(),
            ins_code: String::new(),
            entity_id: String::new(),
            is_het: false,
            atom_range: 0..0,
            chain_index: 0,
            entity_index: 0,
        }
    }

    pub fn with_auth(mut self, auth_name: &str, auth_seq_number: i32) -> Self {
        self.auth_name = auth_name.to_string();
        self.auth_seq_number = auth_seq_number;
        self
    }

    pub fn with_ins_code(mut self, ins_code: &str) -> Self {
        self.ins_code = ins_code.to_string();
        self
    }

    pub fn het(mut self) -> Self {
        self.is_het = true;
        self
    }

    pub fn atom_count(&self) -> usize {
        self.atom_range.len()
    }

    /// Identifier built from internal naming, used by fragment fingerprints.
    pub fn label(&self) -> String {
        format!(
            "{} {} {}{}",
            self.name, self.asym_id, self.seq_number, self.ins_code
        )
    }

    /// Identifier built from author naming, used by fragment author fingerprints.
    pub fn auth_label(&self) -> String {
        format!(
            "{} {} {}{}",
            self.auth_name, self.auth_asym_id, self.auth_seq_number, self.ins_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_residue_initializes_fields_correctly() {
        let residue = Residue::new("GLY", 10);
        assert_eq!(residue.name, "GLY");
        assert_eq!(residue.seq_number, 10);
        assert_eq!(residue.auth_name, "GLY");
        assert_eq!(residue.auth_seq_number, 10);
        assert!(!residue.is_het);
        assert_eq!(residue.atom_count(), 0);
    }

    #[test]
    fn builder_style_setters_apply() {
        let residue = Residue::new("HEM", 1).with_auth("HEM", 201).with_ins_code("A").het();
        assert_eq!(residue.auth_seq_number, 201);
        assert_eq!(residue.ins_code, "A");
        assert!(residue.is_het);
    }

    #[test]
    fn labels_use_internal_and_author_naming() {
        let mut residue = Residue::new("ALA", 5).with_auth("ALA", 105).with_ins_code("B");
        residue.asym_id = "A".to_string();
        residue.auth_asym_id = "X".to_string();
        assert_eq!(residue.label(), "ALA A 5B");
        assert_eq!(residue.auth_label(), "ALA X 105B");
    }
}
