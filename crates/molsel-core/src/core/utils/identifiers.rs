use phf::{Set, phf_set};

static BACKBONE_ATOM_NAMES: Set<&'static str> = phf_set! {
    // Peptide backbone
    "N", "H", "HN", "CA", "HA", "C", "O", "OXT", "H1", "H2", "H3",
    "HA2", "HA3", "OT1", "OT2",
    // Nucleic acid backbone
    "P", "OP1", "OP2", "OP3", "O1P", "O2P", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'",
    "C2'", "O2'", "C1'", "H5'", "H5''", "H4'", "H3'", "H2'", "H2''", "H1'", "HO2'", "HO3'",
};

static AMINO_ACID_NAMES: Set<&'static str> = phf_set! {
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE",
    "LEU", "LYS", "MET", "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL",
    "MSE", "SEC", "PYL", "HSD", "HSE", "HSP", "HID", "HIE", "HIP",
};

static NUCLEOTIDE_NAMES: Set<&'static str> = phf_set! {
    "A", "C", "G", "U", "I", "T",
    "DA", "DC", "DG", "DT", "DU", "DI",
};

static WATER_NAMES: Set<&'static str> = phf_set! {
    "HOH", "WAT", "H2O", "DOD", "SOL", "TIP3", "TIP4", "SPC",
};

pub fn is_backbone_atom(atom_name: &str) -> bool {
    BACKBONE_ATOM_NAMES.contains(atom_name.trim())
}

pub fn is_amino_acid(residue_name: &str) -> bool {
    AMINO_ACID_NAMES.contains(residue_name.trim())
}

pub fn is_nucleotide(residue_name: &str) -> bool {
    NUCLEOTIDE_NAMES.contains(residue_name.trim())
}

/// Residue names drawn as cartoons: standard amino acids and nucleotides.
pub fn is_standard_polymer_residue(residue_name: &str) -> bool {
    is_amino_acid(residue_name) || is_nucleotide(residue_name)
}

pub fn is_water_residue(residue_name: &str) -> bool {
    WATER_NAMES.contains(residue_name.trim())
}
