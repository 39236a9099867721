use nalgebra::Point3;

/// A single row of the atom table.
///
/// Identity columns (`name`, `element_symbol`, ...) come straight from the source
/// file. The back-indices (`residue_index`, `chain_index`, `entity_index`) are
/// positions in the owning tables of the same [`MoleculeModel`](super::model::MoleculeModel)
/// and are filled in by the model builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Author-provided atom serial number.
    pub id: i32,
    /// The internal atom name (e.g., "CA", "N", "O").
    pub name: String,
    /// The author-provided atom name; usually equal to `name`.
    pub auth_name: String,
    /// The element symbol (e.g., "C", "FE").
    pub element_symbol: String,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Alternate location indicator, empty if absent.
    pub alt_loc: String,
    pub occupancy: f64,
    pub temp_factor: f64,
    /// Index of the owning residue row.
    pub residue_index: usize,
    /// Index of the owning chain row.
    pub chain_index: usize,
    /// Index of the owning entity row.
    pub entity_index: usize,
}

impl Atom {
    /// Creates a new `Atom` with default values for the secondary columns.
    ///
    /// The author name mirrors `name`, occupancy is 1.0 and all back-indices are
    /// zero until the atom is registered with a model builder.
    ///
    /// # Arguments
    ///
    /// * `id` - The author serial number.
    /// * `name` - The atom name.
    /// * `element_symbol` - The element symbol.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(id: i32, name: &str, element_symbol: &str, position: Point3<f64>) -> Self {
        Self {
            id,
            name: name.to_string(),
            auth_name: name.to_string(),
            element_symbol: element_symbol.to_string(),
            position,
            alt_loc: String::new(),
            occupancy: 1.0,
            temp_factor: 0.0,
            residue_index: 0,
            chain_index: 0,
            entity_index: 0,
        }
    }

    pub fn with_auth_name(mut self, auth_name: &str) -> Self {
        self.auth_name = auth_name.to_string();
        self
    }
}
