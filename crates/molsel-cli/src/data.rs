//! Loading of molecular models from TOML dumps.
//!
//! A dump mirrors the model hierarchy: entities hold chains, chains hold residues and
//! residues hold atoms.
//!
//! ```toml
//! id = "1TST"
//!
//! [[entities]]
//! id = "1"
//! type = "polymer"
//!
//! [[entities.chains]]
//! asym-id = "A"
//!
//! [[entities.chains.residues]]
//! name = "ALA"
//! seq-number = 1
//! atoms = [
//!     { id = 1, name = "N", element = "N", position = [0.0, 0.0, 0.0] },
//!     { id = 2, name = "CA", element = "C", position = [1.5, 0.0, 0.0] },
//! ]
//! ```

use crate::error::{CliError, Result};
use molsel::core::models::atom::Atom;
use molsel::core::models::builder::MoleculeModelBuilder;
use molsel::core::models::entity::EntityType;
use molsel::core::models::model::MoleculeModel;
use molsel::core::models::residue::Residue;
use nalgebra::Point3;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ModelDump {
    pub id: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityDump>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct EntityDump {
    pub id: String,
    #[serde(rename = "type", default)]
    pub entity_type: EntityType,
    /// Free-form type string; defaults to the canonical name of `type`.
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub chains: Vec<ChainDump>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ChainDump {
    pub asym_id: String,
    #[serde(default)]
    pub auth_asym_id: Option<String>,
    #[serde(default)]
    pub residues: Vec<ResidueDump>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ResidueDump {
    pub name: String,
    pub seq_number: i32,
    #[serde(default)]
    pub auth_name: Option<String>,
    #[serde(default)]
    pub auth_seq_number: Option<i32>,
    #[serde(default)]
    pub ins_code: Option<String>,
    #[serde(default)]
    pub het: bool,
    pub atoms: Vec<AtomDump>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AtomDump {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub auth_name: Option<String>,
    pub element: String,
    pub position: [f64; 3],
}

impl ModelDump {
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn into_model(self) -> Result<MoleculeModel> {
        let mut builder = MoleculeModelBuilder::new(&self.id);
        if let Some(model_id) = &self.model_id {
            builder.model_id(model_id);
        }
        for entity in self.entities {
            let type_name = entity
                .type_name
                .unwrap_or_else(|| entity.entity_type.to_string());
            builder.start_entity(&entity.id, entity.entity_type, &type_name);
            for chain in entity.chains {
                let auth_asym_id = chain.auth_asym_id.as_deref().unwrap_or(&chain.asym_id);
                builder.start_chain(&chain.asym_id, auth_asym_id)?;
                for residue in chain.residues {
                    builder.start_residue(residue_row(&residue))?;
                    for atom in residue.atoms {
                        let [x, y, z] = atom.position;
                        let row =
                            Atom::new(atom.id, &atom.name, &atom.element, Point3::new(x, y, z));
                        builder.add_atom(match &atom.auth_name {
                            Some(auth_name) => row.with_auth_name(auth_name),
                            None => row,
                        })?;
                    }
                }
            }
        }
        Ok(builder.build()?)
    }
}

fn residue_row(dump: &ResidueDump) -> Residue {
    let mut residue = Residue::new(&dump.name, dump.seq_number).with_auth(
        dump.auth_name.as_deref().unwrap_or(&dump.name),
        dump.auth_seq_number.unwrap_or(dump.seq_number),
    );
    if let Some(ins_code) = &dump.ins_code {
        residue = residue.with_ins_code(ins_code);
    }
    if dump.het {
        residue = residue.het();
    }
    residue
}

pub fn load_model(path: &Path) -> Result<MoleculeModel> {
    info!("Loading model dump from {:?}", path);
    let content = std::fs::read_to_string(path)?;
    let dump = ModelDump::from_toml_str(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    let model = dump.into_model()?;
    debug!(
        atoms = model.atom_count(),
        residues = model.residues().len(),
        chains = model.chains().len(),
        entities = model.entities().len(),
        "Model loaded."
    );
    Ok(model)
}
