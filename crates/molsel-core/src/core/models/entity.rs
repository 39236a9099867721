use serde::Deserialize;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;

/// Classification of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Polymer,
    NonPolymer,
    Water,
    #[default]
    Unknown,
}

#[derive(Debug, Error)]
#[error("Invalid entity type string: '{0}'")]
pub struct ParseEntityTypeError(String);

impl FromStr for EntityType {
    type Err = ParseEntityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polymer" => Ok(EntityType::Polymer),
            "non-polymer" | "nonpolymer" | "non_polymer" => Ok(EntityType::NonPolymer),
            "water" => Ok(EntityType::Water),
            "unknown" => Ok(EntityType::Unknown),
            _ => Err(ParseEntityTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                EntityType::Polymer => "polymer",
                EntityType::NonPolymer => "non-polymer",
                EntityType::Water => "water",
                EntityType::Unknown => "unknown",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub entity_id: String,           // Entity identifier (e.g., "1")
    pub entity_type: EntityType,     // Classification used by convenience selectors
    pub type_name: String,           // Free-form type string matched by identity schemas
    pub atom_range: Range<usize>,    // Half-open range into the atom table
    pub residue_range: Range<usize>, // Half-open range into the residue table
    pub chain_range: Range<usize>,   // Half-open range into the chain table
}

impl Entity {
    pub(crate) fn new(entity_id: &str, entity_type: EntityType, type_name: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            entity_type,
            type_name: type_name.to_string(),
            atom_range: 0..0,
            residue_range: 0..0,
            chain_range: 0..0,
        }
    }
}
