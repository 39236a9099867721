//! Identity schemas for residue, chain and entity lookups.
//!
//! Every field is optional; an absent field matches anything, a present field must be
//! equal to the corresponding column.

use super::grammar::quote;
use crate::core::models::chain::Chain;
use crate::core::models::entity::Entity;
use crate::core::models::model::MoleculeModel;
use crate::core::models::residue::Residue;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityIdSchema {
    pub entity_id: Option<String>,
    /// Matched against the entity's free-form type string.
    pub entity_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsymIdSchema {
    pub entity_id: Option<String>,
    pub entity_type: Option<String>,
    pub asym_id: Option<String>,
    pub auth_asym_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidueIdSchema {
    pub entity_id: Option<String>,
    pub entity_type: Option<String>,
    pub asym_id: Option<String>,
    pub auth_asym_id: Option<String>,
    pub name: Option<String>,
    pub seq_number: Option<i32>,
    pub auth_name: Option<String>,
    pub auth_seq_number: Option<i32>,
    pub ins_code: Option<String>,
}

fn field_matches<T: PartialEq + ?Sized>(expected: Option<&T>, actual: &T) -> bool {
    expected.is_none_or(|e| e == actual)
}

impl EntityIdSchema {
    pub fn entity_id(entity_id: &str) -> Self {
        Self {
            entity_id: Some(entity_id.to_string()),
            ..Self::default()
        }
    }

    pub fn entity_type(entity_type: &str) -> Self {
        Self {
            entity_type: Some(entity_type.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        field_matches(self.entity_id.as_deref(), entity.entity_id.as_str())
            && field_matches(self.entity_type.as_deref(), entity.type_name.as_str())
    }
}

impl AsymIdSchema {
    pub fn asym_id(asym_id: &str) -> Self {
        Self {
            asym_id: Some(asym_id.to_string()),
            ..Self::default()
        }
    }

    pub fn auth_asym_id(auth_asym_id: &str) -> Self {
        Self {
            auth_asym_id: Some(auth_asym_id.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, model: &MoleculeModel, chain: &Chain) -> bool {
        let entity = &model.entities()[chain.entity_index];
        field_matches(self.entity_id.as_deref(), chain.entity_id.as_str())
            && field_matches(self.entity_type.as_deref(), entity.type_name.as_str())
            && field_matches(self.asym_id.as_deref(), chain.asym_id.as_str())
            && field_matches(self.auth_asym_id.as_deref(), chain.auth_asym_id.as_str())
    }
}

impl ResidueIdSchema {
    pub fn name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn auth_seq_number(auth_seq_number: i32) -> Self {
        Self {
            auth_seq_number: Some(auth_seq_number),
            ..Self::default()
        }
    }

    pub fn with_asym_id(mut self, asym_id: &str) -> Self {
        self.asym_id = Some(asym_id.to_string());
        self
    }

    pub fn with_seq_number(mut self, seq_number: i32) -> Self {
        self.seq_number = Some(seq_number);
        self
    }

    pub fn matches(&self, model: &MoleculeModel, residue: &Residue) -> bool {
        let entity = &model.entities()[residue.entity_index];
        field_matches(self.entity_id.as_deref(), residue.entity_id.as_str())
            && field_matches(self.entity_type.as_deref(), entity.type_name.as_str())
            && field_matches(self.asym_id.as_deref(), residue.asym_id.as_str())
            && field_matches(self.auth_asym_id.as_deref(), residue.auth_asym_id.as_str())
            && field_matches(self.name.as_deref(), residue.name.as_str())
            && field_matches(self.seq_number.as_ref(), &residue.seq_number)
            && field_matches(self.auth_name.as_deref(), residue.auth_name.as_str())
            && field_matches(self.auth_seq_number.as_ref(), &residue.auth_seq_number)
            && field_matches(self.ins_code.as_deref(), residue.ins_code.as_str())
    }

    /// Whether a field of this schema contradicts the given entity or chain id.
    pub(crate) fn conflicts_with(&self, entity_id: &str, asym_id: &str) -> bool {
        !field_matches(self.entity_id.as_deref(), entity_id)
            || !field_matches(self.asym_id.as_deref(), asym_id)
    }
}

enum FieldValue<'a> {
    Text(&'a str),
    Number(i32),
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[(&str, Option<FieldValue<'_>>)]) -> fmt::Result {
    f.write_str("{")?;
    let mut first = true;
    for (key, value) in fields {
        let Some(value) = value else { continue };
        if !first {
            f.write_str(", ")?;
        }
        first = false;
        match value {
            FieldValue::Text(s) => write!(f, "{}: {}", key, quote(s))?,
            FieldValue::Number(n) => write!(f, "{}: {}", key, n)?,
        }
    }
    f.write_str("}")
}

fn text(field: &Option<String>) -> Option<FieldValue<'_>> {
    field.as_deref().map(FieldValue::Text)
}

fn number(field: &Option<i32>) -> Option<FieldValue<'static>> {
    field.map(FieldValue::Number)
}

impl fmt::Display for EntityIdSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(
            f,
            &[
                ("entityId", text(&self.entity_id)),
                ("type", text(&self.entity_type)),
            ],
        )
    }
}

impl fmt::Display for AsymIdSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(
            f,
            &[
                ("entityId", text(&self.entity_id)),
                ("type", text(&self.entity_type)),
                ("asymId", text(&self.asym_id)),
                ("authAsymId", text(&self.auth_asym_id)),
            ],
        )
    }
}

impl fmt::Display for ResidueIdSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(
            f,
            &[
                ("entityId", text(&self.entity_id)),
                ("type", text(&self.entity_type)),
                ("asymId", text(&self.asym_id)),
                ("authAsymId", text(&self.auth_asym_id)),
                ("name", text(&self.name)),
                ("seqNumber", number(&self.seq_number)),
                ("authName", text(&self.auth_name)),
                ("authSeqNumber", number(&self.auth_seq_number)),
                ("insCode", text(&self.ins_code)),
            ],
        )
    }
}
