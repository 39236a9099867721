//! Per-atom predicate trees.
//!
//! A [`Predicate`] is evaluated for each active atom; [`query`] turns it into a query
//! expression selecting one fragment with every atom for which it holds.
//!
//! ```ignore
//! use molsel::query::algebraic::*;
//!
//! let ca_near_start = and(
//!     equal(atom_name(), value("CA")),
//!     in_range(residue_seq_number(), 1.0, 10.0),
//! );
//! let expr = query(ca_near_start);
//! ```

use super::builder::QueryExpr;
use super::grammar::quote;
use crate::core::models::model::MoleculeModel;
use crate::core::utils::identifiers::{is_amino_acid, is_backbone_atom, is_standard_polymer_residue};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl Value {
    fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Reads a value for an atom.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Value(Value),
    ResidueSeqNumber,
    ResidueName,
    ElementSymbol,
    AtomName,
    EntityType,
}

impl Selector {
    pub fn select(&self, model: &MoleculeModel, atom_index: usize) -> Value {
        let atom = &model.atoms()[atom_index];
        match self {
            Selector::Value(v) => v.clone(),
            Selector::ResidueSeqNumber => {
                Value::Number(model.residues()[atom.residue_index].seq_number as f64)
            }
            Selector::ResidueName => Value::Text(model.residues()[atom.residue_index].name.clone()),
            Selector::ElementSymbol => Value::Text(atom.element_symbol.clone()),
            Selector::AtomName => Value::Text(atom.name.clone()),
            Selector::EntityType => {
                Value::Text(model.entities()[atom.entity_index].entity_type.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    Lesser,
    GreaterEqual,
    LesserEqual,
}

impl Comparison {
    pub fn name(&self) -> &'static str {
        match self {
            Comparison::Equal => "equal",
            Comparison::NotEqual => "notEqual",
            Comparison::Greater => "greater",
            Comparison::Lesser => "lesser",
            Comparison::GreaterEqual => "greaterEqual",
            Comparison::LesserEqual => "lesserEqual",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Comparison::Equal,
            Comparison::NotEqual,
            Comparison::Greater,
            Comparison::Lesser,
            Comparison::GreaterEqual,
            Comparison::LesserEqual,
        ]
        .into_iter()
        .find(|c| c.name() == name)
    }

    /// Values of different kinds are never equal and never ordered.
    fn holds(&self, a: &Value, b: &Value) -> bool {
        let ordering = a.compare(b);
        match self {
            Comparison::Equal => ordering == Some(Ordering::Equal),
            Comparison::NotEqual => ordering != Some(Ordering::Equal),
            Comparison::Greater => ordering == Some(Ordering::Greater),
            Comparison::Lesser => ordering == Some(Ordering::Less),
            Comparison::GreaterEqual => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
            Comparison::LesserEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Backbone,
    Sidechain,
    Compare {
        op: Comparison,
        left: Selector,
        right: Selector,
    },
    /// Inclusive numeric range.
    InRange { selector: Selector, min: f64, max: f64 },
}

impl Predicate {
    pub fn test(&self, model: &MoleculeModel, atom_index: usize) -> bool {
        match self {
            Predicate::Not(p) => !p.test(model, atom_index),
            Predicate::And(a, b) => a.test(model, atom_index) && b.test(model, atom_index),
            Predicate::Or(a, b) => a.test(model, atom_index) || b.test(model, atom_index),
            Predicate::Backbone => is_backbone(model, atom_index),
            Predicate::Sidechain => is_sidechain(model, atom_index),
            Predicate::Compare { op, left, right } => {
                op.holds(&left.select(model, atom_index), &right.select(model, atom_index))
            }
            Predicate::InRange { selector, min, max } => match selector.select(model, atom_index) {
                Value::Number(v) => *min <= v && v <= *max,
                Value::Text(_) => false,
            },
        }
    }
}

/// Backbone atom of a standard amino acid or nucleotide residue.
pub(crate) fn is_backbone(model: &MoleculeModel, atom_index: usize) -> bool {
    let atom = &model.atoms()[atom_index];
    is_standard_polymer_residue(&model.residues()[atom.residue_index].name)
        && is_backbone_atom(&atom.name)
}

/// Non-backbone atom of a standard amino acid residue.
pub(crate) fn is_sidechain(model: &MoleculeModel, atom_index: usize) -> bool {
    let atom = &model.atoms()[atom_index];
    is_amino_acid(&model.residues()[atom.residue_index].name) && !is_backbone_atom(&atom.name)
}

pub fn not(a: Predicate) -> Predicate {
    Predicate::Not(Box::new(a))
}

pub fn and(a: Predicate, b: Predicate) -> Predicate {
    Predicate::And(Box::new(a), Box::new(b))
}

pub fn or(a: Predicate, b: Predicate) -> Predicate {
    Predicate::Or(Box::new(a), Box::new(b))
}

pub fn backbone() -> Predicate {
    Predicate::Backbone
}

pub fn sidechain() -> Predicate {
    Predicate::Sidechain
}

fn compare(op: Comparison, left: Selector, right: Selector) -> Predicate {
    Predicate::Compare { op, left, right }
}

pub fn equal(a: Selector, b: Selector) -> Predicate {
    compare(Comparison::Equal, a, b)
}

pub fn not_equal(a: Selector, b: Selector) -> Predicate {
    compare(Comparison::NotEqual, a, b)
}

pub fn greater(a: Selector, b: Selector) -> Predicate {
    compare(Comparison::Greater, a, b)
}

pub fn lesser(a: Selector, b: Selector) -> Predicate {
    compare(Comparison::Lesser, a, b)
}

pub fn greater_equal(a: Selector, b: Selector) -> Predicate {
    compare(Comparison::GreaterEqual, a, b)
}

pub fn lesser_equal(a: Selector, b: Selector) -> Predicate {
    compare(Comparison::LesserEqual, a, b)
}

pub fn in_range(selector: Selector, min: f64, max: f64) -> Predicate {
    Predicate::InRange { selector, min, max }
}

pub fn value(v: impl Into<Value>) -> Selector {
    Selector::Value(v.into())
}

pub fn residue_seq_number() -> Selector {
    Selector::ResidueSeqNumber
}

pub fn residue_name() -> Selector {
    Selector::ResidueName
}

pub fn element_symbol() -> Selector {
    Selector::ElementSymbol
}

pub fn atom_name() -> Selector {
    Selector::AtomName
}

pub fn entity_type() -> Selector {
    Selector::EntityType
}

/// One fragment with every active atom satisfying `predicate`.
pub fn query(predicate: Predicate) -> QueryExpr {
    QueryExpr::Algebraic(predicate)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(&quote(s)),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Value(v) => write!(f, "value({})", v),
            Selector::ResidueSeqNumber => f.write_str("residueSeqNumber()"),
            Selector::ResidueName => f.write_str("residueName()"),
            Selector::ElementSymbol => f.write_str("elementSymbol()"),
            Selector::AtomName => f.write_str("atomName()"),
            Selector::EntityType => f.write_str("entityType()"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Not(p) => write!(f, "not({})", p),
            Predicate::And(a, b) => write!(f, "and({}, {})", a, b),
            Predicate::Or(a, b) => write!(f, "or({}, {})", a, b),
            Predicate::Backbone => f.write_str("backbone()"),
            Predicate::Sidechain => f.write_str("sidechain()"),
            Predicate::Compare { op, left, right } => {
                write!(f, "{}({}, {})", op.name(), left, right)
            }
            Predicate::InRange { selector, min, max } => {
                write!(f, "inRange({}, {}, {})", selector, min, max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures::sample_model;

    fn matching(model: &MoleculeModel, p: &Predicate) -> Vec<usize> {
        (0..model.atom_count()).filter(|&i| p.test(model, i)).collect()
    }

    #[test]
    fn comparisons_on_text_and_numbers() {
        let m = sample_model();
        assert_eq!(
            matching(&m, &equal(residue_name(), value("GLY"))),
            vec![5, 6, 7, 8]
        );
        assert_eq!(
            matching(&m, &greater(residue_seq_number(), value(100))),
            vec![17, 18]
        );
        assert_eq!(
            matching(&m, &lesser_equal(residue_seq_number(), value(1))),
            vec![0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn mixed_kinds_are_never_equal() {
        let m = sample_model();
        assert!(matching(&m, &equal(residue_name(), value(1))).is_empty());
        assert_eq!(
            matching(&m, &not_equal(residue_name(), value(1))).len(),
            m.atom_count()
        );
        assert!(matching(&m, &greater_equal(atom_name(), value(0))).is_empty());
    }

    #[test]
    fn boolean_combinators() {
        let m = sample_model();
        let ca_or_fe = or(
            equal(atom_name(), value("CA")),
            equal(element_symbol(), value("Fe")),
        );
        assert_eq!(matching(&m, &ca_or_fe), vec![1, 6, 10, 15]);
        let not_ca_in_ala = and(
            equal(residue_name(), value("ALA")),
            not(equal(atom_name(), value("CA"))),
        );
        assert_eq!(matching(&m, &not_ca_in_ala), vec![0, 2, 3, 4]);
    }

    #[test]
    fn in_range_is_inclusive_and_numeric_only() {
        let m = sample_model();
        assert_eq!(
            matching(&m, &in_range(residue_seq_number(), 2.0, 3.0)).len(),
            10
        );
        assert!(matching(&m, &in_range(atom_name(), 0.0, 10.0)).is_empty());
    }

    #[test]
    fn backbone_and_sidechain_split_standard_residues() {
        let m = sample_model();
        assert_eq!(
            matching(&m, &backbone()),
            vec![0, 1, 2, 3, 5, 6, 7, 8, 9, 10, 11, 12]
        );
        assert_eq!(matching(&m, &sidechain()), vec![4, 13, 14]);
    }

    #[test]
    fn entity_type_selector_uses_classification_names() {
        let m = sample_model();
        assert_eq!(
            matching(&m, &equal(entity_type(), value("water"))),
            vec![17, 18]
        );
    }

    #[test]
    fn display_writes_the_textual_form() {
        let p = and(
            equal(residue_name(), value("ALA")),
            in_range(residue_seq_number(), 1.0, 2.5),
        );
        assert_eq!(
            p.to_string(),
            "and(equal(residueName(), value(\"ALA\")), inRange(residueSeqNumber(), 1, 2.5))"
        );
        assert_eq!(Comparison::from_name("greaterEqual"), Some(Comparison::GreaterEqual));
        assert_eq!(Comparison::from_name("bogus"), None);
    }
}
