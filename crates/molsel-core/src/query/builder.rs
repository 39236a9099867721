//! Query expressions.
//!
//! A [`QueryExpr`] is a persistent value describing a query: leaf selectors (by
//! identity, index, geometry or predicate) combined by modifiers (complement, union,
//! intersection, spatial and residue expansion, flattening). Expressions are built with
//! the free constructor functions of this module and the chaining methods on
//! [`QueryExpr`], then turned into an executable [`Query`] with [`QueryExpr::compile`].
//!
//! Every expression made only of built-in nodes prints (via `Display`) in the textual
//! grammar accepted by [`parse`](super::compiler::parse).

use super::algebraic::Predicate;
use super::compiler::{self, Query};
use super::error::QueryError;
use super::fragment::{Fragment, FragmentSeq};
use super::grammar::quote;
use super::schema::{AsymIdSchema, EntityIdSchema, ResidueIdSchema};
use nalgebra::Point3;
use std::fmt;
use std::sync::Arc;

pub type SelectorFn = Arc<dyn Fn(&Fragment) -> Result<FragmentSeq, QueryError> + Send + Sync>;
pub type FilterFn = Arc<dyn Fn(&Fragment) -> bool + Send + Sync>;

/// Per-fragment selector of a flatten node.
#[derive(Clone)]
pub enum FlattenSelector {
    /// Runs the expression scoped to each fragment (see [`Fragment::find`]).
    Find(Box<QueryExpr>),
    Custom(SelectorFn),
}

#[derive(Clone)]
pub enum QueryExpr {
    Everything,
    AtomsByElement(Vec<String>),
    AtomsByName(Vec<String>),
    AtomsById(Vec<i32>),
    Residues(Vec<ResidueIdSchema>),
    Chains(Vec<AsymIdSchema>),
    Entities(Vec<EntityIdSchema>),
    NotEntities(Vec<EntityIdSchema>),
    EntitiesFromIndices(Vec<usize>),
    ChainsFromIndices(Vec<usize>),
    ResiduesFromIndices(Vec<usize>),
    AtomsFromIndices(Vec<usize>),
    Sequence {
        entity_id: String,
        asym_id: String,
        start: ResidueIdSchema,
        end: ResidueIdSchema,
    },
    HetGroups,
    NonHetPolymer,
    Cartoons,
    Backbone,
    Sidechain,
    AtomsInBox {
        min: Point3<f64>,
        max: Point3<f64>,
    },
    PolymerNames {
        names: Vec<String>,
        complement: bool,
    },
    Algebraic(Predicate),
    Or(Vec<QueryExpr>),
    Complement(Box<QueryExpr>),
    AmbientResidues {
        what: Box<QueryExpr>,
        radius: f64,
    },
    WholeResidues(Box<QueryExpr>),
    Union(Box<QueryExpr>),
    Inside {
        what: Box<QueryExpr>,
        within: Box<QueryExpr>,
    },
    IntersectWith {
        what: Box<QueryExpr>,
        within: Box<QueryExpr>,
    },
    Flatten {
        what: Box<QueryExpr>,
        selector: FlattenSelector,
    },
    Filter {
        what: Box<QueryExpr>,
        predicate: FilterFn,
    },
    Compiled(Query),
}

impl QueryExpr {
    pub fn compile(&self) -> Result<Query, QueryError> {
        compiler::compile(self)
    }

    /// The active atoms not selected by `self`, as one fragment.
    pub fn complement(self) -> QueryExpr {
        QueryExpr::Complement(Box::new(self))
    }

    /// For each fragment, the whole residues with an atom within `radius` of it.
    pub fn ambient_residues(self, radius: f64) -> QueryExpr {
        QueryExpr::AmbientResidues {
            what: Box::new(self),
            radius,
        }
    }

    pub fn whole_residues(self) -> QueryExpr {
        QueryExpr::WholeResidues(Box::new(self))
    }

    pub fn union(self) -> QueryExpr {
        QueryExpr::Union(Box::new(self))
    }

    /// Keeps the fragments lying entirely inside the atoms selected by `within`.
    pub fn inside(self, within: impl Into<QueryExpr>) -> QueryExpr {
        QueryExpr::Inside {
            what: Box::new(self),
            within: Box::new(within.into()),
        }
    }

    /// Trims every fragment to the atoms selected by `within`.
    pub fn intersect_with(self, within: impl Into<QueryExpr>) -> QueryExpr {
        QueryExpr::IntersectWith {
            what: Box::new(self),
            within: Box::new(within.into()),
        }
    }

    /// Replaces every fragment `f` with the result of `f.find(selector)`.
    pub fn flatten(self, selector: impl Into<QueryExpr>) -> QueryExpr {
        QueryExpr::Flatten {
            what: Box::new(self),
            selector: FlattenSelector::Find(Box::new(selector.into())),
        }
    }

    /// Replaces every fragment with the sequence `selector` returns for it.
    ///
    /// The returned fragments must belong to the same model and only contain atoms
    /// active in the outer context.
    pub fn flatten_with<F>(self, selector: F) -> QueryExpr
    where
        F: Fn(&Fragment) -> Result<FragmentSeq, QueryError> + Send + Sync + 'static,
    {
        QueryExpr::Flatten {
            what: Box::new(self),
            selector: FlattenSelector::Custom(Arc::new(selector)),
        }
    }

    pub fn filter<F>(self, predicate: F) -> QueryExpr
    where
        F: Fn(&Fragment) -> bool + Send + Sync + 'static,
    {
        QueryExpr::Filter {
            what: Box::new(self),
            predicate: Arc::new(predicate),
        }
    }
}

impl From<Query> for QueryExpr {
    fn from(query: Query) -> Self {
        QueryExpr::Compiled(query)
    }
}

impl std::str::FromStr for QueryExpr {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(super::grammar::parse(s)?)
    }
}

fn strings(items: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    items.into_iter().map(Into::into).collect()
}

pub fn everything() -> QueryExpr {
    QueryExpr::Everything
}

/// One fragment per atom whose element symbol matches (case-insensitively).
pub fn atoms_by_element(elements: impl IntoIterator<Item = impl Into<String>>) -> QueryExpr {
    QueryExpr::AtomsByElement(strings(elements))
}

/// One fragment per atom with a matching name.
pub fn atoms_by_name(names: impl IntoIterator<Item = impl Into<String>>) -> QueryExpr {
    QueryExpr::AtomsByName(strings(names))
}

/// One fragment per atom with a matching author serial number.
pub fn atoms_by_id(ids: impl IntoIterator<Item = i32>) -> QueryExpr {
    QueryExpr::AtomsById(ids.into_iter().collect())
}

/// One fragment per residue matching any of the schemas.
pub fn residues(ids: impl IntoIterator<Item = ResidueIdSchema>) -> QueryExpr {
    QueryExpr::Residues(ids.into_iter().collect())
}

pub fn chains(ids: impl IntoIterator<Item = AsymIdSchema>) -> QueryExpr {
    QueryExpr::Chains(ids.into_iter().collect())
}

pub fn entities(ids: impl IntoIterator<Item = EntityIdSchema>) -> QueryExpr {
    QueryExpr::Entities(ids.into_iter().collect())
}

/// One fragment per entity matching none of the schemas.
pub fn not_entities(ids: impl IntoIterator<Item = EntityIdSchema>) -> QueryExpr {
    QueryExpr::NotEntities(ids.into_iter().collect())
}

pub fn entities_from_indices(indices: impl IntoIterator<Item = usize>) -> QueryExpr {
    QueryExpr::EntitiesFromIndices(indices.into_iter().collect())
}

pub fn chains_from_indices(indices: impl IntoIterator<Item = usize>) -> QueryExpr {
    QueryExpr::ChainsFromIndices(indices.into_iter().collect())
}

pub fn residues_from_indices(indices: impl IntoIterator<Item = usize>) -> QueryExpr {
    QueryExpr::ResiduesFromIndices(indices.into_iter().collect())
}

/// One fragment with the listed atoms that are active.
pub fn atoms_from_indices(indices: impl IntoIterator<Item = usize>) -> QueryExpr {
    QueryExpr::AtomsFromIndices(indices.into_iter().collect())
}

/// The residues of chain `asym_id` of entity `entity_id` from the first residue
/// matching `start` through the first following residue matching `end`.
pub fn sequence(
    entity_id: &str,
    asym_id: &str,
    start: ResidueIdSchema,
    end: ResidueIdSchema,
) -> QueryExpr {
    QueryExpr::Sequence {
        entity_id: entity_id.to_string(),
        asym_id: asym_id.to_string(),
        start,
        end,
    }
}

/// HET residues outside water entities, one fragment each.
pub fn het_groups() -> QueryExpr {
    QueryExpr::HetGroups
}

/// Non-HET residues of polymer entities, one fragment each.
pub fn non_het_polymer() -> QueryExpr {
    QueryExpr::NonHetPolymer
}

/// Standard amino acid and nucleotide residues of polymer entities.
pub fn cartoons() -> QueryExpr {
    QueryExpr::Cartoons
}

pub fn backbone() -> QueryExpr {
    QueryExpr::Backbone
}

pub fn sidechain() -> QueryExpr {
    QueryExpr::Sidechain
}

/// One fragment with the active atoms inside the box (faces included).
pub fn atoms_in_box(min: Point3<f64>, max: Point3<f64>) -> QueryExpr {
    QueryExpr::AtomsInBox { min, max }
}

/// Polymer residues whose name is in `names` (or, with `complement`, is not).
pub fn polymer_names(
    names: impl IntoIterator<Item = impl Into<String>>,
    complement: bool,
) -> QueryExpr {
    QueryExpr::PolymerNames {
        names: strings(names),
        complement,
    }
}

/// Concatenation of the results of every alternative, duplicates included.
pub fn or(items: impl IntoIterator<Item = impl Into<QueryExpr>>) -> QueryExpr {
    QueryExpr::Or(items.into_iter().map(Into::into).collect())
}

pub fn complement(q: impl Into<QueryExpr>) -> QueryExpr {
    q.into().complement()
}

pub fn ambient_residues(q: impl Into<QueryExpr>, radius: f64) -> QueryExpr {
    q.into().ambient_residues(radius)
}

pub fn whole_residues(q: impl Into<QueryExpr>) -> QueryExpr {
    q.into().whole_residues()
}

pub fn union(q: impl Into<QueryExpr>) -> QueryExpr {
    q.into().union()
}

pub fn inside(q: impl Into<QueryExpr>, within: impl Into<QueryExpr>) -> QueryExpr {
    q.into().inside(within)
}

pub fn intersect_with(what: impl Into<QueryExpr>, within: impl Into<QueryExpr>) -> QueryExpr {
    what.into().intersect_with(within)
}

pub fn flatten(what: impl Into<QueryExpr>, selector: impl Into<QueryExpr>) -> QueryExpr {
    what.into().flatten(selector)
}

pub fn residues_by_name(names: impl IntoIterator<Item = impl Into<String>>) -> QueryExpr {
    residues(names.into_iter().map(|n| ResidueIdSchema {
        name: Some(n.into()),
        ..ResidueIdSchema::default()
    }))
}

/// Residues by author sequence number.
pub fn residues_by_id(ids: impl IntoIterator<Item = i32>) -> QueryExpr {
    residues(ids.into_iter().map(ResidueIdSchema::auth_seq_number))
}

/// Chains by author chain identifier.
pub fn chains_by_id(ids: impl IntoIterator<Item = impl Into<String>>) -> QueryExpr {
    chains(ids.into_iter().map(|id| AsymIdSchema {
        auth_asym_id: Some(id.into()),
        ..AsymIdSchema::default()
    }))
}

fn write_call<T: fmt::Display>(f: &mut fmt::Formatter<'_>, name: &str, args: &[T]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg)?;
    }
    f.write_str(")")
}

fn write_strings(f: &mut fmt::Formatter<'_>, name: &str, items: &[String]) -> fmt::Result {
    let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
    write_call(f, name, &quoted)
}

fn write_point(f: &mut fmt::Formatter<'_>, p: &Point3<f64>) -> fmt::Result {
    write!(f, "{{x: {}, y: {}, z: {}}}", p.x, p.y, p.z)
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpr::Everything => f.write_str("everything()"),
            QueryExpr::AtomsByElement(items) => write_strings(f, "atomsByElement", items),
            QueryExpr::AtomsByName(items) => write_strings(f, "atomsByName", items),
            QueryExpr::AtomsById(ids) => write_call(f, "atomsById", ids),
            QueryExpr::Residues(ids) => write_call(f, "residues", ids),
            QueryExpr::Chains(ids) => write_call(f, "chains", ids),
            QueryExpr::Entities(ids) => write_call(f, "entities", ids),
            QueryExpr::NotEntities(ids) => write_call(f, "notEntities", ids),
            QueryExpr::EntitiesFromIndices(ids) => write_call(f, "entitiesFromIndices", ids),
            QueryExpr::ChainsFromIndices(ids) => write_call(f, "chainsFromIndices", ids),
            QueryExpr::ResiduesFromIndices(ids) => write_call(f, "residuesFromIndices", ids),
            QueryExpr::AtomsFromIndices(ids) => write_call(f, "atomsFromIndices", ids),
            QueryExpr::Sequence {
                entity_id,
                asym_id,
                start,
                end,
            } => write!(
                f,
                "sequence({}, {}, {}, {})",
                quote(entity_id),
                quote(asym_id),
                start,
                end
            ),
            QueryExpr::HetGroups => f.write_str("hetGroups()"),
            QueryExpr::NonHetPolymer => f.write_str("nonHetPolymer()"),
            QueryExpr::Cartoons => f.write_str("cartoons()"),
            QueryExpr::Backbone => f.write_str("backbone()"),
            QueryExpr::Sidechain => f.write_str("sidechain()"),
            QueryExpr::AtomsInBox { min, max } => {
                f.write_str("atomsInBox(")?;
                write_point(f, min)?;
                f.write_str(", ")?;
                write_point(f, max)?;
                f.write_str(")")
            }
            QueryExpr::PolymerNames { names, complement } => {
                let name = if *complement {
                    "notPolymerNames"
                } else {
                    "polymerNames"
                };
                write_strings(f, name, names)
            }
            QueryExpr::Algebraic(predicate) => write!(f, "query({})", predicate),
            QueryExpr::Or(items) => write_call(f, "or", items),
            QueryExpr::Complement(q) => write!(f, "{}.complement()", q),
            QueryExpr::AmbientResidues { what, radius } => {
                write!(f, "{}.ambientResidues({})", what, radius)
            }
            QueryExpr::WholeResidues(q) => write!(f, "{}.wholeResidues()", q),
            QueryExpr::Union(q) => write!(f, "{}.union()", q),
            QueryExpr::Inside { what, within } => write!(f, "{}.inside({})", what, within),
            QueryExpr::IntersectWith { what, within } => {
                write!(f, "{}.intersectWith({})", what, within)
            }
            QueryExpr::Flatten { what, selector } => match selector {
                FlattenSelector::Find(q) => write!(f, "{}.flatten({})", what, q),
                FlattenSelector::Custom(_) => write!(f, "{}.flatten(<fn>)", what),
            },
            QueryExpr::Filter { what, .. } => write!(f, "{}.filter(<fn>)", what),
            QueryExpr::Compiled(_) => f.write_str("<compiled>"),
        }
    }
}

impl fmt::Debug for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryExpr({})", self)
    }
}
