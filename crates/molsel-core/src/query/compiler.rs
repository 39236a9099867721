//! Compilation of [`QueryExpr`] trees into executable [`Query`] values.
//!
//! Compilation validates arguments (radii, boxes, schemas) and composes one closure
//! per node; it never reads model data. Everything data-dependent happens when the
//! query is executed against a [`Context`].

use super::algebraic::{self, Predicate};
use super::builder::{FlattenSelector, QueryExpr, SelectorFn};
use super::context::Context;
use super::error::QueryError;
use super::fragment::{
    COMPLEMENT_TAG, Fragment, FragmentSeq, FragmentSeqBuilder, HashFragmentSeqBuilder,
};
use super::grammar;
use super::schema::ResidueIdSchema;
use crate::core::geometry::{Box3D, ResultBuffer};
use crate::core::models::atom::Atom;
use crate::core::models::entity::EntityType;
use crate::core::models::model::MoleculeModel;
use crate::core::utils::identifiers::is_standard_polymer_residue;
use nalgebra::Point3;
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

type QueryFn = dyn Fn(&Context) -> Result<FragmentSeq, QueryError> + Send + Sync;

/// A compiled query: a pure function from a context to a fragment sequence.
#[derive(Clone)]
pub struct Query {
    run: Arc<QueryFn>,
}

impl Query {
    /// Wraps an arbitrary function as a query.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Context) -> Result<FragmentSeq, QueryError> + Send + Sync + 'static,
    {
        Self { run: Arc::new(f) }
    }

    #[instrument(level = "trace", skip_all, fields(atoms = ctx.atom_count()))]
    pub fn execute(&self, ctx: &Context) -> Result<FragmentSeq, QueryError> {
        (self.run)(ctx)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Query(<fn>)")
    }
}

/// Anything that can be turned into a [`Query`].
#[derive(Debug, Clone)]
pub enum Source {
    Query(Query),
    Expr(QueryExpr),
    Text(String),
}

impl From<Query> for Source {
    fn from(q: Query) -> Self {
        Source::Query(q)
    }
}

impl From<QueryExpr> for Source {
    fn from(e: QueryExpr) -> Self {
        Source::Expr(e)
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::Text(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source::Text(s)
    }
}

pub fn to_query(source: impl Into<Source>) -> Result<Query, QueryError> {
    match source.into() {
        Source::Query(q) => Ok(q),
        Source::Expr(e) => compile(&e),
        Source::Text(s) => parse(&s),
    }
}

/// Parses and compiles a textual query.
pub fn parse(text: &str) -> Result<Query, QueryError> {
    let expr = grammar::parse(text)?;
    compile(&expr)
}

#[instrument(skip_all, name = "query_compilation")]
pub fn compile(expr: &QueryExpr) -> Result<Query, QueryError> {
    let query = compile_node(expr)?;
    debug!(expression = %expr, "Query compiled.");
    Ok(query)
}

fn compile_node(expr: &QueryExpr) -> Result<Query, QueryError> {
    Ok(match expr {
        QueryExpr::Everything => compile_everything(),
        QueryExpr::AtomsByElement(elements) => {
            let elements = elements.clone();
            compile_atoms(move |a| {
                elements
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(&a.element_symbol))
            })
        }
        QueryExpr::AtomsByName(names) => {
            let names: HashSet<String> = names.iter().cloned().collect();
            compile_atoms(move |a| names.contains(a.name.as_str()))
        }
        QueryExpr::AtomsById(ids) => {
            let ids: HashSet<i32> = ids.iter().copied().collect();
            compile_atoms(move |a| ids.contains(&a.id))
        }
        QueryExpr::Residues(ids) => {
            let ids = ids.clone();
            compile_atom_ranges(Table::Residues, false, move |m, r| {
                ids.iter().any(|id| id.matches(m, &m.residues()[r]))
            })
        }
        QueryExpr::Chains(ids) => {
            let ids = ids.clone();
            compile_atom_ranges(Table::Chains, false, move |m, c| {
                ids.iter().any(|id| id.matches(m, &m.chains()[c]))
            })
        }
        QueryExpr::Entities(ids) => {
            let ids = ids.clone();
            compile_atom_ranges(Table::Entities, false, move |m, e| {
                ids.iter().any(|id| id.matches(&m.entities()[e]))
            })
        }
        QueryExpr::NotEntities(ids) => {
            let ids = ids.clone();
            compile_atom_ranges(Table::Entities, true, move |m, e| {
                ids.iter().any(|id| id.matches(&m.entities()[e]))
            })
        }
        QueryExpr::EntitiesFromIndices(indices) => {
            compile_from_indices(Table::Entities, indices.clone())
        }
        QueryExpr::ChainsFromIndices(indices) => compile_from_indices(Table::Chains, indices.clone()),
        QueryExpr::ResiduesFromIndices(indices) => {
            compile_from_indices(Table::Residues, indices.clone())
        }
        QueryExpr::AtomsFromIndices(indices) => compile_atom_indices(indices.clone()),
        QueryExpr::Sequence {
            entity_id,
            asym_id,
            start,
            end,
        } => compile_sequence(entity_id, asym_id, start, end)?,
        QueryExpr::HetGroups => compile_atom_ranges(Table::Residues, false, |m, r| {
            m.residues()[r].is_het && !m.is_water_residue(r)
        }),
        QueryExpr::NonHetPolymer => compile_atom_ranges(Table::Residues, false, |m, r| {
            !m.residues()[r].is_het && m.residue_entity_type(r) == EntityType::Polymer
        }),
        QueryExpr::Cartoons => compile_atom_ranges(Table::Residues, false, |m, r| {
            m.residue_entity_type(r) == EntityType::Polymer
                && is_standard_polymer_residue(&m.residues()[r].name)
        }),
        QueryExpr::PolymerNames { names, complement } => {
            let names: HashSet<String> = names.iter().cloned().collect();
            let complement = *complement;
            compile_atom_ranges(Table::Residues, false, move |m, r| {
                m.residue_entity_type(r) == EntityType::Polymer
                    && names.contains(m.residues()[r].name.as_str()) != complement
            })
        }
        QueryExpr::Backbone => compile_single(algebraic::is_backbone),
        QueryExpr::Sidechain => compile_single(algebraic::is_sidechain),
        QueryExpr::Algebraic(predicate) => compile_predicate(predicate.clone()),
        QueryExpr::AtomsInBox { min, max } => compile_atoms_in_box(min, max)?,
        QueryExpr::Or(items) => compile_or(items)?,
        QueryExpr::Complement(what) => compile_complement(compile_node(what)?),
        QueryExpr::AmbientResidues { what, radius } => {
            compile_ambient_residues(compile_node(what)?, *radius)?
        }
        QueryExpr::WholeResidues(what) => compile_whole_residues(compile_node(what)?),
        QueryExpr::Union(what) => compile_union(compile_node(what)?),
        QueryExpr::Inside { what, within } => {
            compile_inside(compile_node(what)?, compile_node(within)?)
        }
        QueryExpr::IntersectWith { what, within } => {
            compile_intersect_with(compile_node(what)?, compile_node(within)?)
        }
        QueryExpr::Flatten { what, selector } => {
            let selector: SelectorFn = match selector {
                FlattenSelector::Find(expr) => {
                    let inner = compile_node(expr)?;
                    Arc::new(move |f: &Fragment| f.find(inner.clone()))
                }
                FlattenSelector::Custom(f) => f.clone(),
            };
            compile_flatten(compile_node(what)?, selector)
        }
        QueryExpr::Filter { what, predicate } => {
            let what = compile_node(what)?;
            let predicate = predicate.clone();
            Query::from_fn(move |ctx| {
                let seq = what.execute(ctx)?;
                let mut result = FragmentSeqBuilder::new(ctx);
                for f in seq.into_fragments() {
                    if predicate(&f) {
                        result.add(f);
                    }
                }
                Ok(result.build())
            })
        }
        QueryExpr::Compiled(query) => query.clone(),
    })
}

fn check_radius(radius: f64) -> Result<(), QueryError> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(QueryError::InvalidRadius { radius })
    }
}

/// A sequence with one fragment holding `atoms`, or an empty one.
fn single_fragment(ctx: &Context, atoms: Vec<usize>) -> FragmentSeq {
    match Fragment::from_sorted_first(ctx, atoms) {
        Some(f) => FragmentSeq::new(ctx, vec![f]),
        None => FragmentSeq::empty(ctx),
    }
}

/// The active atoms of `range`, as a fragment tagged with its first atom.
fn range_fragment(ctx: &Context, range: Range<usize>) -> Option<Fragment> {
    if !ctx.has_range(range.start, range.end) {
        return None;
    }
    Fragment::from_sorted_first(ctx, ctx.atoms_in_range(range).collect())
}

/// The active atoms of the given residues; `residues` must be sorted.
fn residue_atoms(ctx: &Context, residues: &[usize]) -> Vec<usize> {
    let table = ctx.structure().residues();
    residues
        .iter()
        .flat_map(|&r| ctx.atoms_in_range(table[r].atom_range.clone()))
        .collect()
}

/// Flags of the atoms covered by `seq`, indexed by atom.
///
/// Fails with [`QueryError::AtomNotInContext`] if `seq` holds an atom that is not
/// active in `ctx`, e.g. one produced by a custom query over another model.
fn atom_flags(ctx: &Context, seq: &FragmentSeq) -> Result<Vec<bool>, QueryError> {
    let mut flags = vec![false; ctx.structure().atom_count()];
    for f in seq {
        for &i in f.atom_indices() {
            if !ctx.has_atom(i) {
                return Err(QueryError::AtomNotInContext { index: i });
            }
            flags[i] = true;
        }
    }
    Ok(flags)
}

fn flagged(flags: &[bool], index: usize) -> bool {
    flags.get(index).copied().unwrap_or(false)
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Entities,
    Chains,
    Residues,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Table::Entities => "entity",
            Table::Chains => "chain",
            Table::Residues => "residue",
        }
    }

    fn len(&self, model: &MoleculeModel) -> usize {
        match self {
            Table::Entities => model.entities().len(),
            Table::Chains => model.chains().len(),
            Table::Residues => model.residues().len(),
        }
    }

    fn atom_range(&self, model: &MoleculeModel, row: usize) -> Range<usize> {
        match self {
            Table::Entities => model.entities()[row].atom_range.clone(),
            Table::Chains => model.chains()[row].atom_range.clone(),
            Table::Residues => model.residues()[row].atom_range.clone(),
        }
    }
}

fn compile_everything() -> Query {
    Query::from_fn(|ctx| Ok(single_fragment(ctx, ctx.atom_indices().collect())))
}

/// One fragment per matching active atom, in atom order.
fn compile_atoms<F>(matches: F) -> Query
where
    F: Fn(&Atom) -> bool + Send + Sync + 'static,
{
    Query::from_fn(move |ctx| {
        let atoms = ctx.structure().atoms();
        let fragments = ctx
            .atom_indices()
            .filter(|&i| matches(&atoms[i]))
            .map(|i| Fragment::from_sorted(ctx, i, vec![i]))
            .collect();
        Ok(FragmentSeq::new(ctx, fragments))
    })
}

/// One fragment with every active atom satisfying `matches`.
fn compile_single<F>(matches: F) -> Query
where
    F: Fn(&MoleculeModel, usize) -> bool + Send + Sync + 'static,
{
    Query::from_fn(move |ctx| {
        let model: &MoleculeModel = ctx.structure();
        let atoms = ctx.atom_indices().filter(|&i| matches(model, i)).collect();
        Ok(single_fragment(ctx, atoms))
    })
}

fn compile_predicate(predicate: Predicate) -> Query {
    compile_single(move |model, i| predicate.test(model, i))
}

/// One fragment per row of `table` whose match result differs from `complement`.
fn compile_atom_ranges<F>(table: Table, complement: bool, matches: F) -> Query
where
    F: Fn(&MoleculeModel, usize) -> bool + Send + Sync + 'static,
{
    Query::from_fn(move |ctx| {
        let model: &MoleculeModel = ctx.structure();
        let mut result = FragmentSeqBuilder::new(ctx);
        for row in 0..table.len(model) {
            if matches(model, row) == complement {
                continue;
            }
            if let Some(f) = range_fragment(ctx, table.atom_range(model, row)) {
                result.add(f);
            }
        }
        Ok(result.build())
    })
}

fn compile_from_indices(table: Table, indices: Vec<usize>) -> Query {
    Query::from_fn(move |ctx| {
        let model: &MoleculeModel = ctx.structure();
        let count = table.len(model);
        let mut result = FragmentSeqBuilder::new(ctx);
        for &row in &indices {
            if row >= count {
                return Err(QueryError::RowIndexOutOfBounds {
                    table: table.name(),
                    index: row,
                    count,
                });
            }
            if let Some(f) = range_fragment(ctx, table.atom_range(model, row)) {
                result.add(f);
            }
        }
        Ok(result.build())
    })
}

fn compile_atom_indices(indices: Vec<usize>) -> Query {
    Query::from_fn(move |ctx| {
        let count = ctx.structure().atom_count();
        if let Some(&index) = indices.iter().find(|&&i| i >= count) {
            return Err(QueryError::AtomIndexOutOfBounds { index, count });
        }
        let mut atoms: Vec<usize> = indices.iter().copied().filter(|&i| ctx.has_atom(i)).collect();
        atoms.sort_unstable();
        atoms.dedup();
        Ok(single_fragment(ctx, atoms))
    })
}

fn compile_sequence(
    entity_id: &str,
    asym_id: &str,
    start: &ResidueIdSchema,
    end: &ResidueIdSchema,
) -> Result<Query, QueryError> {
    for (label, anchor) in [("start", start), ("end", end)] {
        if anchor.conflicts_with(entity_id, asym_id) {
            return Err(QueryError::InvalidSchema(format!(
                "sequence {} {} conflicts with the chain ({} {})",
                label, anchor, entity_id, asym_id
            )));
        }
    }
    let (entity_id, asym_id) = (entity_id.to_string(), asym_id.to_string());
    let (start, end) = (start.clone(), end.clone());

    Ok(Query::from_fn(move |ctx| {
        let model: &MoleculeModel = ctx.structure();
        let residues = model.residues();
        let mut result = FragmentSeqBuilder::new(ctx);
        let chains = model
            .chains()
            .iter()
            .filter(|c| c.entity_id == entity_id && c.asym_id == asym_id);
        for chain in chains {
            let range = chain.residue_range.clone();
            let Some(first) = range
                .clone()
                .find(|&r| start.matches(model, &residues[r]))
            else {
                continue;
            };
            let Some(last) = (first..range.end).find(|&r| end.matches(model, &residues[r])) else {
                continue;
            };
            let atoms = residues[first].atom_range.start..residues[last].atom_range.end;
            if let Some(f) = range_fragment(ctx, atoms) {
                result.add(f);
            }
        }
        Ok(result.build())
    }))
}

fn compile_atoms_in_box(min: &Point3<f64>, max: &Point3<f64>) -> Result<Query, QueryError> {
    let valid = (0..3).all(|d| min[d].is_finite() && max[d].is_finite() && min[d] <= max[d]);
    if !valid {
        return Err(QueryError::InvalidBox {
            min: [min.x, min.y, min.z],
            max: [max.x, max.y, max.z],
        });
    }
    let bounds = Box3D::new(*min, *max);

    Ok(Query::from_fn(move |ctx| {
        let tree = ctx.tree()?;
        let atoms = ctx.structure().atoms();
        let mut query = tree.query(ctx.config().buffer_capacity);
        // Padded so rounding never drops a corner atom; `contains` has the final say.
        let radius = bounds.half_diagonal() * (1.0 + 1e-9) + 1e-9;
        let hits = query.nearest(&bounds.center(), radius)?;
        let mut inside: Vec<usize> = hits
            .indices()
            .iter()
            .map(|&h| tree.data()[h])
            .filter(|&i| bounds.contains(&atoms[i].position))
            .collect();
        inside.sort_unstable();
        Ok(single_fragment(ctx, inside))
    }))
}

fn compile_or(items: &[QueryExpr]) -> Result<Query, QueryError> {
    let queries = items.iter().map(compile_node).collect::<Result<Vec<_>, _>>()?;
    Ok(Query::from_fn(move |ctx| {
        let mut result = FragmentSeqBuilder::new(ctx);
        for q in &queries {
            for f in q.execute(ctx)?.into_fragments() {
                result.add(f);
            }
        }
        Ok(result.build())
    }))
}

fn compile_complement(what: Query) -> Query {
    Query::from_fn(move |ctx| {
        let selected = what.execute(ctx)?;
        let flags = atom_flags(ctx, &selected)?;
        let rest: Vec<usize> = ctx.atom_indices().filter(|&i| !flags[i]).collect();
        if rest.is_empty() {
            return Ok(FragmentSeq::empty(ctx));
        }
        Ok(FragmentSeq::new(
            ctx,
            vec![Fragment::from_sorted(ctx, COMPLEMENT_TAG, rest)],
        ))
    })
}

fn compile_union(what: Query) -> Query {
    Query::from_fn(move |ctx| {
        let seq = what.execute(ctx)?;
        Ok(single_fragment(ctx, seq.union_atom_indices()))
    })
}

fn compile_intersect_with(what: Query, within: Query) -> Query {
    Query::from_fn(move |ctx| {
        let flags = atom_flags(ctx, &within.execute(ctx)?)?;
        let mut result = HashFragmentSeqBuilder::new(ctx);
        for f in what.execute(ctx)?.iter() {
            let kept: Vec<usize> = f
                .atom_indices()
                .iter()
                .copied()
                .filter(|&i| flagged(&flags, i))
                .collect();
            if !kept.is_empty() {
                result.add(Fragment::from_sorted(ctx, f.tag(), kept));
            }
        }
        Ok(result.build())
    })
}

fn compile_inside(what: Query, within: Query) -> Query {
    Query::from_fn(move |ctx| {
        let flags = atom_flags(ctx, &within.execute(ctx)?)?;
        let mut result = FragmentSeqBuilder::new(ctx);
        for f in what.execute(ctx)?.into_fragments() {
            if f.atom_indices().iter().all(|&i| flagged(&flags, i)) {
                result.add(f);
            }
        }
        Ok(result.build())
    })
}

fn compile_ambient_residues(what: Query, radius: f64) -> Result<Query, QueryError> {
    check_radius(radius)?;
    Ok(Query::from_fn(move |ctx| {
        let seq = what.execute(ctx)?;
        if seq.is_empty() {
            return Ok(seq);
        }
        let tree = ctx.tree()?;
        let atoms = ctx.structure().atoms();
        let mut query = tree.query(ctx.config().buffer_capacity);
        trace!(fragments = seq.len(), radius, "Expanding ambient residues.");

        let mut result = FragmentSeqBuilder::new(ctx);
        for f in seq.iter() {
            let mut residues = Vec::new();
            for &i in f.atom_indices() {
                let hits = query.nearest(&atoms[i].position, radius)?;
                residues.extend(
                    hits.indices()
                        .iter()
                        .map(|&h| atoms[tree.data()[h]].residue_index),
                );
            }
            residues.sort_unstable();
            residues.dedup();
            let expanded = residue_atoms(ctx, &residues);
            if !expanded.is_empty() {
                result.add(Fragment::from_sorted(ctx, f.tag(), expanded));
            }
        }
        Ok(result.build())
    }))
}

fn compile_whole_residues(what: Query) -> Query {
    Query::from_fn(move |ctx| {
        let mut result = HashFragmentSeqBuilder::new(ctx);
        for f in what.execute(ctx)?.iter() {
            let expanded = residue_atoms(ctx, f.residue_indices());
            result.add(Fragment::from_sorted(ctx, f.tag(), expanded));
        }
        Ok(result.build())
    })
}

fn compile_flatten(what: Query, selector: SelectorFn) -> Query {
    Query::from_fn(move |ctx| {
        let mut result = FragmentSeqBuilder::new(ctx);
        for f in what.execute(ctx)?.iter() {
            for inner in selector(f)?.iter() {
                if let Some(&index) = inner.atom_indices().iter().find(|&&i| !ctx.has_atom(i)) {
                    return Err(QueryError::AtomNotInContext { index });
                }
                result.add(inner.rebind(ctx));
            }
        }
        Ok(result.build())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::builder::*;
    use crate::query::fixtures::{line_model, sample_context, sample_model};
    use crate::query::schema::{AsymIdSchema, EntityIdSchema};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn run(expr: QueryExpr, ctx: &Context) -> FragmentSeq {
        expr.compile().unwrap().execute(ctx).unwrap()
    }

    fn atoms_of(seq: &FragmentSeq) -> Vec<Vec<usize>> {
        seq.iter().map(|f| f.atom_indices().to_vec()).collect()
    }

    fn residue_set(seq: &FragmentSeq) -> Vec<usize> {
        let mut residues: Vec<usize> = seq
            .iter()
            .flat_map(|f| f.residue_indices().to_vec())
            .collect();
        residues.sort_unstable();
        residues.dedup();
        residues
    }

    #[test]
    fn everything_is_one_fragment_of_active_atoms() {
        let ctx = Context::of_atom_indices(sample_model(), &[3, 1, 8]).unwrap();
        assert_eq!(atoms_of(&run(everything(), &ctx)), vec![vec![1, 3, 8]]);

        let empty = Context::of_atom_indices(sample_model(), &[]).unwrap();
        assert!(run(everything(), &empty).is_empty());
    }

    #[test]
    fn atom_selectors_yield_one_fragment_per_atom() {
        let ctx = sample_context();
        let seq = run(atoms_by_element(["fe", "N"]), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![0], vec![5], vec![9], vec![15], vec![16]]);
        assert_eq!(seq.fragments()[3].tag(), 15);

        assert_eq!(
            run(atoms_by_name(["OG", "CB"]), &ctx).union_atom_indices(),
            vec![4, 13, 14]
        );
        assert_eq!(
            run(atoms_by_id([1, 19, 99]), &ctx).union_atom_indices(),
            vec![0, 18]
        );
    }

    #[test]
    fn schema_selectors_follow_row_order() {
        let ctx = sample_context();
        let seq = run(
            residues([
                ResidueIdSchema::name("SER"),
                ResidueIdSchema::name("ALA"),
            ]),
            &ctx,
        );
        assert_eq!(atoms_of(&seq), vec![vec![0, 1, 2, 3, 4], (9..15).collect()]);

        let seq = run(chains([AsymIdSchema::asym_id("C")]), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![17, 18]]);

        let seq = run(entities([EntityIdSchema::entity_type("non-polymer")]), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![15, 16]]);

        let seq = run(not_entities([EntityIdSchema::entity_id("1")]), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![15, 16], vec![17, 18]]);

        assert_eq!(
            run(residues_by_id([200, 201]), &ctx).len(),
            2
        );
        assert_eq!(
            run(chains_by_id(["X"]), &ctx).union_atom_indices(),
            vec![15, 16]
        );
    }

    #[test]
    fn schema_selectors_respect_the_mask() {
        let ctx = Context::of_atom_indices(sample_model(), &[2, 3, 17]).unwrap();
        let seq = run(residues([ResidueIdSchema::default()]), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![2, 3], vec![17]]);
        assert_eq!(seq.fragments()[0].tag(), 2);
    }

    #[test]
    fn index_selectors_validate_bounds() {
        let ctx = sample_context();
        assert_eq!(
            atoms_of(&run(residues_from_indices([3, 0]), &ctx)),
            vec![vec![15, 16], vec![0, 1, 2, 3, 4]]
        );
        assert_eq!(
            run(chains_from_indices([1]), &ctx).union_atom_indices(),
            vec![15, 16]
        );
        assert_eq!(run(entities_from_indices([2]), &ctx).len(), 1);
        assert_eq!(
            atoms_of(&run(atoms_from_indices([5, 1, 5]), &ctx)),
            vec![vec![1, 5]]
        );

        let err = residues_from_indices([6])
            .compile()
            .unwrap()
            .execute(&ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::RowIndexOutOfBounds {
                table: "residue",
                index: 6,
                count: 6
            }
        ));
        let err = atoms_from_indices([19]).compile().unwrap().execute(&ctx).unwrap_err();
        assert!(matches!(err, QueryError::AtomIndexOutOfBounds { index: 19, .. }));
    }

    #[test]
    fn het_groups_skip_water_named_residues_of_untyped_entities() {
        use crate::core::models::builder::MoleculeModelBuilder;
        use crate::core::models::residue::Residue;

        let mut b = MoleculeModelBuilder::new("UNTY");
        b.start_entity("1", EntityType::Unknown, "unknown");
        b.start_chain("A", "A").unwrap();
        b.start_residue(Residue::new("HEM", 1).het()).unwrap();
        b.add_atom(Atom::new(1, "FE", "FE", Point3::origin())).unwrap();
        b.start_residue(Residue::new("HOH", 2).het()).unwrap();
        b.add_atom(Atom::new(2, "O", "O", Point3::new(1.0, 0.0, 0.0)))
            .unwrap();
        b.start_residue(Residue::new("WAT", 3).het()).unwrap();
        b.add_atom(Atom::new(3, "O", "O", Point3::new(2.0, 0.0, 0.0)))
            .unwrap();
        let ctx = Context::of_structure(Arc::new(b.build().unwrap()));

        assert_eq!(atoms_of(&run(het_groups(), &ctx)), vec![vec![0]]);
    }

    #[test]
    fn convenience_selectors() {
        let ctx = sample_context();
        assert_eq!(atoms_of(&run(het_groups(), &ctx)), vec![vec![15, 16]]);
        assert_eq!(run(non_het_polymer(), &ctx).len(), 3);
        assert_eq!(run(cartoons(), &ctx).union_atom_indices(), (0..15).collect::<Vec<_>>());
        assert_eq!(
            run(backbone(), &ctx).union_atom_indices(),
            vec![0, 1, 2, 3, 5, 6, 7, 8, 9, 10, 11, 12]
        );
        assert_eq!(atoms_of(&run(sidechain(), &ctx)), vec![vec![4, 13, 14]]);
        assert_eq!(
            run(polymer_names(["GLY"], false), &ctx).union_atom_indices(),
            vec![5, 6, 7, 8]
        );
        assert_eq!(run(polymer_names(["GLY"], true), &ctx).len(), 2);
    }

    #[test]
    fn sequence_selects_inclusive_residue_span() {
        let ctx = sample_context();
        let seq = run(
            sequence(
                "1",
                "A",
                ResidueIdSchema::default().with_seq_number(2),
                ResidueIdSchema::default().with_seq_number(3),
            ),
            &ctx,
        );
        assert_eq!(atoms_of(&seq), vec![(5..15).collect::<Vec<_>>()]);

        let missing = run(
            sequence(
                "1",
                "B",
                ResidueIdSchema::default(),
                ResidueIdSchema::default(),
            ),
            &ctx,
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn sequence_rejects_conflicting_anchors() {
        let expr = sequence(
            "1",
            "A",
            ResidueIdSchema::name("ALA").with_asym_id("B"),
            ResidueIdSchema::default(),
        );
        assert!(matches!(expr.compile(), Err(QueryError::InvalidSchema(_))));
    }

    #[test]
    fn atoms_in_box_is_inclusive() {
        let ctx = sample_context();
        let seq = run(
            atoms_in_box(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 0.0)),
            &ctx,
        );
        assert_eq!(atoms_of(&seq), vec![vec![0, 1, 2, 3]]);

        let inverted = atoms_in_box(Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 1.0));
        assert!(matches!(inverted.compile(), Err(QueryError::InvalidBox { .. })));
    }

    #[test]
    fn algebraic_query_selects_one_fragment() {
        let ctx = sample_context();
        let p = algebraic::and(
            algebraic::equal(algebraic::atom_name(), algebraic::value("CA")),
            algebraic::greater(algebraic::residue_seq_number(), algebraic::value(1)),
        );
        assert_eq!(atoms_of(&run(algebraic::query(p), &ctx)), vec![vec![6, 10]]);
    }

    #[test]
    fn or_concatenates_without_dedup() {
        let ctx = sample_context();
        let seq = run(or([het_groups(), het_groups(), residues_by_name(["GLY"])]), &ctx);
        assert_eq!(
            atoms_of(&seq),
            vec![vec![15, 16], vec![15, 16], vec![5, 6, 7, 8]]
        );
        assert!(run(or(Vec::<QueryExpr>::new()), &ctx).is_empty());
    }

    #[test]
    fn complement_covers_the_rest_of_the_mask() {
        let ctx = Context::of_atom_indices(sample_model(), &[0, 1, 2, 15, 16]).unwrap();
        let seq = run(het_groups().complement(), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![0, 1, 2]]);
        assert_eq!(seq.fragments()[0].tag(), COMPLEMENT_TAG);
        assert!(run(everything().complement(), &ctx).is_empty());
    }

    #[test]
    fn complement_is_an_involution() {
        let ctx = sample_context();
        for expr in [het_groups(), backbone(), residues_by_name(["GLY", "HOH"]), everything()] {
            let once = run(expr.clone(), &ctx).union_atom_indices();
            let twice = run(complement(complement(expr)), &ctx).union_atom_indices();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn union_yields_exactly_one_fragment() {
        let ctx = sample_context();
        for expr in [atoms_by_element(["O"]), non_het_polymer(), het_groups()] {
            let expected = run(expr.clone(), &ctx).union_atom_indices();
            let seq = run(union(expr), &ctx);
            assert_eq!(seq.len(), 1);
            assert_eq!(seq.fragments()[0].atom_indices(), expected.as_slice());
        }
        assert!(run(atoms_by_name(["XX"]).union(), &ctx).is_empty());
    }

    #[test]
    fn intersect_and_inside_differ() {
        let ctx = sample_context();
        let a = atoms_from_indices([0, 1, 2, 3]);
        let b = atoms_from_indices([2, 3, 4, 5]);

        let intersected = run(a.clone().intersect_with(b.clone()), &ctx);
        assert_eq!(atoms_of(&intersected), vec![vec![2, 3]]);

        let inside = run(a.clone().inside(b), &ctx);
        assert!(inside.is_empty());

        let wider = atoms_from_indices([0, 1, 2, 3, 4]);
        assert_eq!(atoms_of(&run(a.inside(wider), &ctx)), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn intersect_drops_empty_and_duplicate_fragments() {
        let ctx = sample_context();
        let seq = run(
            atoms_by_element(["C", "N"]).intersect_with(residues_by_name(["ALA"])),
            &ctx,
        );
        assert_eq!(atoms_of(&seq), vec![vec![0], vec![1], vec![2], vec![4]]);

        let dup = run(
            or([het_groups(), het_groups()]).intersect_with(everything()),
            &ctx,
        );
        assert_eq!(dup.len(), 1);
    }

    #[test]
    fn whole_residues_expands_selected_atoms() {
        let mut b = crate::core::models::builder::MoleculeModelBuilder::new("TWO");
        b.start_entity("1", EntityType::Polymer, "polymer");
        b.start_chain("A", "A").unwrap();
        for (r, count) in [(1, 3), (2, 2)] {
            b.start_residue(crate::core::models::residue::Residue::new("ALA", r))
                .unwrap();
            for i in 0..count {
                b.add_atom(Atom::new(i, "CA", "C", Point3::new(r as f64, i as f64, 0.0)))
                    .unwrap();
            }
        }
        let ctx = Context::of_structure(Arc::new(b.build().unwrap()));
        let seq = run(atoms_from_indices([1]).whole_residues(), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn whole_residues_dedups_and_is_idempotent() {
        let ctx = sample_context();
        let seq = run(atoms_by_element(["C"]).whole_residues(), &ctx);
        assert_eq!(
            atoms_of(&seq),
            vec![vec![0, 1, 2, 3, 4], vec![5, 6, 7, 8], (9..15).collect()]
        );

        for expr in [atoms_by_element(["O"]), atoms_from_indices([1, 16, 17])] {
            let once = run(expr.clone().whole_residues(), &ctx);
            let twice = run(expr.whole_residues().whole_residues(), &ctx);
            assert_eq!(atoms_of(&once), atoms_of(&twice));
        }
    }

    #[test]
    fn ambient_residues_finds_neighbouring_residues() {
        let ctx = sample_context();
        // The water O at (4, 3, 0) is ~2.24 Å from the GLY O at (5, 1, 0).
        let seq = run(residues_by_id([200]).ambient_residues(2.5), &ctx);
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.fragments()[0].residue_indices(), &[1, 4]);

        let far = run(residues_by_id([201]).ambient_residues(5.0), &ctx);
        assert_eq!(atoms_of(&far), vec![vec![18]]);
    }

    #[test]
    fn ambient_residues_boundary_is_inclusive() {
        let ctx = Context::of_structure(line_model(5));
        let seq = run(atoms_from_indices([0]).ambient_residues(2.0), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn ambient_residues_with_zero_radius_equals_whole_residues() {
        let ctx = sample_context();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..20 {
            let picks: Vec<usize> = (0..3).map(|_| rng.gen_range(0..19)).collect();
            let expr = atoms_from_indices(picks);
            let ambient = run(expr.clone().ambient_residues(0.0), &ctx);
            let whole = run(expr.whole_residues(), &ctx);
            assert_eq!(residue_set(&ambient), residue_set(&whole));
        }
    }

    #[test]
    fn ambient_residues_stays_inside_the_mask() {
        let ctx = Context::of_atom_indices(sample_model(), &[5, 6, 7, 17]).unwrap();
        let seq = run(atoms_from_indices([17]).ambient_residues(10.0), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![5, 6, 7, 17]]);
    }

    #[test]
    fn invalid_radius_fails_at_compile_time() {
        for radius in [-1.0, f64::NAN, f64::INFINITY] {
            let err = everything().ambient_residues(radius).compile().unwrap_err();
            assert!(matches!(err, QueryError::InvalidRadius { .. }));
        }
    }

    #[test]
    fn flatten_runs_the_selector_per_fragment() {
        let ctx = sample_context();
        let seq = run(
            residues_by_name(["ALA", "SER"]).flatten(atoms_by_name(["CA"])),
            &ctx,
        );
        assert_eq!(atoms_of(&seq), vec![vec![1], vec![10]]);
        assert!(Context::ptr_eq(seq.fragments()[0].context(), &ctx));
    }

    #[test]
    fn flatten_with_custom_selector_rejects_foreign_atoms() {
        let ctx = Context::of_atom_indices(sample_model(), &[0, 1]).unwrap();
        let model = sample_model();
        let expr = everything().flatten_with(move |_| {
            let other = Context::of_structure(model.clone());
            Ok(FragmentSeq::new(&other, vec![Fragment::of_index(&other, 5)?]))
        });
        let err = expr.compile().unwrap().execute(&ctx).unwrap_err();
        assert!(matches!(err, QueryError::AtomNotInContext { index: 5 }));
    }

    #[test]
    fn set_operators_reject_atoms_from_a_larger_model() {
        let ctx = Context::of_structure(line_model(3));
        let foreign = Query::from_fn(|_| {
            let other = Context::of_structure(line_model(50));
            Ok(FragmentSeq::new(&other, vec![Fragment::of_index(&other, 40)?]))
        });
        let exprs = [
            QueryExpr::from(foreign.clone()).complement(),
            everything().intersect_with(foreign.clone()),
            everything().inside(foreign),
        ];
        for expr in exprs {
            let err = expr.compile().unwrap().execute(&ctx).unwrap_err();
            assert!(matches!(err, QueryError::AtomNotInContext { index: 40 }));
        }
    }

    #[test]
    fn filter_keeps_matching_fragments() {
        let ctx = sample_context();
        let seq = run(
            non_het_polymer().filter(|f| f.atom_count() > 4),
            &ctx,
        );
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn compiled_queries_can_be_embedded() {
        let ctx = sample_context();
        let hets = het_groups().compile().unwrap();
        let seq = run(QueryExpr::from(hets).whole_residues(), &ctx);
        assert_eq!(atoms_of(&seq), vec![vec![15, 16]]);
    }

    #[test]
    fn to_query_accepts_every_source() {
        let ctx = sample_context();
        let from_text = to_query("hetGroups()").unwrap();
        let from_expr = to_query(het_groups()).unwrap();
        let from_query = to_query(from_expr.clone()).unwrap();
        for q in [from_text, from_expr, from_query] {
            assert_eq!(q.execute(&ctx).unwrap().union_atom_indices(), vec![15, 16]);
        }
        assert!(matches!(to_query("hetGroups("), Err(QueryError::Parse { .. })));
    }

    #[test]
    fn compiled_query_is_reusable_across_contexts() {
        let query = parse("atomsByName(\"CA\").wholeResidues()").unwrap();
        let full = sample_context();
        let partial = Context::of_atom_indices(sample_model(), &[0, 1, 5]).unwrap();
        assert_eq!(query.execute(&full).unwrap().len(), 3);
        assert_eq!(atoms_of(&query.execute(&partial).unwrap()), vec![vec![0, 1]]);
    }
}
