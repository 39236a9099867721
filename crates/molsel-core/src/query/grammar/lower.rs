//! Lowering of parsed terms into query expressions, predicates and selectors.

use super::error::ParseError;
use super::parser::{Field, Term, TermKind};
use crate::query::algebraic::{self, Comparison, Predicate, Selector, Value};
use crate::query::builder::{self, QueryExpr};
use crate::query::schema::{AsymIdSchema, EntityIdSchema, ResidueIdSchema};
use nalgebra::Point3;

pub struct Lowerer<'a> {
    input: &'a str,
}

impl<'a> Lowerer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    fn err(&self, msg: impl Into<String>, span: (usize, usize)) -> ParseError {
        ParseError::new(msg, span, self.input)
    }

    fn arity(
        &self,
        name: &str,
        name_span: (usize, usize),
        args: &[Term],
        expected: usize,
    ) -> Result<(), ParseError> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(self.err(
                format!(
                    "'{}' takes {} argument(s), got {}",
                    name,
                    expected,
                    args.len()
                ),
                name_span,
            ))
        }
    }

    pub fn query(&self, term: &Term) -> Result<QueryExpr, ParseError> {
        let TermKind::Call {
            name,
            name_span,
            args,
        } = &term.kind
        else {
            return Err(self.err("Expected a query", term.span));
        };
        let name_span = *name_span;
        let nullary = |expr: QueryExpr| -> Result<QueryExpr, ParseError> {
            self.arity(name, name_span, args, 0)?;
            Ok(expr)
        };

        match name.as_str() {
            "everything" => nullary(builder::everything()),
            "hetGroups" => nullary(builder::het_groups()),
            "nonHetPolymer" => nullary(builder::non_het_polymer()),
            "cartoons" => nullary(builder::cartoons()),
            "backbone" => nullary(builder::backbone()),
            "sidechain" => nullary(builder::sidechain()),
            "atomsByElement" => Ok(builder::atoms_by_element(self.all(args, Self::string)?)),
            "atomsByName" => Ok(builder::atoms_by_name(self.all(args, Self::string)?)),
            "atomsById" => Ok(builder::atoms_by_id(self.all(args, Self::integer)?)),
            "residues" => Ok(builder::residues(self.all(args, Self::residue_schema)?)),
            "chains" => Ok(builder::chains(self.all(args, Self::asym_schema)?)),
            "entities" => Ok(builder::entities(self.all(args, Self::entity_schema)?)),
            "notEntities" => Ok(builder::not_entities(self.all(args, Self::entity_schema)?)),
            "entitiesFromIndices" => Ok(builder::entities_from_indices(
                self.all(args, Self::index)?,
            )),
            "chainsFromIndices" => Ok(builder::chains_from_indices(self.all(args, Self::index)?)),
            "residuesFromIndices" => Ok(builder::residues_from_indices(
                self.all(args, Self::index)?,
            )),
            "atomsFromIndices" => Ok(builder::atoms_from_indices(self.all(args, Self::index)?)),
            "residuesByName" => Ok(builder::residues_by_name(self.all(args, Self::string)?)),
            "residuesById" => Ok(builder::residues_by_id(self.all(args, Self::integer)?)),
            "chainsById" => Ok(builder::chains_by_id(self.all(args, Self::string)?)),
            "sequence" => {
                self.arity(name, name_span, args, 4)?;
                Ok(builder::sequence(
                    &self.string(&args[0])?,
                    &self.string(&args[1])?,
                    self.residue_schema(&args[2])?,
                    self.residue_schema(&args[3])?,
                ))
            }
            "atomsInBox" => {
                self.arity(name, name_span, args, 2)?;
                Ok(builder::atoms_in_box(
                    self.point(&args[0])?,
                    self.point(&args[1])?,
                ))
            }
            "polymerNames" => Ok(builder::polymer_names(self.all(args, Self::string)?, false)),
            "notPolymerNames" => Ok(builder::polymer_names(self.all(args, Self::string)?, true)),
            "query" => {
                self.arity(name, name_span, args, 1)?;
                Ok(algebraic::query(self.predicate(&args[0])?))
            }
            "or" => Ok(builder::or(self.all(args, Self::query)?)),
            "complement" => {
                self.arity(name, name_span, args, 1)?;
                Ok(builder::complement(self.query(&args[0])?))
            }
            "wholeResidues" => {
                self.arity(name, name_span, args, 1)?;
                Ok(builder::whole_residues(self.query(&args[0])?))
            }
            "union" => {
                self.arity(name, name_span, args, 1)?;
                Ok(builder::union(self.query(&args[0])?))
            }
            "ambientResidues" => {
                self.arity(name, name_span, args, 2)?;
                Ok(builder::ambient_residues(
                    self.query(&args[0])?,
                    self.number(&args[1])?,
                ))
            }
            "inside" | "intersectWith" | "flatten" => {
                self.arity(name, name_span, args, 2)?;
                let what = self.query(&args[0])?;
                let other = self.query(&args[1])?;
                Ok(match name.as_str() {
                    "inside" => builder::inside(what, other),
                    "intersectWith" => builder::intersect_with(what, other),
                    _ => builder::flatten(what, other),
                })
            }
            _ => Err(self.err(format!("Unknown query '{}'", name), name_span)),
        }
    }

    fn all<T>(
        &self,
        args: &[Term],
        lower: fn(&Self, &Term) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        args.iter().map(|a| lower(self, a)).collect()
    }

    pub fn predicate(&self, term: &Term) -> Result<Predicate, ParseError> {
        let TermKind::Call {
            name,
            name_span,
            args,
        } = &term.kind
        else {
            return Err(self.err("Expected a predicate", term.span));
        };
        let name_span = *name_span;

        if let Some(op) = Comparison::from_name(name) {
            self.arity(name, name_span, args, 2)?;
            return Ok(Predicate::Compare {
                op,
                left: self.selector(&args[0])?,
                right: self.selector(&args[1])?,
            });
        }
        match name.as_str() {
            "not" => {
                self.arity(name, name_span, args, 1)?;
                Ok(algebraic::not(self.predicate(&args[0])?))
            }
            "and" | "or" => {
                if args.len() < 2 {
                    return Err(self.err(
                        format!("'{}' takes at least 2 arguments, got {}", name, args.len()),
                        name_span,
                    ));
                }
                let combine: fn(Predicate, Predicate) -> Predicate = if name == "and" {
                    algebraic::and
                } else {
                    algebraic::or
                };
                let mut operands = self.all(args, Self::predicate)?.into_iter();
                let mut result = operands
                    .next()
                    .ok_or_else(|| self.err("Missing operand", name_span))?;
                for p in operands {
                    result = combine(result, p);
                }
                Ok(result)
            }
            "backbone" => {
                self.arity(name, name_span, args, 0)?;
                Ok(algebraic::backbone())
            }
            "sidechain" => {
                self.arity(name, name_span, args, 0)?;
                Ok(algebraic::sidechain())
            }
            "inRange" => {
                self.arity(name, name_span, args, 3)?;
                Ok(algebraic::in_range(
                    self.selector(&args[0])?,
                    self.number(&args[1])?,
                    self.number(&args[2])?,
                ))
            }
            _ => Err(self.err(format!("Unknown predicate '{}'", name), name_span)),
        }
    }

    /// Bare literals are read as constant values.
    pub fn selector(&self, term: &Term) -> Result<Selector, ParseError> {
        match &term.kind {
            TermKind::Str(_) | TermKind::Number(_) => Ok(Selector::Value(self.value(term)?)),
            TermKind::Call {
                name,
                name_span,
                args,
            } => {
                let name_span = *name_span;
                if name == "value" {
                    self.arity(name, name_span, args, 1)?;
                    return Ok(Selector::Value(self.value(&args[0])?));
                }
                let selector = match name.as_str() {
                    "residueSeqNumber" => algebraic::residue_seq_number(),
                    "residueName" => algebraic::residue_name(),
                    "elementSymbol" => algebraic::element_symbol(),
                    "atomName" => algebraic::atom_name(),
                    "entityType" => algebraic::entity_type(),
                    _ => return Err(self.err(format!("Unknown selector '{}'", name), name_span)),
                };
                self.arity(name, name_span, args, 0)?;
                Ok(selector)
            }
            TermKind::Object(_) => Err(self.err("Expected a selector", term.span)),
        }
    }

    fn value(&self, term: &Term) -> Result<Value, ParseError> {
        match &term.kind {
            TermKind::Str(s) => Ok(Value::Text(s.clone())),
            TermKind::Number(n) => Ok(Value::Number(*n)),
            _ => Err(self.err("Expected a string or number", term.span)),
        }
    }

    fn string(&self, term: &Term) -> Result<String, ParseError> {
        match &term.kind {
            TermKind::Str(s) => Ok(s.clone()),
            _ => Err(self.err("Expected a string", term.span)),
        }
    }

    fn number(&self, term: &Term) -> Result<f64, ParseError> {
        match &term.kind {
            TermKind::Number(n) => Ok(*n),
            _ => Err(self.err("Expected a number", term.span)),
        }
    }

    fn integer(&self, term: &Term) -> Result<i32, ParseError> {
        let n = self.number(term)?;
        if n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64 {
            Ok(n as i32)
        } else {
            Err(self.err(format!("Expected an integer, got {}", n), term.span))
        }
    }

    fn index(&self, term: &Term) -> Result<usize, ParseError> {
        let n = self.number(term)?;
        if n.fract() == 0.0 && n >= 0.0 && n <= u32::MAX as f64 {
            Ok(n as usize)
        } else {
            Err(self.err(format!("Expected a non-negative index, got {}", n), term.span))
        }
    }

    fn fields<'t>(&self, term: &'t Term, allowed: &[&str]) -> Result<&'t [Field], ParseError> {
        let TermKind::Object(fields) = &term.kind else {
            return Err(self.err("Expected an object", term.span));
        };
        for (i, field) in fields.iter().enumerate() {
            if !allowed.contains(&field.key.as_str()) {
                return Err(self.err(
                    format!(
                        "Unknown field '{}' (expected one of: {})",
                        field.key,
                        allowed.join(", ")
                    ),
                    field.key_span,
                ));
            }
            if fields[..i].iter().any(|f| f.key == field.key) {
                return Err(self.err(format!("Duplicate field '{}'", field.key), field.key_span));
            }
        }
        Ok(fields)
    }

    fn point(&self, term: &Term) -> Result<Point3<f64>, ParseError> {
        let fields = self.fields(term, &["x", "y", "z"])?;
        let mut coords = [0.0; 3];
        for (d, axis) in ["x", "y", "z"].into_iter().enumerate() {
            let field = fields
                .iter()
                .find(|f| f.key == axis)
                .ok_or_else(|| self.err(format!("Missing coordinate '{}'", axis), term.span))?;
            coords[d] = self.number(&field.value)?;
        }
        Ok(Point3::new(coords[0], coords[1], coords[2]))
    }

    fn entity_schema(&self, term: &Term) -> Result<EntityIdSchema, ParseError> {
        let mut schema = EntityIdSchema::default();
        for field in self.fields(term, &["entityId", "type"])? {
            let value = Some(self.string(&field.value)?);
            match field.key.as_str() {
                "entityId" => schema.entity_id = value,
                _ => schema.entity_type = value,
            }
        }
        Ok(schema)
    }

    fn asym_schema(&self, term: &Term) -> Result<AsymIdSchema, ParseError> {
        let mut schema = AsymIdSchema::default();
        for field in self.fields(term, &["entityId", "type", "asymId", "authAsymId"])? {
            let value = Some(self.string(&field.value)?);
            match field.key.as_str() {
                "entityId" => schema.entity_id = value,
                "type" => schema.entity_type = value,
                "asymId" => schema.asym_id = value,
                _ => schema.auth_asym_id = value,
            }
        }
        Ok(schema)
    }

    fn residue_schema(&self, term: &Term) -> Result<ResidueIdSchema, ParseError> {
        const KEYS: [&str; 9] = [
            "entityId",
            "type",
            "asymId",
            "authAsymId",
            "name",
            "seqNumber",
            "authName",
            "authSeqNumber",
            "insCode",
        ];
        let mut schema = ResidueIdSchema::default();
        for field in self.fields(term, &KEYS)? {
            let value = &field.value;
            match field.key.as_str() {
                "seqNumber" => schema.seq_number = Some(self.integer(value)?),
                "authSeqNumber" => schema.auth_seq_number = Some(self.integer(value)?),
                key => {
                    let text = Some(self.string(value)?);
                    match key {
                        "entityId" => schema.entity_id = text,
                        "type" => schema.entity_type = text,
                        "asymId" => schema.asym_id = text,
                        "authAsymId" => schema.auth_asym_id = text,
                        "name" => schema.name = text,
                        "authName" => schema.auth_name = text,
                        _ => schema.ins_code = text,
                    }
                }
            }
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use crate::query::algebraic::{self, Predicate};
    use crate::query::builder::QueryExpr;
    use crate::query::grammar::parse;
    use crate::query::schema::{AsymIdSchema, ResidueIdSchema};

    fn predicate_of(text: &str) -> Predicate {
        match parse(text).unwrap() {
            QueryExpr::Algebraic(p) => p,
            other => panic!("Expected an algebraic query, got {:?}", other),
        }
    }

    #[test]
    fn schemas_accept_known_keys() {
        match parse("residues({asymId: 'A', seqNumber: 10, insCode: \"B\"})").unwrap() {
            QueryExpr::Residues(ids) => assert_eq!(
                ids,
                vec![ResidueIdSchema {
                    ins_code: Some("B".into()),
                    ..ResidueIdSchema::default().with_seq_number(10).with_asym_id("A")
                }]
            ),
            other => panic!("Unexpected {:?}", other),
        }
        match parse("chains({authAsymId: \"X\"}, {})").unwrap() {
            QueryExpr::Chains(ids) => {
                assert_eq!(ids, vec![AsymIdSchema::auth_asym_id("X"), AsymIdSchema::default()])
            }
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn schema_errors_point_at_the_field() {
        let err = parse("residues({seqNo: 1})").unwrap_err();
        assert_eq!(err.span, (10, 15));
        assert!(err.message.contains("Unknown field 'seqNo'"));

        let err = parse("residues({name: 'A', name: 'B'})").unwrap_err();
        assert!(err.message.contains("Duplicate"));

        let err = parse("residues({seqNumber: 1.5})").unwrap_err();
        assert!(err.message.contains("integer"));

        let err = parse("entities({type: 1})").unwrap_err();
        assert!(err.message.contains("Expected a string"));
    }

    #[test]
    fn predicates_accept_bare_literals() {
        assert_eq!(
            predicate_of("query(equal(atomName(), \"CA\"))"),
            algebraic::equal(algebraic::atom_name(), algebraic::value("CA"))
        );
        assert_eq!(
            predicate_of("query(and(backbone(), not(greater(residueSeqNumber(), value(2))), sidechain()))"),
            algebraic::and(
                algebraic::and(
                    algebraic::backbone(),
                    algebraic::not(algebraic::greater(
                        algebraic::residue_seq_number(),
                        algebraic::value(2)
                    ))
                ),
                algebraic::sidechain()
            )
        );
        assert_eq!(
            predicate_of("query(inRange(residueSeqNumber(), 1, 2.5))"),
            algebraic::in_range(algebraic::residue_seq_number(), 1.0, 2.5)
        );
    }

    #[test]
    fn unknown_names_are_reported_by_context() {
        let err = parse("everything().frobnicate()").unwrap_err();
        assert!(err.message.contains("Unknown query 'frobnicate'"));
        assert_eq!(err.span, (13, 23));

        let err = parse("query(maybe())").unwrap_err();
        assert!(err.message.contains("Unknown predicate"));

        let err = parse("query(equal(charge(), 1))").unwrap_err();
        assert!(err.message.contains("Unknown selector"));

        let err = parse("\"CA\"").unwrap_err();
        assert!(err.message.contains("Expected a query"));
    }

    #[test]
    fn arity_is_checked() {
        let err = parse("hetGroups(1)").unwrap_err();
        assert!(err.message.contains("takes 0 argument(s), got 1"));

        let err = parse("everything().ambientResidues()").unwrap_err();
        assert!(err.message.contains("takes 2 argument(s), got 1"));

        let err = parse("query(and(backbone()))").unwrap_err();
        assert!(err.message.contains("at least 2"));
    }

    #[test]
    fn boxes_need_every_coordinate() {
        let err = parse("atomsInBox({x: 0, y: 0}, {x: 1, y: 1, z: 1})").unwrap_err();
        assert!(err.message.contains("Missing coordinate 'z'"));

        let err = parse("atomsFromIndices(-1)").unwrap_err();
        assert!(err.message.contains("non-negative"));
    }
}
