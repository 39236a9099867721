//! Small hand-built models shared by the query tests.

use super::context::Context;
use crate::core::models::atom::Atom;
use crate::core::models::builder::MoleculeModelBuilder;
use crate::core::models::entity::EntityType;
use crate::core::models::model::MoleculeModel;
use crate::core::models::residue::Residue;
use nalgebra::Point3;
use std::sync::Arc;

/// Atom layout of [`sample_model`]:
///
/// | residue | name    | chain | atoms  |
/// |---------|---------|-------|--------|
/// | 0       | ALA 1   | A     | 0..5   |
/// | 1       | GLY 2   | A     | 5..9   |
/// | 2       | SER 3   | A     | 9..15  |
/// | 3       | HEM 100 | B     | 15..17 |
/// | 4       | HOH 200 | C     | 17..18 |
/// | 5       | HOH 201 | C     | 18..19 |
pub(crate) fn sample_model() -> Arc<MoleculeModel> {
    let mut b = MoleculeModelBuilder::new("1TST");
    let mut id = 0;
    let mut add = |b: &mut MoleculeModelBuilder, name: &str, element: &str, p: [f64; 3]| {
        id += 1;
        b.add_atom(Atom::new(id, name, element, Point3::new(p[0], p[1], p[2])))
            .unwrap();
    };

    b.start_entity("1", EntityType::Polymer, "polymer");
    b.start_chain("A", "A").unwrap();
    b.start_residue(Residue::new("ALA", 1)).unwrap();
    add(&mut b, "N", "N", [0.0, 0.0, 0.0]);
    add(&mut b, "CA", "C", [1.0, 0.0, 0.0]);
    add(&mut b, "C", "C", [2.0, 0.0, 0.0]);
    add(&mut b, "O", "O", [2.0, 1.0, 0.0]);
    add(&mut b, "CB", "C", [1.0, -1.0, 0.0]);
    b.start_residue(Residue::new("GLY", 2)).unwrap();
    add(&mut b, "N", "N", [3.0, 0.0, 0.0]);
    add(&mut b, "CA", "C", [4.0, 0.0, 0.0]);
    add(&mut b, "C", "C", [5.0, 0.0, 0.0]);
    add(&mut b, "O", "O", [5.0, 1.0, 0.0]);
    b.start_residue(Residue::new("SER", 3)).unwrap();
    add(&mut b, "N", "N", [6.0, 0.0, 0.0]);
    add(&mut b, "CA", "C", [7.0, 0.0, 0.0]);
    add(&mut b, "C", "C", [8.0, 0.0, 0.0]);
    add(&mut b, "O", "O", [8.0, 1.0, 0.0]);
    add(&mut b, "CB", "C", [7.0, -1.0, 0.0]);
    add(&mut b, "OG", "O", [7.0, -2.0, 0.0]);

    b.start_entity("2", EntityType::NonPolymer, "non-polymer");
    b.start_chain("B", "X").unwrap();
    b.start_residue(Residue::new("HEM", 100).het()).unwrap();
    add(&mut b, "FE", "Fe", [20.0, 0.0, 0.0]);
    add(&mut b, "NA", "N", [21.0, 0.0, 0.0]);

    b.start_entity("3", EntityType::Water, "water");
    b.start_chain("C", "W").unwrap();
    b.start_residue(Residue::new("HOH", 200).het()).unwrap();
    add(&mut b, "O", "O", [4.0, 3.0, 0.0]);
    b.start_residue(Residue::new("HOH", 201).het()).unwrap();
    add(&mut b, "O", "O", [30.0, 30.0, 30.0]);

    Arc::new(b.build().unwrap())
}

pub(crate) fn sample_context() -> Context {
    Context::of_structure(sample_model())
}

/// `n` carbon atoms on the x axis, one per residue, spaced 1 Å apart.
pub(crate) fn line_model(n: usize) -> Arc<MoleculeModel> {
    let mut b = MoleculeModelBuilder::new("LINE");
    b.start_entity("1", EntityType::Polymer, "polymer");
    b.start_chain("A", "A").unwrap();
    for i in 0..n {
        b.start_residue(Residue::new("GLY", i as i32 + 1)).unwrap();
        b.add_atom(Atom::new(i as i32 + 1, "CA", "C", Point3::new(i as f64, 0.0, 0.0)))
            .unwrap();
    }
    Arc::new(b.build().unwrap())
}
