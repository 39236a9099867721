use crate::cli::{OutputFormat, SelectArgs};
use crate::data;
use crate::error::Result;
use molsel::query::{self, Context, FragmentSeq, QueryConfig, QueryConfigBuilder};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

pub fn run(args: &SelectArgs, out: &mut impl Write) -> Result<()> {
    let config = resolve_config(args)?;
    debug!(?config, "Resolved query configuration.");

    let query = query::parse(&args.query)?;
    let model = Arc::new(data::load_model(&args.model)?);
    let ctx = Context::of_structure_with_config(model, config);

    let mut seq = query.execute(&ctx)?;
    if args.union {
        seq = match seq.union_fragment() {
            Some(f) => FragmentSeq::new(&ctx, vec![f]),
            None => FragmentSeq::empty(&ctx),
        };
    }
    info!(
        fragments = seq.len(),
        atoms = seq.union_atom_indices().len(),
        "Query executed."
    );

    match args.format {
        OutputFormat::Text => write_text(&seq, out),
        OutputFormat::Csv => write_csv(&seq, out),
    }
}

/// File values first, then command-line overrides.
fn resolve_config(args: &SelectArgs) -> Result<QueryConfig> {
    let base = match &args.config {
        Some(path) => {
            info!("Loading query configuration from {:?}", path);
            QueryConfig::load(path)?
        }
        None => QueryConfig::default(),
    };
    let mut builder = QueryConfigBuilder::from_config(base);
    if let Some(leaf_size) = args.leaf_size {
        builder = builder.leaf_size(leaf_size);
    }
    if args.eager_tree {
        builder = builder.eager_tree(true);
    }
    Ok(builder.build()?)
}

fn write_text(seq: &FragmentSeq, out: &mut impl Write) -> Result<()> {
    for f in seq {
        writeln!(
            out,
            "{}\t{}\t{}",
            f.id(),
            f.atom_count(),
            f.fingerprint()
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct AtomRow<'a> {
    fragment: usize,
    atom_index: usize,
    atom_id: i32,
    atom_name: &'a str,
    element: &'a str,
    residue: String,
    chain: &'a str,
    x: f64,
    y: f64,
    z: f64,
}

fn write_csv(seq: &FragmentSeq, out: &mut impl Write) -> Result<()> {
    let model = seq.context().structure();
    let mut writer = csv::Writer::from_writer(out);
    for (fragment, f) in seq.iter().enumerate() {
        for &i in f.atom_indices() {
            let atom = &model.atoms()[i];
            let residue = &model.residues()[atom.residue_index];
            writer.serialize(AtomRow {
                fragment,
                atom_index: i,
                atom_id: atom.id,
                atom_name: &atom.name,
                element: &atom.element_symbol,
                residue: residue.label(),
                chain: &residue.asym_id,
                x: atom.position.x,
                y: atom.position.y,
                z: atom.position.z,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}
