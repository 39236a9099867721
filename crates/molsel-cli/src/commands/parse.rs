use crate::cli::ParseArgs;
use crate::error::Result;
use molsel::query::QueryExpr;
use std::io::Write;
use tracing::info;

pub fn run(args: &ParseArgs, out: &mut impl Write) -> Result<()> {
    let expr: QueryExpr = args.query.parse()?;
    info!("Query parsed.");
    writeln!(out, "{}", expr)?;
    Ok(())
}
