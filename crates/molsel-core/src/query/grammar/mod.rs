//! Textual query language.
//!
//! Queries are written the way the builder API reads: constructor calls with
//! method-chained modifiers.
//!
//! ```text
//! residues({name: "HEM"}).ambientResidues(5).wholeResidues()
//! or(hetGroups(), query(equal(atomName(), "CA")))
//! atomsInBox({x: 0, y: 0, z: 0}, {x: 10, y: 10, z: 10}).complement()
//! ```
//!
//! Every expression built only from built-in nodes prints back in this syntax, so
//! `parse(&expr.to_string())` reproduces `expr`.

mod error;
mod lower;
mod parser;
mod token;

pub use error::ParseError;

use super::builder::QueryExpr;
use lower::Lowerer;
use parser::Parser;
use token::Lexer;

pub fn parse(input: &str) -> Result<QueryExpr, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    let term = Parser::new(tokens, input).parse()?;
    Lowerer::new(input).query(&term)
}

/// Double-quotes `s`, escaping what the lexer would otherwise misread.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
