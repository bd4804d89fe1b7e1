//! Bundled extension functions
//!
//! `serve` registers these so the default example query runs out of the box.

use oxigraph::model::{Literal, Term};

use crate::errors::Result;
use crate::registry::ExtensionRegistry;

pub const CUSTOM_CONCAT: &str = "https://w3id.org/sparql-functions/custom_concat";

/// Concatenate the lexical forms of literal arguments.
///
/// Any non-literal argument leaves the result unbound.
pub fn concat(args: &[Term]) -> Option<Term> {
    let mut out = String::new();
    for arg in args {
        match arg {
            Term::Literal(literal) => out.push_str(literal.value()),
            _ => return None,
        }
    }
    Some(Literal::new_simple_literal(out).into())
}

/// Register every bundled function
pub fn register_defaults(registry: &mut ExtensionRegistry) -> Result<()> {
    registry.register(CUSTOM_CONCAT, concat)
}
