//! Small script front end that drives the runtime builtins directly, without
//! a code generator in between.

pub mod eval;
pub mod parser;

use crate::diagnostics::ScriptError;
use miette::NamedSource;

/// Parses, resolves and runs `source`. Top-level results are released as soon
/// as they are produced; evaluation stops at the first runtime error.
pub fn run_source(name: &str, source: &str) -> Result<(), ScriptError> {
    let named = || NamedSource::new(name, source.to_string());
    let script = parser::parse(source).map_err(|err| ScriptError::syntax(named(), err))?;
    let nodes = eval::resolve(&script).map_err(|err| ScriptError::check(named(), err))?;
    for node in &nodes {
        match eval::evaluate(node) {
            Ok(result) => drop(result),
            Err(error) => {
                return Err(ScriptError::Runtime {
                    src: named(),
                    span: node.span.clone().into(),
                    error,
                })
            }
        }
    }
    Ok(())
}
