use crate::driver::eval::CheckError;
use crate::driver::parser::ParseError;
use crate::runtime::error::RuntimeError;
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

/// A script failure located in its source.
#[derive(Debug, Error, Diagnostic)]
pub enum ScriptError {
    #[error("{message}")]
    #[diagnostic(code(prime_rt::syntax))]
    Syntax {
        #[source_code]
        src: NamedSource<String>,
        #[label("{label}")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
        message: String,
        label: String,
    },
    #[error("unknown function `{name}`")]
    #[diagnostic(code(prime_rt::unknown_function))]
    UnknownFunction {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a builtin")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
        name: String,
    },
    #[error("`{name}` takes {expected} argument(s) but {found} were given")]
    #[diagnostic(code(prime_rt::arity))]
    Arity {
        #[source_code]
        src: NamedSource<String>,
        #[label("called here")]
        span: SourceSpan,
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{error}")]
    #[diagnostic(code(prime_rt::runtime))]
    Runtime {
        #[source_code]
        src: NamedSource<String>,
        #[label("while evaluating this expression")]
        span: SourceSpan,
        error: RuntimeError,
    },
}

impl ScriptError {
    pub fn syntax(src: NamedSource<String>, err: ParseError) -> Self {
        ScriptError::Syntax {
            src,
            span: err.span,
            help: err.help,
            message: err.message,
            label: err.label,
        }
    }

    pub fn check(src: NamedSource<String>, err: CheckError) -> Self {
        match err {
            CheckError::UnknownFunction {
                name,
                span,
                suggestion,
            } => ScriptError::UnknownFunction {
                src,
                span: span.into(),
                help: suggestion.map(|candidate| format!("did you mean `{candidate}`?")),
                name,
            },
            CheckError::Arity {
                name,
                expected,
                found,
                span,
            } => ScriptError::Arity {
                src,
                span: span.into(),
                name,
                expected,
                found,
            },
        }
    }
}

pub fn report_script_error(error: ScriptError) {
    eprintln!("{:?}", Report::new(error));
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}
