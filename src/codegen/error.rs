use std::fmt;

use crate::parser::Rule;

/// A semantic error found while generating code. Generation stops at the
/// first one.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("line {line}: semantic error in {rule}, {kind}")]
pub struct SemanticError {
    pub line: usize,
    pub rule: Rule,
    pub kind: SemanticErrorKind,
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum SemanticErrorKind {
    #[error("case {0} appears twice in one switch")]
    DuplicateCase(i64),
    #[error("{name} takes {expected} arguments but {found} were supplied")]
    ArgumentsMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{0} is not a function")]
    NotCallable(String),
    #[error("{0} is not an array")]
    NotAnArray(String),
    #[error("array {0} is used without an index")]
    MissingIndex(String),
    #[error("function {0} is used as a variable")]
    NotAVariable(String),
    #[error("index {index} of {name} is out of bounds, max index is {max}")]
    IndexOutOfBounds { name: String, max: i64, index: i64 },
    #[error("continue has no enclosing loop")]
    ContinueOutsideLoop,
    #[error("identifier {0} is not declared")]
    Undeclared(String),
    #[error("malformed syntax tree, expected {0}")]
    Malformed(Rule),
}

/// A structural anomaly that does not stop generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    pub line: usize,
    pub kind: WarningKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WarningKind {
    EmptyBody,
    SurplusInitializers {
        name: String,
        size: usize,
        found: usize,
    },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::EmptyBody => write!(f, "function body has no statements"),
            WarningKind::SurplusInitializers { name, size, found } => write!(
                f,
                "array {name} has {size} elements but {found} initializers, the surplus is dropped"
            ),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: warning, {}", self.line, self.kind)
    }
}
