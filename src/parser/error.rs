use super::Rule;

/// A grammar error. Parsing stops at the first one.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("line {line}: grammar error in {rule}, {kind}")]
pub struct GrammarError {
    pub line: usize,
    pub rule: Rule,
    pub kind: GrammarErrorKind,
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("identifier {0} is declared twice")]
    Redeclared(String),
    #[error("identifier {0} is not declared")]
    Undeclared(String),
    #[error("{0} is not allowed here")]
    Disallowed(String),
    #[error("unrecognized statement starting with {0:?}")]
    UnrecognizedStatement(String),
    #[error("unexpected end of input, the program may be incomplete")]
    UnexpectedEnd,
    #[error("unmatched closing brace")]
    UnbalancedBrace,
    #[error("the program has no main function")]
    MissingMain,
    #[error("unexpected {0:?} after the main function")]
    TrailingInput(String),
}
