use crate::{
    codegen::{ListingError, SemanticError},
    lexer::LexicalError,
    machine::RuntimeError,
    parser::GrammarError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))]
    Lexical(Vec<LexicalError>),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Listing(#[from] ListingError),
}
