/// A lexical error. These are recoverable: the lexer records them and keeps
/// scanning from the next character.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("line {line}: lexical error, {kind}")]
pub struct LexicalError {
    pub line: usize,
    pub kind: LexicalErrorKind,
}

impl LexicalError {
    pub fn new(line: usize, kind: LexicalErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum LexicalErrorKind {
    #[error("illegal character {0:?}")]
    IllegalCharacter(char),
    #[error("malformed operator {0:?}")]
    MalformedOperator(String),
    #[error("comments must not nest")]
    NestedComment,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("integer literal {0} is too large")]
    IntegerOverflow(String),
}
