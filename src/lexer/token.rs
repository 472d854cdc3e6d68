use std::fmt;

use phf::phf_map;

pub static KEYWORDS: phf::Map<&str, TokenKind> = phf_map! {
    "break" => TokenKind::Break,
    "call" => TokenKind::Call,
    "case" => TokenKind::Case,
    "continue" => TokenKind::Continue,
    "default" => TokenKind::Default,
    "do" => TokenKind::Do,
    "else" => TokenKind::Else,
    "for" => TokenKind::For,
    "function" => TokenKind::Function,
    "if" => TokenKind::If,
    "int" => TokenKind::Int,
    "main" => TokenKind::Main,
    "read" => TokenKind::Read,
    "return" => TokenKind::Return,
    "switch" => TokenKind::Switch,
    "while" => TokenKind::While,
    "write" => TokenKind::Write,
};

pub static TWO_SYMBOLS_TOKENS: phf::Map<&str, TokenKind> = phf_map! {
    "==" => TokenKind::DoubleEqual,
    "!=" => TokenKind::NotEqual,
    "<=" => TokenKind::LessEqual,
    ">=" => TokenKind::GreaterEqual,
    "&&" => TokenKind::DoubleAmpersand,
    "||" => TokenKind::DoublePipe,
};

pub static ONE_SYMBOL_TOKENS: phf::Map<char, TokenKind> = phf_map! {
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    '=' => TokenKind::Equal,
    '<' => TokenKind::LessThan,
    '>' => TokenKind::GreaterThan,
    '(' => TokenKind::OpenParen,
    ')' => TokenKind::CloseParen,
    '{' => TokenKind::OpenCurlyBrace,
    '}' => TokenKind::CloseCurlyBrace,
    '[' => TokenKind::OpenSquareBrace,
    ']' => TokenKind::CloseSquareBrace,
    ':' => TokenKind::Colon,
    ';' => TokenKind::SemiColon,
    ',' => TokenKind::Comma,
};

/// Looks a word up in the keyword set, ignoring case.
pub fn keyword(word: &str) -> Option<TokenKind> {
    KEYWORDS.get(word.to_ascii_lowercase().as_str()).copied()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Num,

    If,
    Else,
    For,
    While,
    Do,
    Int,
    Write,
    Read,
    Switch,
    Case,
    Default,
    Call,
    Function,
    Main,
    Return,
    Break,
    Continue,

    Plus,
    Minus,
    Star,
    Slash,
    Equal,

    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    DoubleEqual,
    NotEqual,
    DoubleAmpersand,
    DoublePipe,

    OpenParen,
    CloseParen,
    OpenCurlyBrace,
    CloseCurlyBrace,
    OpenSquareBrace,
    CloseSquareBrace,
    Colon,
    SemiColon,
    Comma,
}

impl TokenKind {
    /// The type tag used in the token listing.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Ident => "ID",
            TokenKind::Num => "NUM",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::Int => "int",
            TokenKind::Write => "write",
            TokenKind::Read => "read",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Call => "call",
            TokenKind::Function => "function",
            TokenKind::Main => "main",
            TokenKind::Return => "return",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Equal => "=",
            TokenKind::LessThan => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::DoubleEqual => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::DoubleAmpersand => "&&",
            TokenKind::DoublePipe => "||",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenCurlyBrace => "{",
            TokenKind::CloseCurlyBrace => "}",
            TokenKind::OpenSquareBrace => "[",
            TokenKind::CloseSquareBrace => "]",
            TokenKind::Colon => ":",
            TokenKind::SemiColon => ";",
            TokenKind::Comma => ",",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            TokenKind::LessThan
                | TokenKind::LessEqual
                | TokenKind::GreaterThan
                | TokenKind::GreaterEqual
                | TokenKind::DoubleEqual
                | TokenKind::NotEqual
                | TokenKind::DoubleAmpersand
                | TokenKind::DoublePipe
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.text)
    }
}

pub const NEWLINE_MARKER: &str = "[enter]";

/// The token stream as the parser sees it: one `TYPE VALUE` line per token,
/// with a newline marker for every source line crossed.
pub struct Listing<'a>(pub &'a [Token]);

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = 1;
        for token in self.0 {
            while line < token.line {
                writeln!(f, "{NEWLINE_MARKER}")?;
                line += 1;
            }
            writeln!(f, "{token}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_ignores_case() {
        assert_eq!(keyword("WHILE"), Some(TokenKind::While));
        assert_eq!(keyword("Main"), Some(TokenKind::Main));
        assert_eq!(keyword("whilst"), None);
        assert_eq!(keyword("a"), None);
    }

    #[test]
    fn listing_marks_newlines() {
        let tokens = vec![
            Token::new(TokenKind::Main, "main", 1),
            Token::new(TokenKind::Num, "3", 3),
        ];
        assert_eq!(
            Listing(&tokens).to_string(),
            "main main\n[enter]\n[enter]\nNUM 3\n"
        );
    }
}
