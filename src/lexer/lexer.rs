use log::{debug, warn};

use super::{
    token::{keyword, ONE_SYMBOL_TOKENS, TWO_SYMBOLS_TOKENS},
    CharacterSource, LexicalError, LexicalErrorKind, Token, TokenKind,
};

/// The outcome of scanning a whole source: every token that could be
/// recognised, plus every lexical error met on the way.
#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexicalError>,
}

#[derive(Debug)]
pub struct Lexer<S> {
    source: S,
    current: Option<char>,
    line: usize,
    tokens: Vec<Token>,
}

impl<S: CharacterSource> Lexer<S> {
    fn new(source: S) -> Self {
        Self {
            source,
            current: None,
            line: 1,
            tokens: vec![],
        }
    }

    pub fn tokenize(source: S) -> Lexed {
        let mut lexer = Lexer::new(source);
        let errors = lexer._tokenize();
        debug!(
            "lexed {} tokens over {} lines, {} errors",
            lexer.tokens.len(),
            lexer.line,
            errors.len()
        );

        Lexed {
            tokens: lexer.tokens,
            errors,
        }
    }

    fn advance(&mut self) {
        if self.current == Some('\n') {
            self.line += 1;
        }
        self.current = self.source.next_char();
    }

    fn new_token(&mut self, kind: TokenKind, s: impl Into<String>, line: usize) {
        self.tokens.push(Token::new(kind, s, line));
    }

    fn error(&self, kind: LexicalErrorKind) -> LexicalError {
        LexicalError::new(self.line, kind)
    }

    fn _tokenize(&mut self) -> Vec<LexicalError> {
        let mut errors = vec![];
        self.advance();

        while let Some(c) = self.current {
            // Each scanner consumes whatever it rejected, so scanning simply
            // resumes wherever it stopped.
            if let Err(e) = self.scan(c) {
                warn!("{e}");
                errors.push(e);
            }
        }

        errors
    }

    fn scan(&mut self, c: char) -> Result<(), LexicalError> {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                self.advance();
                Ok(())
            }
            c if c.is_ascii_alphabetic() => {
                self.parse_identifier();
                Ok(())
            }
            c if c.is_ascii_digit() => self.parse_number(),
            '/' => self.parse_slash(),
            c => self.parse_symbol(c),
        }
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.current.filter(|&c| f(c)) {
            s.push(c);
            self.advance();
        }
        s
    }

    fn parse_identifier(&mut self) {
        let line = self.line;
        let s = self.take_while(|c| c.is_ascii_alphanumeric());

        let kind = keyword(&s).unwrap_or(TokenKind::Ident);
        self.new_token(kind, s, line);
    }

    fn parse_number(&mut self) -> Result<(), LexicalError> {
        let line = self.line;
        let s = self.take_while(|c| c.is_ascii_digit());

        if let Some(c) = self.current.filter(char::is_ascii_alphabetic) {
            self.advance();
            return Err(self.error(LexicalErrorKind::IllegalCharacter(c)));
        }
        if s.parse::<i64>().is_err() {
            return Err(self.error(LexicalErrorKind::IntegerOverflow(s)));
        }

        self.new_token(TokenKind::Num, s, line);
        Ok(())
    }

    /// Either a lone `/` or the start of a block comment.
    fn parse_slash(&mut self) -> Result<(), LexicalError> {
        let line = self.line;
        self.advance();
        if self.current != Some('*') {
            self.new_token(TokenKind::Slash, "/", line);
            return Ok(());
        }
        self.advance();
        self.skip_comment()
    }

    /// Skips a block comment body, tracking nesting depth so that a nested
    /// comment is consumed whole and reported once.
    ///
    /// An inner `/*` with no matching `*/` keeps the comment open until the
    /// end of input, so everything after it is lost to a single
    /// `UnterminatedComment`.
    fn skip_comment(&mut self) -> Result<(), LexicalError> {
        let mut depth = 1;
        let mut nested = false;
        let mut prev = None;

        while depth > 0 {
            let Some(c) = self.current else {
                return Err(self.error(LexicalErrorKind::UnterminatedComment));
            };
            self.advance();

            match (prev, c) {
                (Some('*'), '/') => {
                    depth -= 1;
                    prev = None;
                }
                (Some('/'), '*') => {
                    depth += 1;
                    nested = true;
                    prev = None;
                }
                _ => prev = Some(c),
            }
        }

        if nested {
            Err(self.error(LexicalErrorKind::NestedComment))
        } else {
            Ok(())
        }
    }

    fn parse_symbol(&mut self, c: char) -> Result<(), LexicalError> {
        let line = self.line;
        self.advance();

        if let Some(next) = self.current {
            let c2: String = [c, next].iter().collect();
            if let Some(kind) = TWO_SYMBOLS_TOKENS.get(c2.as_str()) {
                self.advance();
                self.new_token(*kind, c2, line);
                return Ok(());
            }
        }

        if let Some(kind) = ONE_SYMBOL_TOKENS.get(&c) {
            self.new_token(*kind, c.to_string(), line);
            return Ok(());
        }

        match c {
            '&' | '|' | '!' => {
                let mut s = c.to_string();
                s.extend(self.current);
                Err(self.error(LexicalErrorKind::MalformedOperator(s)))
            }
            c => Err(self.error(LexicalErrorKind::IllegalCharacter(c))),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::lexer::StrSource;

    fn lex(s: &str) -> Lexed {
        Lexer::tokenize(StrSource::new(s))
    }

    fn kinds(s: &str) -> Vec<TokenKind> {
        lex(s).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("a<=b>=c==d!=e&&f||g<h>i=j/k"),
            vec![
                Ident,
                LessEqual,
                Ident,
                GreaterEqual,
                Ident,
                DoubleEqual,
                Ident,
                NotEqual,
                Ident,
                DoubleAmpersand,
                Ident,
                DoublePipe,
                Ident,
                LessThan,
                Ident,
                GreaterThan,
                Ident,
                Equal,
                Ident,
                Slash,
                Ident
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        let lexed = lex("WHILE While x1 X1 function9");
        let tokens = lexed.tokens;
        assert_eq!(tokens[0].kind, TokenKind::While);
        assert_eq!(tokens[0].text, "WHILE");
        assert_eq!(tokens[1].kind, TokenKind::While);
        assert_eq!(tokens[2].kind, TokenKind::Ident);
        assert_eq!(tokens[3].kind, TokenKind::Ident);
        assert_ne!(tokens[2].text, tokens[3].text);
        assert_eq!(tokens[4].kind, TokenKind::Ident);
    }

    #[test]
    fn line_numbers() {
        let tokens = lex("main\n(\n\n)").tokens;
        let lines: Vec<_> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn comments_are_skipped() {
        let lexed = lex("a /* b * / c */ d");
        assert!(lexed.errors.is_empty());
        let texts: Vec<_> = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "d"]);
    }

    #[test]
    fn nested_comment_is_reported_once() {
        let lexed = lex("a /* b /* c */ d */ e");
        assert_eq!(lexed.errors.len(), 1);
        assert_matches!(lexed.errors[0].kind, LexicalErrorKind::NestedComment);
        let texts: Vec<_> = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "e"]);
    }

    #[test]
    fn unbalanced_inner_comment_runs_to_end() {
        let lexed = lex("/* a /* b */ main(){ write 1; }");
        assert!(lexed.tokens.is_empty());
        assert_matches!(
            lexed.errors.as_slice(),
            [LexicalError {
                line: 1,
                kind: LexicalErrorKind::UnterminatedComment,
            }]
        );
    }

    #[test]
    fn unterminated_comment() {
        let lexed = lex("a /* b");
        assert_matches!(
            lexed.errors.as_slice(),
            [LexicalError {
                kind: LexicalErrorKind::UnterminatedComment,
                ..
            }]
        );
    }

    #[test]
    fn recovers_after_errors() {
        let lexed = lex("a # b & c\n$");
        assert_eq!(lexed.errors.len(), 3);
        assert_matches!(lexed.errors[0].kind, LexicalErrorKind::IllegalCharacter('#'));
        assert_matches!(
            &lexed.errors[1].kind,
            LexicalErrorKind::MalformedOperator(s) if s == "& "
        );
        assert_eq!(lexed.errors[2].line, 2);
        let texts: Vec<_> = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn letter_inside_number() {
        let lexed = lex("12a 3");
        assert_matches!(lexed.errors[0].kind, LexicalErrorKind::IllegalCharacter('a'));
        assert_eq!(lexed.tokens.len(), 1);
        assert_eq!(lexed.tokens[0].text, "3");
    }

    #[test]
    fn lone_bang_is_malformed() {
        let lexed = lex("!x");
        assert_matches!(
            &lexed.errors[0].kind,
            LexicalErrorKind::MalformedOperator(s) if s == "!x"
        );
        assert_eq!(lexed.tokens[0].kind, TokenKind::Ident);
    }

    #[test]
    fn round_trips_through_listing() {
        let src = "main() {\n  int a[3];\n  write a[1] + 20 / 4;\n}";
        let lexed = lex(src);
        let rewritten: Vec<_> = lexed.tokens.iter().map(|t| t.text.clone()).collect();
        let again = lex(&rewritten.join(" "));
        let k1: Vec<_> = lexed.tokens.iter().map(|t| (t.kind, &t.text)).collect();
        let k2: Vec<_> = again.tokens.iter().map(|t| (t.kind, &t.text)).collect();
        assert_eq!(k1, k2);
    }
}
