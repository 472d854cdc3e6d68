use std::collections::VecDeque;

use crate::lexer::Token;

/// A cursor over the fully lexed token array that can take tokens back.
/// Tokens handed back are replayed, in order, before the array resumes.
#[derive(Debug)]
pub struct TokenCursor {
    tokens: std::vec::IntoIter<Token>,
    pushback: VecDeque<Token>,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            pushback: VecDeque::new(),
        }
    }

    /// Whether the next read comes from the pushback buffer rather than the
    /// token array.
    pub fn is_replaying(&self) -> bool {
        !self.pushback.is_empty()
    }

    pub fn next(&mut self) -> Option<Token> {
        self.pushback.pop_front().or_else(|| self.tokens.next())
    }

    /// Puts `tokens` back so that they are read again first, in their
    /// original order.
    pub fn unread(&mut self, tokens: Vec<Token>) {
        for token in tokens.into_iter().rev() {
            self.pushback.push_front(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn ident(s: &str) -> Token {
        Token::new(TokenKind::Ident, s, 1)
    }

    #[test]
    fn replays_in_order_before_resuming() {
        let mut cursor = TokenCursor::new(vec![ident("a"), ident("b"), ident("c")]);
        let a = cursor.next().unwrap();
        let b = cursor.next().unwrap();
        assert!(!cursor.is_replaying());
        cursor.unread(vec![a, b]);
        assert!(cursor.is_replaying());

        let order: Vec<_> = std::iter::from_fn(|| cursor.next()).map(|t| t.text).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
