/// Pull-based supply of source characters.
///
/// The lexer only ever asks for one character at a time and treats `None` as
/// the end-of-input sentinel, so any decoder (plain text, an encoded container,
/// a network stream) can sit behind this trait.
pub trait CharacterSource {
    fn has_next(&self) -> bool;

    /// Returns the next character, or `None` once the source is exhausted.
    fn next_char(&mut self) -> Option<char>;
}

#[derive(Debug)]
pub struct StrSource {
    chars: Vec<char>,
    index: usize,
}

impl StrSource {
    pub fn new(s: &str) -> Self {
        Self {
            chars: s.chars().collect(),
            index: 0,
        }
    }
}

impl From<&str> for StrSource {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl CharacterSource for StrSource {
    fn has_next(&self) -> bool {
        self.index < self.chars.len()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.get(self.index).copied()?;
        self.index += 1;
        Some(c)
    }
}

impl<S: CharacterSource + ?Sized> CharacterSource for &mut S {
    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn next_char(&mut self) -> Option<char> {
        (**self).next_char()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_once() {
        let mut source = StrSource::new("ab");
        assert!(source.has_next());
        assert_eq!(source.next_char(), Some('a'));
        assert_eq!(source.next_char(), Some('b'));
        assert!(!source.has_next());
        assert_eq!(source.next_char(), None);
        assert_eq!(source.next_char(), None);
    }
}
