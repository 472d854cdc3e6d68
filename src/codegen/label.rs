use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub usize);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LABEL{}", self.0)
    }
}

/// Hands out labels in increasing order, starting from `LABEL1`. One
/// allocator lives per compilation, so numbering depends only on traversal
/// order.
#[derive(Debug)]
pub struct LabelAllocator {
    next: usize,
}

impl Default for LabelAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }

    pub fn allocated(&self) -> usize {
        self.next - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_starts_at_one() {
        let mut labels = LabelAllocator::new();
        assert_eq!(labels.next(), Label(1));
        assert_eq!(labels.next().to_string(), "LABEL2");
        assert_eq!(labels.allocated(), 2);
        assert_eq!(LabelAllocator::new().next(), Label(1));
    }
}
