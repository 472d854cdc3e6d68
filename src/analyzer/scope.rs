use std::{collections::HashMap, fmt};

use crate::codegen::Label;

/// A static data address. Relative addresses are resolved by the machine
/// against the base of the active activation record, absolute ones are used
/// as is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    Absolute(usize),
    Relative(usize),
}

impl Address {
    pub fn offset(self, n: usize) -> Self {
        match self {
            Address::Absolute(a) => Address::Absolute(a + n),
            Address::Relative(a) => Address::Relative(a + n),
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Address::Relative(_))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Absolute(a) => write!(f, "{a}"),
            Address::Relative(a) => write!(f, ":{a}"),
        }
    }
}

/// What a declaration asks the current frame for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Declare {
    Int,
    Array(usize),
    /// `entry` is only known once code generation allocates a label for the
    /// function; parse-time frames leave it empty.
    Function { entry: Option<Label>, arity: usize },
    ReturnSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    Int(Address),
    Array { address: Address, size: usize },
    Function { entry: Option<Label>, arity: usize },
    ReturnSlot(Address),
}

impl Binding {
    pub fn address(&self) -> Option<Address> {
        match self {
            Binding::Int(a) | Binding::ReturnSlot(a) => Some(*a),
            Binding::Array { address, .. } => Some(*address),
            Binding::Function { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Addressing {
    /// Continues the parent frame's layout with absolute addresses.
    Absolute,
    /// Starts a fresh layout at slot 0, resolved against the activation base.
    Relative,
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ScopeError {
    #[error("identifier {0} is already declared in this scope")]
    Redeclared(String),
    #[error("cannot leave the outermost scope")]
    RootPopped,
}

#[derive(Debug)]
struct Frame {
    table: HashMap<String, Binding>,
    addressing: Addressing,
    next_slot: usize,
}

impl Frame {
    fn new(addressing: Addressing, start: usize) -> Self {
        Self {
            table: HashMap::new(),
            addressing,
            next_slot: start,
        }
    }

    fn take_slots(&mut self, size: usize) -> Address {
        let slot = self.next_slot;
        self.next_slot += size.max(1);
        match self.addressing {
            Addressing::Absolute => Address::Absolute(slot),
            Addressing::Relative => Address::Relative(slot),
        }
    }
}

/// A chain of symbol-table frames. The last frame is the innermost one and
/// each frame's parent is the one before it.
#[derive(Debug)]
pub struct ScopeChain {
    frames: Vec<Frame>,
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeChain {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(Addressing::Absolute, 0)],
        }
    }

    fn current(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn push(&mut self, addressing: Addressing) {
        let start = match addressing {
            Addressing::Absolute => self.frames.last().map_or(0, |f| f.next_slot),
            Addressing::Relative => 0,
        };
        self.frames.push(Frame::new(addressing, start));
    }

    pub fn pop(&mut self) -> Result<(), ScopeError> {
        if self.frames.len() == 1 {
            return Err(ScopeError::RootPopped);
        }
        self.frames.pop();
        Ok(())
    }

    /// Binds `name` in the innermost frame. Shadowing a binding of an outer
    /// frame is fine, a second binding in the same frame is not.
    pub fn put(&mut self, name: &str, declare: Declare) -> Result<Binding, ScopeError> {
        let frame = self.current();
        if frame.table.contains_key(name) {
            return Err(ScopeError::Redeclared(name.to_string()));
        }

        let binding = match declare {
            Declare::Int => Binding::Int(frame.take_slots(1)),
            Declare::Array(size) => Binding::Array {
                address: frame.take_slots(size),
                size,
            },
            Declare::ReturnSlot => Binding::ReturnSlot(frame.take_slots(1)),
            Declare::Function { entry, arity } => Binding::Function { entry, arity },
        };
        frame.table.insert(name.to_string(), binding);
        Ok(binding)
    }

    /// Takes `size` anonymous slots from the innermost frame.
    pub fn reserve(&mut self, size: usize) -> Address {
        self.current().take_slots(size)
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|f| f.table.get(name))
    }

    /// The innermost frame's allocation cursor, which is the number of slots
    /// an activation record for it needs.
    pub fn frame_size(&self) -> usize {
        self.frames.last().map_or(0, |f| f.next_slot)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn slots_advance_by_size() {
        let mut scope = ScopeChain::new();
        assert_eq!(scope.put("a", Declare::Int), Ok(Binding::Int(Address::Absolute(0))));
        assert_eq!(
            scope.put("b", Declare::Array(3)),
            Ok(Binding::Array {
                address: Address::Absolute(1),
                size: 3
            })
        );
        assert_eq!(scope.put("c", Declare::Int), Ok(Binding::Int(Address::Absolute(4))));
        assert_eq!(scope.frame_size(), 5);
    }

    #[test]
    fn functions_take_no_slots() {
        let mut scope = ScopeChain::new();
        scope
            .put(
                "f",
                Declare::Function {
                    entry: Some(Label(1)),
                    arity: 2,
                },
            )
            .unwrap();
        assert_eq!(scope.frame_size(), 0);
        assert_matches!(scope.lookup("f"), Some(Binding::Function { arity: 2, .. }));
    }

    #[test]
    fn redeclaration_in_same_frame() {
        let mut scope = ScopeChain::new();
        scope.put("x", Declare::Int).unwrap();
        assert_eq!(
            scope.put("x", Declare::Int),
            Err(ScopeError::Redeclared("x".to_string()))
        );
    }

    #[test]
    fn shadowing_across_frames() {
        let mut scope = ScopeChain::new();
        scope.put("x", Declare::Int).unwrap();
        scope.push(Addressing::Relative);
        assert_eq!(scope.put("x", Declare::Int), Ok(Binding::Int(Address::Relative(0))));
        assert_eq!(scope.lookup("x"), Some(&Binding::Int(Address::Relative(0))));
        scope.pop().unwrap();
        assert_eq!(scope.lookup("x"), Some(&Binding::Int(Address::Absolute(0))));
    }

    #[test]
    fn absolute_frames_continue_parent_layout() {
        let mut scope = ScopeChain::new();
        scope.put("g", Declare::Array(4)).unwrap();
        scope.push(Addressing::Absolute);
        assert_eq!(scope.put("m", Declare::Int), Ok(Binding::Int(Address::Absolute(4))));
        assert_eq!(scope.frame_size(), 5);
    }

    #[test]
    fn root_cannot_be_popped() {
        let mut scope = ScopeChain::new();
        scope.push(Addressing::Absolute);
        assert!(scope.pop().is_ok());
        assert_eq!(scope.pop(), Err(ScopeError::RootPopped));
        assert_eq!(scope.lookup("nothing"), None);
    }

    #[test]
    fn relative_addresses_display_with_prefix() {
        assert_eq!(Address::Relative(3).to_string(), ":3");
        assert_eq!(Address::Absolute(3).offset(2).to_string(), "5");
    }
}
