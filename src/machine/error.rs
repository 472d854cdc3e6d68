use crate::codegen::{Label, Opcode};

/// A fatal error raised while executing a program. `pc` is the index of the
/// faulting instruction.
#[derive(thiserror::Error, Debug)]
#[error("instruction {pc}: runtime error, {kind}")]
pub struct RuntimeError {
    pub pc: usize,
    pub kind: RuntimeErrorKind,
}

#[derive(thiserror::Error, Debug)]
pub enum RuntimeErrorKind {
    #[error("division by zero")]
    DivisionByZero,
    #[error("address {address} is beyond the data capacity of {capacity}")]
    AddressOverflow { address: usize, capacity: usize },
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("no active activation record")]
    NoActivationRecord,
    #[error("return without a matching call")]
    NoReturnAddress,
    #[error("label {0} is not defined")]
    UndefinedLabel(Label),
    #[error("label {0} is defined twice")]
    DuplicateLabel(Label),
    #[error("{0} has a missing or invalid operand")]
    InvalidOperand(Opcode),
    #[error("invalid integer input {0:?}")]
    InvalidInput(String),
    #[error("execution ran past the last instruction")]
    RanOffEnd,
    #[error("i/o failure")]
    Io(#[source] std::io::Error),
}
