mod codegen;
mod error;
mod instruction;
mod label;

pub use codegen::*;
pub use error::*;
pub use instruction::*;
pub use label::*;
